//! Persisted service registry.
//!
//! The full service collection lives as a JSON array under one well-known key
//! in a keyed store. The store sits behind a trait so tests run against an
//! in-memory map while the application uses a JSON file in the platform data
//! directory. Loading runs every raw record through a migration step that
//! backfills legacy / partial fields instead of rejecting the record.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::debug;
use serde::Deserialize;

use crate::totp::types::*;

/// Well-known key the service list persists under.
pub const REGISTRY_KEY: &str = "authenticator.services";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Keyed store backends
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process-wide keyed string store.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, OtpError>;
    fn put(&mut self, key: &str, value: &str) -> Result<(), OtpError>;
}

/// In-memory store for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, OtpError> {
        Ok(self.map.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), OtpError> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// File-backed store: one `<key>.json` file per key under a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted in the platform data directory.
    pub fn in_data_dir() -> Result<Self, OtpError> {
        let dir = dirs::data_dir()
            .ok_or_else(|| OtpError::new(OtpErrorKind::StorageError, "no platform data dir"))?;
        Ok(Self::new(dir.join("authvault")))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, OtpError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        std::fs::read_to_string(&path).map(Some).map_err(|e| {
            OtpError::new(OtpErrorKind::StorageError, format!("read {}", path.display()))
                .with_detail(e.to_string())
        })
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), OtpError> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            OtpError::new(OtpErrorKind::StorageError, "create store dir").with_detail(e.to_string())
        })?;
        let path = self.path_for(key);
        std::fs::write(&path, value).map_err(|e| {
            OtpError::new(OtpErrorKind::StorageError, format!("write {}", path.display()))
                .with_detail(e.to_string())
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Migration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A persisted record as it may appear on disk: every field optional, legacy
/// camelCase names, recovery slots under `vault`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawServiceRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub secret: Option<String>,
    pub issuer: Option<String>,
    pub vault: Option<Vec<String>>,
    pub note: Option<String>,
    pub hidden_description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Repair a raw record into a fully-defaulted service.
///
/// A vault that is absent or not exactly ten entries becomes ten empty
/// slots; missing strings become empty, missing tags an empty list, a
/// missing id a fresh one. No record is rejected.
pub fn migrate_record(raw: RawServiceRecord) -> AuthenticatorService {
    let now = Utc::now();
    AuthenticatorService {
        id: raw.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        name: raw.name.unwrap_or_default(),
        secret: raw.secret.unwrap_or_default(),
        issuer: raw.issuer,
        recovery_vault: raw
            .vault
            .map(RecoveryVault::from_raw)
            .unwrap_or_default(),
        note: raw.note.unwrap_or_default(),
        hidden_description: raw.hidden_description.unwrap_or_default(),
        tags: raw.tags.unwrap_or_default(),
        created_at: raw.created_at.unwrap_or(now),
        updated_at: raw.updated_at.unwrap_or(now),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Load/save boundary for the service collection.
pub struct ServiceRegistry<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> ServiceRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Load every persisted service, migrating each raw record.
    /// An absent key yields an empty list.
    pub fn load_all(&self) -> Result<Vec<AuthenticatorService>, OtpError> {
        let Some(json) = self.store.get(REGISTRY_KEY)? else {
            debug!("registry key absent, starting empty");
            return Ok(Vec::new());
        };
        let raw: Vec<RawServiceRecord> = serde_json::from_str(&json).map_err(|e| {
            OtpError::new(OtpErrorKind::SerializeFailed, "registry JSON unreadable")
                .with_detail(e.to_string())
        })?;
        debug!("loaded {} service record(s)", raw.len());
        Ok(raw.into_iter().map(migrate_record).collect())
    }

    /// Persist the full collection, overwriting whatever was stored.
    /// Last write wins; no merge semantics.
    pub fn save_all(&mut self, services: &[AuthenticatorService]) -> Result<(), OtpError> {
        let json = serde_json::to_string_pretty(services).map_err(|e| {
            OtpError::new(OtpErrorKind::SerializeFailed, "registry JSON serialise")
                .with_detail(e.to_string())
        })?;
        debug!("saving {} service record(s)", services.len());
        self.store.put(REGISTRY_KEY, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Migration ────────────────────────────────────────────────

    #[test]
    fn migrate_empty_record_gets_defaults() {
        let svc = migrate_record(RawServiceRecord::default());
        assert!(!svc.id.is_empty());
        assert_eq!(svc.name, "");
        assert_eq!(svc.secret, "");
        assert!(svc.issuer.is_none());
        assert_eq!(svc.recovery_vault.slots().len(), RECOVERY_SLOTS);
        assert_eq!(svc.note, "");
        assert_eq!(svc.hidden_description, "");
        assert!(svc.tags.is_empty());
    }

    #[test]
    fn migrate_repairs_wrong_vault_lengths() {
        for len in [0usize, 3, 12] {
            let raw = RawServiceRecord {
                vault: Some(vec!["c".to_string(); len]),
                ..Default::default()
            };
            let svc = migrate_record(raw);
            assert_eq!(svc.recovery_vault.slots().len(), RECOVERY_SLOTS);
        }
    }

    #[test]
    fn migrate_keeps_valid_vault() {
        let slots: Vec<String> = (0..RECOVERY_SLOTS).map(|i| format!("c{}", i)).collect();
        let raw = RawServiceRecord {
            vault: Some(slots.clone()),
            ..Default::default()
        };
        let svc = migrate_record(raw);
        assert_eq!(svc.recovery_vault.slots(), &slots[..]);
    }

    #[test]
    fn migrate_parses_legacy_minimal_json() {
        // A record written before vault/note/tags existed.
        let json = r#"{"id": "abc", "name": "GitHub", "secret": "JBSWY3DPEHPK3PXP"}"#;
        let raw: RawServiceRecord = serde_json::from_str(json).unwrap();
        let svc = migrate_record(raw);
        assert_eq!(svc.id, "abc");
        assert_eq!(svc.name, "GitHub");
        assert_eq!(svc.secret, "JBSWY3DPEHPK3PXP");
        assert_eq!(svc.recovery_vault.slots().len(), RECOVERY_SLOTS);
        assert_eq!(svc.tags, Vec::<String>::new());
    }

    // ── Load / save ──────────────────────────────────────────────

    #[test]
    fn load_absent_key_yields_empty() {
        let registry = ServiceRegistry::new(MemoryStore::new());
        assert!(registry.load_all().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_roundtrip() {
        let mut registry = ServiceRegistry::new(MemoryStore::new());
        let services = vec![
            AuthenticatorService::new("GitHub", "JBSWY3DPEHPK3PXP").with_issuer("GitHub"),
            AuthenticatorService::new("AWS", "MZXW6YTB"),
        ];
        registry.save_all(&services).unwrap();
        let loaded = registry.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].name, "GitHub");
        assert_eq!(loaded[1].secret, "MZXW6YTB");
        assert_eq!(loaded[0].recovery_vault.slots().len(), RECOVERY_SLOTS);
    }

    #[test]
    fn save_overwrites_completely() {
        let mut registry = ServiceRegistry::new(MemoryStore::new());
        registry
            .save_all(&[AuthenticatorService::new("a", "A"), AuthenticatorService::new("b", "B")])
            .unwrap();
        registry.save_all(&[AuthenticatorService::new("c", "C")]).unwrap();
        let loaded = registry.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "c");
    }

    #[test]
    fn load_migrates_mixed_legacy_records() {
        let mut store = MemoryStore::new();
        let json = r#"[
            {"id": "1", "name": "Old", "secret": "AAAA"},
            {"id": "2", "name": "Partial", "secret": "BBBB", "vault": ["x", "y"], "tags": ["work"]}
        ]"#;
        store.put(REGISTRY_KEY, json).unwrap();
        let registry = ServiceRegistry::new(store);
        let loaded = registry.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].recovery_vault.remaining(), 0);
        // Two-entry vault replaced wholesale with empty slots
        assert_eq!(loaded[1].recovery_vault.slots().len(), RECOVERY_SLOTS);
        assert_eq!(loaded[1].recovery_vault.remaining(), 0);
        assert_eq!(loaded[1].tags, vec!["work"]);
    }

    #[test]
    fn load_corrupt_document_is_an_error() {
        let mut store = MemoryStore::new();
        store.put(REGISTRY_KEY, "not json at all").unwrap();
        let registry = ServiceRegistry::new(store);
        let err = registry.load_all().unwrap_err();
        assert_eq!(err.kind, OtpErrorKind::SerializeFailed);
    }

    // ── File store ───────────────────────────────────────────────

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path());
        assert!(store.get(REGISTRY_KEY).unwrap().is_none());
        store.put(REGISTRY_KEY, "[1, 2, 3]").unwrap();
        assert_eq!(store.get(REGISTRY_KEY).unwrap().as_deref(), Some("[1, 2, 3]"));
    }

    #[test]
    fn file_store_persists_registry() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ServiceRegistry::new(FileStore::new(dir.path()));
        registry
            .save_all(&[AuthenticatorService::new("GitHub", "JBSWY3DPEHPK3PXP")])
            .unwrap();

        // A fresh registry over the same directory sees the data.
        let registry2 = ServiceRegistry::new(FileStore::new(dir.path()));
        let loaded = registry2.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "GitHub");
    }
}
