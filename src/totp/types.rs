//! Core types for the authenticator-service registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Recovery vault
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Number of recovery-code slots every service carries.
pub const RECOVERY_SLOTS: usize = 10;

/// Sentinel stored in a slot that holds no recovery code.
pub const EMPTY_SLOT: &str = "EMPTY_SLOT";

/// Digits per generated recovery code.
const RECOVERY_CODE_DIGITS: usize = 8;

/// Ordered list of exactly [`RECOVERY_SLOTS`] recovery-code slots.
///
/// Each slot is either a code string or the [`EMPTY_SLOT`] sentinel. The
/// length invariant holds after construction, deserialisation through
/// [`RecoveryVault::from_raw`], and every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecoveryVault {
    slots: Vec<String>,
}

impl Default for RecoveryVault {
    fn default() -> Self {
        Self::empty()
    }
}

impl RecoveryVault {
    /// A vault of ten empty slots.
    pub fn empty() -> Self {
        Self {
            slots: vec![EMPTY_SLOT.to_string(); RECOVERY_SLOTS],
        }
    }

    /// Fill every slot with a fresh random 8-digit code.
    pub fn generate() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let slots = (0..RECOVERY_SLOTS)
            .map(|_| {
                (0..RECOVERY_CODE_DIGITS)
                    .map(|_| rng.gen_range(0..10).to_string())
                    .collect()
            })
            .collect();
        Self { slots }
    }

    /// Build a vault from a raw slot list. Anything that is not exactly ten
    /// entries is replaced wholesale with empty slots; legacy records are
    /// repaired rather than rejected.
    pub fn from_raw(raw: Vec<String>) -> Self {
        if raw.len() == RECOVERY_SLOTS {
            Self { slots: raw }
        } else {
            Self::empty()
        }
    }

    /// Consume a recovery code: if some slot holds `code`, replace it with
    /// the sentinel and return `true`.
    pub fn consume(&mut self, code: &str) -> bool {
        match self.slots.iter().position(|s| s != EMPTY_SLOT && s == code) {
            Some(idx) => {
                self.slots[idx] = EMPTY_SLOT.to_string();
                true
            }
            None => false,
        }
    }

    /// Number of slots still holding an unused code.
    pub fn remaining(&self) -> usize {
        self.slots.iter().filter(|s| *s != EMPTY_SLOT).count()
    }

    /// The raw slot list (always ten entries).
    pub fn slots(&self) -> &[String] {
        &self.slots
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Authenticator service
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One enrolled authenticator service.
///
/// Persisted as JSON with the field names the legacy records used
/// (camelCase, recovery slots under `vault`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorService {
    /// Unique identifier.
    pub id: String,
    /// Display name (e.g. "GitHub").
    pub name: String,
    /// Base-32 encoded shared secret, stored as entered.
    pub secret: String,
    /// Issuer, when distinct from the name.
    pub issuer: Option<String>,
    /// Recovery-code slots.
    #[serde(rename = "vault")]
    pub recovery_vault: RecoveryVault,
    /// Free-form note.
    pub note: String,
    /// Description shown only on demand.
    pub hidden_description: String,
    /// Tags for filtering.
    pub tags: Vec<String>,
    /// When the service was enrolled.
    pub created_at: DateTime<Utc>,
    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
}

impl AuthenticatorService {
    /// Create a service with defaults: empty vault, no issuer, no note.
    pub fn new(name: impl Into<String>, secret: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            secret: secret.into(),
            issuer: None,
            recovery_vault: RecoveryVault::empty(),
            note: String::new(),
            hidden_description: String::new(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder: set issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Builder: set note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Builder: set hidden description.
    pub fn with_hidden_description(mut self, text: impl Into<String>) -> Self {
        self.hidden_description = text.into();
        self
    }

    /// Builder: set tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Display name: "Issuer (name)" or just "name".
    pub fn display_name(&self) -> String {
        match &self.issuer {
            Some(iss) if !iss.is_empty() => format!("{} ({})", iss, self.name),
            _ => self.name.clone(),
        }
    }

    /// Bump the modification timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Generated code result
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A generated OTP code with associated timing info.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedCode {
    /// The 6-digit code string (e.g. "123456").
    pub code: String,
    /// Seconds remaining until the code rotates (1–30).
    pub remaining_seconds: u64,
    /// Step length in seconds.
    pub period: u64,
    /// The time-step counter used.
    pub counter: u64,
    /// Service ID this code was generated for.
    pub service_id: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Error type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Error kind for this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OtpErrorKind {
    InvalidSecret,
    HashFailed,
    Truncation,
    NotFound,
    StorageError,
    SerializeFailed,
}

/// Crate-level error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpError {
    pub kind: OtpErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl fmt::Display for OtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)?;
        if let Some(d) = &self.detail {
            write!(f, " ({})", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for OtpError {}

impl OtpError {
    pub fn new(kind: OtpErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl From<OtpError> for String {
    fn from(e: OtpError) -> String {
        e.to_string()
    }
}
