//! High-level orchestrator — owns the in-memory service collection, delegates
//! to `core` for codes and to `registry` for persistence.

use std::sync::Arc;
use tokio::sync::Mutex;

use log::info;

use crate::totp::base32;
use crate::totp::core;
use crate::totp::registry::{KeyValueStore, ServiceRegistry};
use crate::totp::types::*;

/// Thread-safe service state shared with the embedding application.
pub type AuthServiceState<S> = Arc<Mutex<AuthService<S>>>;

/// Central authenticator service.
///
/// Assumes a single logical writer (one local user session); concurrent
/// saves are not merged, last write wins.
pub struct AuthService<S: KeyValueStore> {
    services: Vec<AuthenticatorService>,
    registry: ServiceRegistry<S>,
}

impl<S: KeyValueStore> AuthService<S> {
    pub fn new(store: S) -> Self {
        Self {
            services: Vec::new(),
            registry: ServiceRegistry::new(store),
        }
    }

    /// Create a service wrapped in `Arc<Mutex<_>>` for shared state.
    pub fn shared(store: S) -> AuthServiceState<S> {
        Arc::new(Mutex::new(Self::new(store)))
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Persistence
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Replace the in-memory collection with the persisted one.
    pub fn load(&mut self) -> Result<(), OtpError> {
        self.services = self.registry.load_all()?;
        info!("loaded {} authenticator service(s)", self.services.len());
        Ok(())
    }

    /// Persist the full collection (overwrite).
    pub fn save(&mut self) -> Result<(), OtpError> {
        self.registry.save_all(&self.services)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Service CRUD
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Enroll a new service from a user-supplied name and secret.
    pub fn enroll(
        &mut self,
        name: impl Into<String>,
        secret: impl Into<String>,
        issuer: Option<String>,
    ) -> Result<AuthenticatorService, OtpError> {
        let name = name.into();
        let secret = secret.into();
        if !base32::looks_like_base32(&secret) {
            return Err(OtpError::new(
                OtpErrorKind::InvalidSecret,
                "secret contains no base-32 characters",
            ));
        }
        let mut service = AuthenticatorService::new(name, secret);
        service.issuer = issuer;
        info!("enrolled service {}", service.display_name());
        self.services.push(service.clone());
        Ok(service)
    }

    /// Get a service by ID.
    pub fn get(&self, id: &str) -> Result<&AuthenticatorService, OtpError> {
        self.services
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| OtpError::new(OtpErrorKind::NotFound, format!("service not found: {}", id)))
    }

    /// Update an existing service's editable fields.
    pub fn update(&mut self, updated: AuthenticatorService) -> Result<(), OtpError> {
        let slot = self
            .services
            .iter_mut()
            .find(|s| s.id == updated.id)
            .ok_or_else(|| OtpError::new(OtpErrorKind::NotFound, "service not found"))?;
        *slot = updated;
        slot.touch();
        Ok(())
    }

    /// Remove a service by ID, returning the removed record.
    pub fn remove(&mut self, id: &str) -> Result<AuthenticatorService, OtpError> {
        let pos = self
            .services
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| OtpError::new(OtpErrorKind::NotFound, "service not found"))?;
        Ok(self.services.remove(pos))
    }

    /// All enrolled services, in stored order.
    pub fn list(&self) -> &[AuthenticatorService] {
        &self.services
    }

    /// Search by text across name, issuer, and tags.
    pub fn search(&self, query: &str) -> Vec<&AuthenticatorService> {
        let q = query.to_lowercase();
        self.services
            .iter()
            .filter(|s| {
                s.name.to_lowercase().contains(&q)
                    || s.issuer
                        .as_deref()
                        .map_or(false, |i| i.to_lowercase().contains(&q))
                    || s.tags.iter().any(|t| t.to_lowercase().contains(&q))
            })
            .collect()
    }

    /// Collect all unique tags across services.
    pub fn all_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .services
            .iter()
            .flat_map(|s| s.tags.iter().cloned())
            .collect();
        tags.sort();
        tags.dedup();
        tags
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Code generation
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Generate the current code for a service. The code itself is fail-soft
    /// (sentinel on internal failure); only an unknown ID is an error.
    pub fn generate_code_for(&self, id: &str) -> Result<GeneratedCode, OtpError> {
        self.generate_code_for_with_offset(id, 0)
    }

    /// Generate the code for an adjacent time step.
    pub fn generate_code_for_with_offset(
        &self,
        id: &str,
        window_offset: i64,
    ) -> Result<GeneratedCode, OtpError> {
        let service = self.get(id)?;
        let now = core::current_unix_time();
        Ok(GeneratedCode {
            code: core::generate_code_at(&service.secret, now, window_offset),
            remaining_seconds: core::seconds_remaining_at(now),
            period: core::STEP_SECONDS,
            counter: core::time_step_at(now).saturating_add_signed(window_offset),
            service_id: service.id.clone(),
        })
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Recovery codes
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Fill a service's vault with ten fresh codes, returning them.
    pub fn regenerate_recovery_codes(&mut self, id: &str) -> Result<Vec<String>, OtpError> {
        let service = self
            .services
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| OtpError::new(OtpErrorKind::NotFound, "service not found"))?;
        service.recovery_vault = RecoveryVault::generate();
        service.touch();
        Ok(service.recovery_vault.slots().to_vec())
    }

    /// Consume one recovery code; `Ok(true)` empties the matched slot.
    pub fn consume_recovery_code(&mut self, id: &str, code: &str) -> Result<bool, OtpError> {
        let service = self
            .services
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| OtpError::new(OtpErrorKind::NotFound, "service not found"))?;
        let consumed = service.recovery_vault.consume(code);
        if consumed {
            service.touch();
            info!(
                "recovery code consumed for {}, {} remaining",
                service.display_name(),
                service.recovery_vault.remaining()
            );
        }
        Ok(consumed)
    }
}
