//! TOTP crate: sub-modules.

pub mod base32;
pub mod core;
pub mod registry;
pub mod service;
pub mod types;

// Re-export top-level items for convenience.
pub use registry::{FileStore, KeyValueStore, MemoryStore, ServiceRegistry};
pub use service::{AuthService, AuthServiceState};
pub use types::*;
