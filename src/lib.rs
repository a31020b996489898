//! # authvault – Authenticator-Service Registry
//!
//! One-time-password core with a persisted registry of authenticator services:
//!
//! - **RFC 4226 / 6238** – HOTP & TOTP generation with HMAC-SHA1, 6-digit codes,
//!   30-second steps, clock-drift window offsets
//! - **Lenient base-32** – case-insensitive secret decoding that drops spaces,
//!   dashes, and stray characters instead of failing
//! - **Recovery vaults** – fixed 10-slot backup-code lists per service, with
//!   generation and one-shot consumption
//! - **Service registry** – JSON persistence under one well-known key, with a
//!   migration step that repairs legacy / partial records on load
//! - **Fail-soft codes** – the public code generator never errors; internal
//!   failures degrade to the `"000000"` sentinel

pub mod totp;
