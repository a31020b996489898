//! Core OTP generation — RFC 4226 (HOTP) and RFC 6238 (TOTP).
//!
//! Counter encoding, HMAC-SHA1, dynamic truncation, time-step and countdown
//! arithmetic. Internal steps return `Result` for testability; the public
//! `generate_code*` edge never fails and degrades to the `"000000"` sentinel.

use hmac::{Hmac, Mac};
use log::warn;
use sha1::Sha1;

use crate::totp::base32;
use crate::totp::types::{OtpError, OtpErrorKind};

/// Length of one time step in seconds.
pub const STEP_SECONDS: u64 = 30;

/// Digits per generated code.
pub const CODE_DIGITS: usize = 6;

/// Sentinel returned by the fail-soft public edge.
pub const FALLBACK_CODE: &str = "000000";

const CODE_MODULUS: u32 = 1_000_000;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Counter encoding
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Encode a step counter as the 8-byte big-endian HMAC message.
/// The full 64-bit range is representable.
pub fn encode_counter(counter: u64) -> [u8; 8] {
    counter.to_be_bytes()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Keyed hash + dynamic truncation (RFC 4226 §5.3)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compute the 20-byte HMAC-SHA1 digest over `(key, message)`.
fn hmac_sha1(key: &[u8], message: &[u8]) -> Result<[u8; 20], OtpError> {
    let mut mac = Hmac::<Sha1>::new_from_slice(key).map_err(|e| {
        OtpError::new(OtpErrorKind::HashFailed, "HMAC rejected key").with_detail(e.to_string())
    })?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().into())
}

/// Dynamic truncation: pick 4 bytes at the offset named by the digest's last
/// nibble, mask the top bit for a non-negative 31-bit integer, reduce modulo
/// 10^6, and left-zero-pad to six digits.
fn truncate(digest: &[u8]) -> Result<String, OtpError> {
    let last = *digest.last().ok_or_else(|| {
        OtpError::new(OtpErrorKind::Truncation, "empty digest")
    })?;
    let offset = (last & 0x0f) as usize;
    if offset + 4 > digest.len() {
        return Err(OtpError::new(
            OtpErrorKind::Truncation,
            format!("digest too short for offset {}", offset),
        ));
    }
    let binary = ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | (digest[offset + 3] as u32);
    Ok(format!("{:0width$}", binary % CODE_MODULUS, width = CODE_DIGITS))
}

/// Compute an HOTP code for raw key bytes and a counter.
pub fn hotp_raw(key: &[u8], counter: u64) -> Result<String, OtpError> {
    let digest = hmac_sha1(key, &encode_counter(counter))?;
    truncate(&digest)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Time steps
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compute the time-step counter for a given unix timestamp.
pub fn time_step_at(unix_seconds: u64) -> u64 {
    unix_seconds / STEP_SECONDS
}

/// The current time-step counter.
pub fn time_step() -> u64 {
    time_step_at(current_unix_time())
}

/// Seconds remaining for a specific timestamp, always in `1..=30`.
pub fn seconds_remaining_at(unix_seconds: u64) -> u64 {
    STEP_SECONDS - (unix_seconds % STEP_SECONDS)
}

/// Seconds remaining until the current code rotates.
pub fn seconds_remaining() -> u64 {
    seconds_remaining_at(current_unix_time())
}

/// Current unix timestamp in seconds.
pub fn current_unix_time() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TOTP
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Generate a TOTP code at an explicit timestamp with a clock-drift window
/// offset. `counter = floor(unix_seconds / 30) + window_offset`, saturating
/// at the counter range bounds.
pub fn totp_at(secret: &str, unix_seconds: u64, window_offset: i64) -> Result<String, OtpError> {
    let counter = time_step_at(unix_seconds).saturating_add_signed(window_offset);
    let key = base32::decode(secret);
    hotp_raw(&key, counter)
}

/// Fail-soft TOTP at an explicit timestamp. Internal failures are logged and
/// collapse to [`FALLBACK_CODE`].
pub fn generate_code_at(secret: &str, unix_seconds: u64, window_offset: i64) -> String {
    match totp_at(secret, unix_seconds, window_offset) {
        Ok(code) => code,
        Err(e) => {
            warn!("code generation failed, returning sentinel: {}", e);
            FALLBACK_CODE.to_string()
        }
    }
}

/// Generate the current code for a secret.
pub fn generate_code(secret: &str) -> String {
    generate_code_with_offset(secret, 0)
}

/// Generate the code for an adjacent 30-second step. Multi-window
/// verification policy belongs to the caller, which may invoke this with
/// several offsets.
pub fn generate_code_with_offset(secret: &str, window_offset: i64) -> String {
    generate_code_at(secret, current_unix_time(), window_offset)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Secret helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Generate a cryptographically-random base-32 secret.
pub fn generate_secret(byte_length: usize) -> String {
    use rand::RngCore;
    let mut buf = vec![0u8; byte_length];
    rand::thread_rng().fill_bytes(&mut buf);
    base32::encode(&buf)
}
