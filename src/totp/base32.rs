//! Base-32 secret handling (RFC 4648 alphabet `A–Z2–7`).
//!
//! Decoding is deliberately lenient: case-insensitive, `=` padding ignored,
//! and any character outside the alphabet (spaces, dashes, typos) is dropped
//! rather than raised as an error. The decode degrades to whatever valid
//! characters remain.

/// Map one character to its 5-bit value, or `None` for anything that is not
/// part of the alphabet.
fn char_value(c: char) -> Option<u32> {
    match c.to_ascii_uppercase() {
        c @ 'A'..='Z' => Some(c as u32 - 'A' as u32),
        c @ '2'..='7' => Some(c as u32 - '2' as u32 + 26),
        _ => None,
    }
}

/// Decode a base-32 secret into raw key bytes.
///
/// Accumulates 5 bits per valid character and emits a byte for every 8 bits
/// gathered, yielding `floor(n * 5 / 8)` bytes for `n` valid characters.
/// Never fails; malformed input shrinks the output instead.
pub fn decode(secret: &str) -> Vec<u8> {
    let mut output = Vec::with_capacity(secret.len() * 5 / 8);
    let mut buffer = 0u32;
    let mut bits = 0u32;

    for c in secret.chars() {
        let value = match char_value(c) {
            Some(v) => v,
            None => continue,
        };
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            output.push((buffer >> bits) as u8);
        }
    }
    output
}

/// Encode raw bytes to base-32 (no padding, uppercase).
pub fn encode(bytes: &[u8]) -> String {
    base32::encode(base32::Alphabet::Rfc4648 { padding: false }, bytes)
}

/// Check whether a string plausibly carries a base-32 secret once spaces and
/// dashes are stripped. Used at enrolment; generation itself stays lenient.
pub fn looks_like_base32(s: &str) -> bool {
    let cleaned: String = s.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    !cleaned.is_empty()
        && cleaned
            .chars()
            .all(|c| char_value(c).is_some() || c == '=')
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Known vectors ────────────────────────────────────────────

    #[test]
    fn decode_known_secret() {
        // The classic demo secret decodes to "Hello!" followed by 0xDEADBEEF.
        let key = decode("JBSWY3DPEHPK3PXP");
        assert_eq!(
            key,
            [0x48, 0x65, 0x6c, 0x6c, 0x6f, 0x21, 0xde, 0xad, 0xbe, 0xef]
        );
    }

    #[test]
    fn decode_rfc4648_vectors() {
        assert_eq!(decode(""), b"");
        assert_eq!(decode("MY======"), b"f");
        assert_eq!(decode("MZXQ===="), b"fo");
        assert_eq!(decode("MZXW6==="), b"foo");
        assert_eq!(decode("MZXW6YQ="), b"foob");
        assert_eq!(decode("MZXW6YTB"), b"fooba");
        assert_eq!(decode("MZXW6YTBOI======"), b"foobar");
    }

    #[test]
    fn decode_output_length() {
        // floor(n * 5 / 8) bytes for n valid characters.
        assert_eq!(decode("A").len(), 0);
        assert_eq!(decode("AA").len(), 1);
        assert_eq!(decode("AAAA").len(), 2);
        assert_eq!(decode("AAAAAAAA").len(), 5);
        assert_eq!(decode("JBSWY3DPEHPK3PXP").len(), 10);
    }

    // ── Leniency ─────────────────────────────────────────────────

    #[test]
    fn decode_case_insensitive() {
        assert_eq!(decode("jbswy3dpehpk3pxp"), decode("JBSWY3DPEHPK3PXP"));
    }

    #[test]
    fn decode_ignores_spaces_and_dashes() {
        let canonical = decode("JBSWY3DPEHPK3PXP");
        assert_eq!(decode("JBSW Y3DP EHPK 3PXP"), canonical);
        assert_eq!(decode("JBSW-Y3DP-EHPK-3PXP"), canonical);
        assert_eq!(decode("jbsw y3dp-EHPK 3pxp"), canonical);
    }

    #[test]
    fn decode_drops_non_alphabet_characters() {
        // '0', '1', '8', '9' and punctuation are outside the alphabet.
        let canonical = decode("JBSWY3DPEHPK3PXP");
        assert_eq!(decode("JBSWY3DP!EHPK3PXP??"), canonical);
        assert_eq!(decode("0JBSWY3DP1EHPK3PXP89"), canonical);
    }

    #[test]
    fn decode_all_garbage_yields_empty_key() {
        assert!(decode("!!! ???").is_empty());
        assert!(decode("0189").is_empty());
    }

    // ── Encode ───────────────────────────────────────────────────

    #[test]
    fn encode_then_decode_is_identity() {
        let original = b"hello world secret";
        let b32 = encode(original);
        assert_eq!(decode(&b32), original);
    }

    #[test]
    fn encode_known_value() {
        assert_eq!(encode(b"foo"), "MZXW6");
    }

    // ── Validity check ───────────────────────────────────────────

    #[test]
    fn looks_like_base32_check() {
        assert!(looks_like_base32("JBSWY3DPEHPK3PXP"));
        assert!(looks_like_base32("jbsw y3dp ehpk 3pxp"));
        assert!(looks_like_base32("MZXW6==="));
        assert!(!looks_like_base32(""));
        assert!(!looks_like_base32("   "));
        assert!(!looks_like_base32("!!!"));
        assert!(!looks_like_base32("JBSW0189"));
    }
}
