//! Short token generation.
//!
//! Tokens are the first 8 hex characters of `SHA-256(original_url ‖ nanos)`.
//! The generator is a pure function of its inputs and makes no uniqueness
//! promise; the record store's UNIQUE constraint on `links.token` catches
//! collisions and [`crate::application::services::LinkService`] regenerates.

use chrono::Utc;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

/// Number of hex characters kept from the digest.
pub const TOKEN_LENGTH: usize = 8;

static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{8}$").expect("token pattern is valid"));

/// Generates a token for `original_url` salted with the current time.
pub fn generate(original_url: &str) -> String {
    let nanos = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros().saturating_mul(1_000));
    generate_with_salt(original_url, nanos)
}

/// Deterministic variant of [`generate`] with an explicit temporal salt.
pub fn generate_with_salt(original_url: &str, salt_nanos: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(original_url.as_bytes());
    hasher.update(salt_nanos.to_string().as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..TOKEN_LENGTH].to_string()
}

/// Returns true if `token` has the shape produced by [`generate`].
pub fn is_well_formed(token: &str) -> bool {
    TOKEN_REGEX.is_match(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_has_fixed_length() {
        assert_eq!(generate("https://example.com").len(), TOKEN_LENGTH);
        assert_eq!(generate("").len(), TOKEN_LENGTH);
    }

    #[test]
    fn test_generate_is_lowercase_hex() {
        let token = generate("https://example.com/some/long/path?q=1");
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(is_well_formed(&token));
    }

    #[test]
    fn test_same_inputs_same_token() {
        let a = generate_with_salt("https://example.com", 1_700_000_000_000_000_000);
        let b = generate_with_salt("https://example.com", 1_700_000_000_000_000_000);
        assert_eq!(a, b);
    }

    #[test]
    fn test_salt_changes_token() {
        let a = generate_with_salt("https://example.com", 1);
        let b = generate_with_salt("https://example.com", 2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_known_digest_prefix() {
        // sha256("abc0")
        let expected = {
            let mut h = Sha256::new();
            h.update(b"abc0");
            hex::encode(h.finalize())[..8].to_string()
        };
        assert_eq!(generate_with_salt("abc", 0), expected);
    }

    #[test]
    fn test_is_well_formed_rejects_other_shapes() {
        assert!(is_well_formed("0a1b2c3d"));
        assert!(!is_well_formed("0A1B2C3D"));
        assert!(!is_well_formed("0a1b2c3"));
        assert!(!is_well_formed("0a1b2c3d4"));
        assert!(!is_well_formed("api"));
        assert!(!is_well_formed("zzzzzzzz"));
    }
}
