//! Bearer tokens identifying API users.
//!
//! Tokens are HMAC-SHA256 based and scoped to a user id.
//! Format: `mentor_ut_<user_id>_<hmac_hex>`

use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Token prefix used to identify mentor user tokens.
const TOKEN_PREFIX: &str = "mentor_ut_";

/// Length of a hyphenated UUID.
const UUID_LEN: usize = 36;

/// Errors that can occur during token operations.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token format: {0}")]
    InvalidFormat(String),

    #[error("invalid user ID in token: {0}")]
    InvalidUserId(String),

    #[error("token HMAC verification failed")]
    HmacMismatch,

    #[error("missing token secret")]
    MissingSecret,
}

/// Configuration for token generation and validation.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// The HMAC secret key bytes.
    pub secret: Vec<u8>,
}

impl TokenConfig {
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }

    /// Create a TokenConfig from a hex-encoded secret.
    pub fn from_hex(secret_hex: &str) -> Result<Self, TokenError> {
        let secret = hex::decode(secret_hex.trim()).map_err(|e| {
            TokenError::InvalidFormat(format!("token secret is not valid hex: {e}"))
        })?;
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        Ok(Self::new(secret))
    }
}

/// Claims extracted from a validated token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserClaims {
    pub user_id: Uuid,
}

/// Generate a bearer token for a user.
///
/// The HMAC-SHA256 is computed over `user:<user_id>`.
pub fn generate_token(config: &TokenConfig, user_id: Uuid) -> String {
    let mac = compute_hmac(&config.secret, signed_message(user_id).as_bytes());
    let hmac_hex = hex::encode(mac);
    format!("{TOKEN_PREFIX}{user_id}_{hmac_hex}")
}

/// Validate a bearer token and extract its claims.
///
/// The HMAC is recomputed and compared in constant time.
pub fn validate_token(config: &TokenConfig, token: &str) -> Result<UserClaims, TokenError> {
    let rest = token.strip_prefix(TOKEN_PREFIX).ok_or_else(|| {
        TokenError::InvalidFormat(format!("token must start with {TOKEN_PREFIX:?}"))
    })?;

    let (user_id_str, after_user_id) = parse_uuid_prefix(rest)?;
    let user_id =
        Uuid::parse_str(user_id_str).map_err(|e| TokenError::InvalidUserId(e.to_string()))?;

    let hmac_hex = after_user_id.strip_prefix('_').ok_or_else(|| {
        TokenError::InvalidFormat("expected underscore after user id".to_string())
    })?;

    let provided_mac = hex::decode(hmac_hex)
        .map_err(|e| TokenError::InvalidFormat(format!("invalid hex in hmac: {e}")))?;

    verify_hmac_constant_time(
        &config.secret,
        signed_message(user_id).as_bytes(),
        &provided_mac,
    )?;

    Ok(UserClaims { user_id })
}

fn signed_message(user_id: Uuid) -> String {
    format!("user:{user_id}")
}

/// Split a leading UUID off a string. Returns (uuid_str, remainder).
fn parse_uuid_prefix(s: &str) -> Result<(&str, &str), TokenError> {
    if s.len() < UUID_LEN || !s.is_char_boundary(UUID_LEN) {
        return Err(TokenError::InvalidFormat(
            "token too short to contain a valid UUID".to_string(),
        ));
    }
    Ok(s.split_at(UUID_LEN))
}

/// Compute HMAC-SHA256 over the given message with the given key.
fn compute_hmac(key: &[u8], message: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Verify HMAC with `verify_slice`, which compares in constant time.
fn verify_hmac_constant_time(
    key: &[u8],
    message: &[u8],
    expected_mac: &[u8],
) -> Result<(), TokenError> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(message);
    mac.verify_slice(expected_mac)
        .map_err(|_| TokenError::HmacMismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TokenConfig {
        TokenConfig::new(b"test-secret-key-for-mentor".to_vec())
    }

    fn user() -> Uuid {
        Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap()
    }

    #[test]
    fn generate_token_has_correct_format() {
        let token = generate_token(&test_config(), user());

        let rest = token.strip_prefix("mentor_ut_").expect("prefix");
        assert!(rest.starts_with(&user().to_string()));
        let hmac_hex = rest[UUID_LEN..].strip_prefix('_').unwrap();
        assert_eq!(hmac_hex.len(), 64, "HMAC-SHA256 hex should be 64 chars");
    }

    #[test]
    fn generate_and_validate_roundtrip() {
        let config = test_config();
        let token = generate_token(&config, user());
        let claims = validate_token(&config, &token).unwrap();
        assert_eq!(claims.user_id, user());
    }

    #[test]
    fn reject_tampered_hmac() {
        let config = test_config();
        let mut tampered = generate_token(&config, user());
        let last_char = tampered.pop().unwrap();
        tampered.push(if last_char == 'a' { 'b' } else { 'a' });

        assert!(matches!(
            validate_token(&config, &tampered),
            Err(TokenError::HmacMismatch)
        ));
    }

    #[test]
    fn reject_swapped_user_id() {
        let config = test_config();
        let token = generate_token(&config, user());
        let other = Uuid::parse_str("660e8400-e29b-41d4-a716-446655440000").unwrap();
        let tampered = token.replace(&user().to_string(), &other.to_string());

        assert!(matches!(
            validate_token(&config, &tampered),
            Err(TokenError::HmacMismatch)
        ));
    }

    #[test]
    fn reject_wrong_secret() {
        let token = generate_token(&test_config(), user());
        let wrong = TokenConfig::new(b"wrong-secret-key".to_vec());
        assert!(matches!(
            validate_token(&wrong, &token),
            Err(TokenError::HmacMismatch)
        ));
    }

    #[test]
    fn reject_malformed_tokens() {
        let config = test_config();
        for token in ["", "wrong_prefix_abc", "mentor_ut_short"] {
            assert!(
                matches!(validate_token(&config, token), Err(TokenError::InvalidFormat(_))),
                "{token:?} should be rejected as malformed"
            );
        }
    }

    #[test]
    fn reject_multibyte_garbage_without_panicking() {
        let config = test_config();
        let token = format!("mentor_ut_a{}", "é".repeat(20));
        assert!(matches!(
            validate_token(&config, &token),
            Err(TokenError::InvalidFormat(_))
        ));
    }

    #[test]
    fn reject_invalid_uuid() {
        let config = test_config();
        let result = validate_token(&config, "mentor_ut_not-a-valid-uuid-at-all-noooooo_abcdef");
        assert!(matches!(result, Err(TokenError::InvalidUserId(_))));
    }

    #[test]
    fn reject_invalid_hex_in_hmac() {
        let config = test_config();
        let token = format!("mentor_ut_{}_zzzz-not-valid-hex!", user());
        assert!(matches!(
            validate_token(&config, &token),
            Err(TokenError::InvalidFormat(_))
        ));
    }

    #[test]
    fn same_inputs_produce_same_token() {
        let config = test_config();
        assert_eq!(generate_token(&config, user()), generate_token(&config, user()));
        assert_ne!(
            generate_token(&config, user()),
            generate_token(&config, Uuid::new_v4())
        );
    }

    #[test]
    fn from_hex_rejects_bad_secrets() {
        assert!(matches!(
            TokenConfig::from_hex("not hex"),
            Err(TokenError::InvalidFormat(_))
        ));
        assert!(matches!(TokenConfig::from_hex(""), Err(TokenError::MissingSecret)));
        assert_eq!(TokenConfig::from_hex("00ff").unwrap().secret, vec![0x00, 0xff]);
    }
}
