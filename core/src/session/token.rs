//! Expiry checks for the signed session token.
//!
//! The token is a JWT. The client never verifies the signature; it only reads
//! the payload's `exp` claim to decide whether the token is still worth
//! presenting. Anything that cannot be read counts as expired.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// The subset of claims the client cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    /// Expiry in seconds since the epoch.
    pub exp: u64,
}

/// Decode the payload of a token without verifying its signature.
///
/// `exp` must be present. It is compared by the caller against an explicit
/// clock, so the library's own expiry check is turned off.
pub fn decode_claims(token: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.set_required_spec_claims(&["exp"]);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.leeway = 0;

    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

/// Expiry of a token in whole seconds since the epoch, if it has one.
pub fn expires_at(token: &str) -> Option<u64> {
    decode_claims(token).ok().map(|claims| claims.exp)
}

/// Whether `token` should be treated as expired at `now`.
///
/// A missing token, an undecodable token, or one without an `exp` claim is
/// expired. Otherwise the token is expired when `exp` lies before `now`.
pub fn is_token_expired(token: Option<&str>, now: SystemTime) -> bool {
    let Some(token) = token else {
        return true;
    };
    let exp = match decode_claims(token) {
        Ok(claims) => claims.exp,
        Err(e) => {
            log::warn!("Error decoding token: {e}");
            return true;
        }
    };
    let now_secs = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    exp < now_secs
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::Duration;

    /// Sign a token with the given JSON payload. The key is irrelevant to the client.
    pub(crate) fn make_token(payload: &serde_json::Value) -> String {
        encode(
            &Header::default(),
            payload,
            &EncodingKey::from_secret(b"companion-secret"),
        )
        .unwrap()
    }

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_missing_token_is_expired() {
        assert!(is_token_expired(None, at(1_000)));
    }

    #[test]
    fn test_unparsable_token_is_expired() {
        assert!(is_token_expired(Some("not-a-token"), at(1_000)));
        assert!(is_token_expired(Some("a.!!!.c"), at(1_000)));
        assert!(is_token_expired(Some("a..c"), at(1_000)));
    }

    #[test]
    fn test_token_without_exp_is_expired() {
        let token = make_token(&serde_json::json!({ "sub": "device" }));
        assert!(is_token_expired(Some(&token), at(1_000)));

        let token = make_token(&serde_json::json!({ "exp": "tomorrow" }));
        assert!(is_token_expired(Some(&token), at(1_000)));
    }

    #[test]
    fn test_exp_in_past_is_expired() {
        let token = make_token(&serde_json::json!({ "exp": 999 }));
        assert!(is_token_expired(Some(&token), at(1_000)));
    }

    #[test]
    fn test_exp_in_future_is_valid() {
        let token = make_token(&serde_json::json!({ "exp": 1_001 }));
        assert!(!is_token_expired(Some(&token), at(1_000)));
    }

    #[test]
    fn test_exp_equal_to_now_is_valid() {
        let token = make_token(&serde_json::json!({ "exp": 1_000 }));
        assert!(!is_token_expired(Some(&token), at(1_000)));
    }

    #[test]
    fn test_signature_is_not_checked() {
        let token = make_token(&serde_json::json!({ "exp": 4_102_444_800_u64 }));
        let (unsigned, _) = token.rsplit_once('.').unwrap();
        let tampered = format!("{unsigned}.bm90LWEtc2lnbmF0dXJl");
        assert!(!is_token_expired(Some(&tampered), at(1_000)));
    }

    #[test]
    fn test_foreign_audience_is_ignored() {
        let token = make_token(&serde_json::json!({ "exp": 1_001, "aud": "companion" }));
        assert!(!is_token_expired(Some(&token), at(1_000)));
    }

    #[test]
    fn test_expires_at() {
        let token = make_token(&serde_json::json!({ "exp": 1_700_000_000 }));
        assert_eq!(expires_at(&token), Some(1_700_000_000));
        assert_eq!(expires_at("garbage"), None);
    }
}
