//! Unverified decoding of the stored bearer token.
//!
//! The token is a compact `header.payload.signature` string. Only the payload
//! is read, and the signature is never checked: the claims are display
//! metadata, and the backend re-validates every request.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claims the UI cares about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionClaims {
    /// Subject (user) id. Only needed for [`UserInfo`].
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// User details read from the token, for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub expiry: DateTime<Utc>,
}

impl UserInfo {
    fn from_claims(claims: SessionClaims) -> Option<Self> {
        let id = claims.sub?;
        let expiry = Utc.timestamp_opt(claims.exp, 0).single()?;
        Some(Self {
            id,
            email: claims.email,
            name: claims.name,
            expiry,
        })
    }
}

#[derive(Debug, Error)]
pub enum TokenDecodeError {
    #[error("invalid token format")]
    InvalidFormat,
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Decode the payload claims without verifying the signature.
pub fn decode_claims(token: &str) -> Result<SessionClaims, TokenDecodeError> {
    let mut parts = token.trim().split('.');
    let payload_b64 = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(p), Some(s), None) if !h.is_empty() && !p.is_empty() && !s.is_empty() => p,
        _ => return Err(TokenDecodeError::InvalidFormat),
    };

    // Some issuers pad their segments; the compact form does not.
    let payload_bytes = URL_SAFE_NO_PAD.decode(payload_b64.trim_end_matches('='))?;
    Ok(serde_json::from_slice(&payload_bytes)?)
}

/// Decode the token into display-only user details.
pub fn decode_user_info(token: &str) -> Result<UserInfo, TokenDecodeError> {
    let claims = decode_claims(token)?;
    UserInfo::from_claims(claims).ok_or(TokenDecodeError::InvalidFormat)
}

#[cfg(test)]
pub(crate) fn encode_test_token(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.signature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_claims() {
        let token = encode_test_token(&json!({
            "sub": "u-42",
            "email": "pat@moverly.test",
            "name": "Pat",
            "exp": 1_900_000_000_i64,
        }));

        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("u-42"));
        assert_eq!(claims.email.as_deref(), Some("pat@moverly.test"));
        assert_eq!(claims.exp, 1_900_000_000);
    }

    #[test]
    fn test_optional_claims_may_be_missing() {
        let token = encode_test_token(&json!({ "sub": "u-1", "exp": 10 }));
        let info = decode_user_info(&token).unwrap();
        assert_eq!(info.id, "u-1");
        assert!(info.email.is_none());
        assert!(info.name.is_none());
        assert_eq!(info.expiry.timestamp(), 10);
    }

    #[test]
    fn test_padded_payload_is_accepted() {
        let header = URL_SAFE_NO_PAD.encode(b"{}");
        let body = base64::engine::general_purpose::URL_SAFE
            .encode(json!({ "sub": "u", "exp": 1 }).to_string());
        let token = format!("{header}.{body}.sig");
        assert!(decode_claims(&token).is_ok());
    }

    #[test]
    fn test_wrong_segment_count_is_invalid_format() {
        assert!(matches!(
            decode_claims("only.two"),
            Err(TokenDecodeError::InvalidFormat)
        ));
        assert!(matches!(
            decode_claims("a.b.c.d"),
            Err(TokenDecodeError::InvalidFormat)
        ));
        assert!(matches!(
            decode_claims(""),
            Err(TokenDecodeError::InvalidFormat)
        ));
        assert!(matches!(
            decode_claims("a..c"),
            Err(TokenDecodeError::InvalidFormat)
        ));
    }

    #[test]
    fn test_garbage_payload_errors() {
        assert!(matches!(
            decode_claims("a.!!!.c"),
            Err(TokenDecodeError::Base64(_))
        ));
        let not_json = URL_SAFE_NO_PAD.encode(b"not json");
        assert!(matches!(
            decode_claims(&format!("a.{not_json}.c")),
            Err(TokenDecodeError::Json(_))
        ));
    }

    #[test]
    fn test_missing_expiry_is_a_decode_failure() {
        let token = encode_test_token(&json!({ "sub": "u-1" }));
        assert!(decode_claims(&token).is_err());
    }

    #[test]
    fn test_expiry_without_subject_still_decodes() {
        let token = encode_test_token(&json!({ "userId": "legacy-9", "exp": 1_900_000_000_i64 }));

        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.sub, None);
        assert_eq!(claims.exp, 1_900_000_000);

        assert!(matches!(
            decode_user_info(&token),
            Err(TokenDecodeError::InvalidFormat)
        ));
    }
}
