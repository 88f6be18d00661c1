//! AuthSessionReader - point-in-time questions about the stored token.
//!
//! Every query fails safe: a missing, unreadable or undecodable token reads
//! as expired and in need of a refresh, with no user info. Nothing here
//! verifies the signature, so answers are for display only.

use super::storage::TokenStorage;
use super::token::{decode_claims, decode_user_info, UserInfo};
use crate::config::SessionConfig;
use crate::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reads the locally stored session token.
#[derive(Clone)]
pub struct AuthSessionReader {
    storage: Arc<dyn TokenStorage>,
}

impl AuthSessionReader {
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        Self { storage }
    }

    /// The stored token, or `None` when absent, blank or unreadable.
    pub fn token(&self) -> Option<String> {
        match self.storage.load() {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                warn!("Failed to read session token: {}", e);
                None
            }
        }
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    /// Seconds of lifetime left at `now`, negative once expired.
    fn remaining_secs_at(&self, now: DateTime<Utc>) -> Option<i64> {
        let token = self.token()?;
        match decode_claims(&token) {
            Ok(claims) => {
                let remaining = claims.exp.checked_sub(now.timestamp());
                if remaining.is_none() {
                    debug!("Session token expiry {} is out of range", claims.exp);
                }
                remaining
            }
            Err(e) => {
                debug!("Session token could not be decoded: {}", e);
                None
            }
        }
    }

    pub fn is_token_expired(&self) -> bool {
        self.is_token_expired_at(Utc::now())
    }

    /// Expired when the expiry is at or before `now`, or the token is unusable.
    pub fn is_token_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.remaining_secs_at(now).map_or(true, |secs| secs <= 0)
    }

    pub fn time_until_expiration(&self) -> Option<u64> {
        self.time_until_expiration_at(Utc::now())
    }

    /// Whole minutes left (floored, never negative), `None` without a usable token.
    pub fn time_until_expiration_at(&self, now: DateTime<Utc>) -> Option<u64> {
        self.remaining_secs_at(now)
            .map(|secs| u64::try_from(secs.max(0) / 60).unwrap_or(0))
    }

    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh_at(Utc::now())
    }

    /// Less than five minutes left, or no usable token.
    pub fn needs_refresh_at(&self, now: DateTime<Utc>) -> bool {
        self.remaining_secs_at(now)
            .map_or(true, |secs| secs < SessionConfig::REFRESH_WINDOW_SECS)
    }

    pub fn user_info(&self) -> Option<UserInfo> {
        let token = self.token()?;
        decode_user_info(&token)
            .map_err(|e| debug!("Session token could not be decoded: {}", e))
            .ok()
    }

    /// Replace the stored token (after a successful signin).
    pub fn store_token(&self, token: &str) -> Result<()> {
        self.storage.store(token)?;
        info!("Session token stored");
        Ok(())
    }

    /// Delete the stored token. Safe to call repeatedly.
    pub fn clear_token(&self) {
        match self.storage.clear() {
            Ok(()) => debug!("Session token cleared"),
            Err(e) => warn!("Failed to clear session token: {}", e),
        }
    }
}

impl std::fmt::Debug for AuthSessionReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSessionReader")
            .field("has_token", &self.has_token())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::MemoryTokenStorage;
    use crate::session::token::encode_test_token;
    use crate::MoverlyError;
    use chrono::Duration;
    use serde_json::json;

    fn reader_with(token: Option<&str>) -> AuthSessionReader {
        let storage = MemoryTokenStorage::new();
        if let Some(token) = token {
            storage.store(token).unwrap();
        }
        AuthSessionReader::new(Arc::new(storage))
    }

    fn token_expiring_at(exp: DateTime<Utc>) -> String {
        encode_test_token(&json!({
            "sub": "u-7",
            "email": "sam@moverly.test",
            "name": "Sam",
            "exp": exp.timestamp(),
        }))
    }

    #[test]
    fn test_ten_minutes_left_is_fresh() {
        let now = Utc::now();
        let reader = reader_with(Some(&token_expiring_at(now + Duration::seconds(600))));

        assert!(reader.has_token());
        assert!(!reader.is_token_expired_at(now));
        assert!(!reader.needs_refresh_at(now));
        assert_eq!(reader.time_until_expiration_at(now), Some(10));
    }

    #[test]
    fn test_under_five_minutes_needs_refresh_but_not_expired() {
        let now = Utc::now();
        let reader = reader_with(Some(&token_expiring_at(now + Duration::seconds(200))));

        assert!(reader.needs_refresh_at(now));
        assert!(!reader.is_token_expired_at(now));
        assert_eq!(reader.time_until_expiration_at(now), Some(3));
    }

    #[test]
    fn test_past_expiry_is_expired_and_clamped() {
        let now = Utc::now();
        let reader = reader_with(Some(&token_expiring_at(now - Duration::seconds(10))));

        assert!(reader.is_token_expired_at(now));
        assert!(reader.needs_refresh_at(now));
        assert_eq!(reader.time_until_expiration_at(now), Some(0));
    }

    #[test]
    fn test_wall_clock_variants_agree() {
        let reader = reader_with(Some(&token_expiring_at(Utc::now() + Duration::hours(1))));
        assert!(!reader.is_token_expired());
        assert!(!reader.needs_refresh());
        assert!(reader.time_until_expiration().unwrap() >= 59);
    }

    #[test]
    fn test_user_info_from_token() {
        let exp = Utc::now() + Duration::hours(1);
        let reader = reader_with(Some(&token_expiring_at(exp)));

        let info = reader.user_info().unwrap();
        assert_eq!(info.id, "u-7");
        assert_eq!(info.email.as_deref(), Some("sam@moverly.test"));
        assert_eq!(info.name.as_deref(), Some("Sam"));
        assert_eq!(info.expiry.timestamp(), exp.timestamp());
    }

    #[test]
    fn test_no_token_defaults() {
        let reader = reader_with(None);
        assert!(!reader.has_token());
        assert!(reader.is_token_expired());
        assert!(reader.needs_refresh());
        assert_eq!(reader.time_until_expiration(), None);
        assert_eq!(reader.user_info(), None);
    }

    #[test]
    fn test_empty_token_counts_as_absent() {
        let reader = reader_with(Some("   "));
        assert!(!reader.has_token());
        assert!(reader.is_token_expired());
    }

    #[test]
    fn test_malformed_token_fails_safe() {
        let reader = reader_with(Some("definitely-not-a-token"));
        assert!(reader.has_token());
        assert!(reader.is_token_expired());
        assert!(reader.needs_refresh());
        assert_eq!(reader.time_until_expiration(), None);
        assert_eq!(reader.user_info(), None);
    }

    #[test]
    fn test_clear_token_twice_is_same_as_once() {
        let reader = reader_with(Some(&token_expiring_at(Utc::now() + Duration::hours(1))));

        reader.clear_token();
        assert!(!reader.has_token());
        reader.clear_token();
        assert!(!reader.has_token());
        assert!(reader.is_token_expired());
    }

    #[test]
    fn test_out_of_range_expiry_fails_safe() {
        let now = Utc::now();
        let token = encode_test_token(&json!({ "sub": "u-7", "exp": i64::MIN }));
        let reader = reader_with(Some(&token));

        assert!(reader.is_token_expired_at(now));
        assert!(reader.needs_refresh_at(now));
        assert_eq!(reader.time_until_expiration_at(now), None);
        assert_eq!(reader.user_info(), None);
    }

    #[test]
    fn test_far_future_expiry_is_fresh() {
        let now = Utc::now();
        let token = encode_test_token(&json!({ "sub": "u-7", "exp": i64::MAX }));
        let reader = reader_with(Some(&token));

        assert!(!reader.is_token_expired_at(now));
        assert!(!reader.needs_refresh_at(now));
        assert!(reader.time_until_expiration_at(now).unwrap() > 0);
        // Beyond chrono's range, so no displayable expiry.
        assert_eq!(reader.user_info(), None);
    }

    #[test]
    fn test_expiry_does_not_need_subject() {
        let now = Utc::now();
        let token = encode_test_token(&json!({
            "userId": "legacy-9",
            "exp": (now + Duration::hours(1)).timestamp(),
        }));
        let reader = reader_with(Some(&token));

        assert!(!reader.is_token_expired_at(now));
        assert!(!reader.needs_refresh_at(now));
        assert_eq!(reader.time_until_expiration_at(now), Some(60));
        assert_eq!(reader.user_info(), None);
    }

    struct BrokenStorage;

    impl TokenStorage for BrokenStorage {
        fn load(&self) -> Result<Option<String>> {
            Err(MoverlyError::Other("disk on fire".into()))
        }
        fn store(&self, _token: &str) -> Result<()> {
            Err(MoverlyError::Other("disk on fire".into()))
        }
        fn clear(&self) -> Result<()> {
            Err(MoverlyError::Other("disk on fire".into()))
        }
    }

    #[test]
    fn test_storage_failures_degrade_to_no_token() {
        let reader = AuthSessionReader::new(Arc::new(BrokenStorage));
        assert!(!reader.has_token());
        assert!(reader.is_token_expired());
        assert_eq!(reader.user_info(), None);
        reader.clear_token();
        assert!(reader.store_token("a.b.c").is_err());
    }
}
