//! Signin and signout against the backend.
//!
//! The backend authenticates; this side only forwards credentials and keeps
//! the returned bearer token in session storage.

use super::client::ApiClient;
use crate::network::FetchOptions;
use crate::session::{AuthSessionReader, UserInfo};
use crate::{MoverlyError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Backend paths used by the auth flow.
mod paths {
    pub const SMS_SEND: &str = "auth/sms/send";
    pub const SMS_VERIFY: &str = "auth/sms/verify";
    pub const EMAIL_SIGNIN: &str = "auth/email/signin";
    pub const LOGOUT: &str = "auth/logout";
}

/// Result of asking the backend to send a verification code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[non_exhaustive]
pub struct SmsChallenge {
    /// Seconds until the code stops being accepted, when the backend says.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Token payload returned by a successful signin.
#[derive(Debug, Clone, Deserialize)]
struct SigninResponse {
    token: String,
}

/// A completed signin.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct SignedIn {
    /// Decoded claims of the stored token, when they could be read.
    pub user: Option<UserInfo>,
}

#[derive(Serialize)]
struct SmsSendRequest<'a> {
    phone: &'a str,
}

#[derive(Serialize)]
struct SmsVerifyRequest<'a> {
    phone: &'a str,
    code: &'a str,
}

#[derive(Serialize)]
struct EmailSigninRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Login/logout client.
pub struct AuthClient {
    api: Arc<ApiClient>,
    session: AuthSessionReader,
}

impl AuthClient {
    pub fn new(api: Arc<ApiClient>, session: AuthSessionReader) -> Self {
        Self { api, session }
    }

    pub fn session(&self) -> &AuthSessionReader {
        &self.session
    }

    /// Ask the backend to text a one-time code to `phone`.
    ///
    /// Sent once: a retried send could deliver a second code.
    pub async fn request_sms_code(&self, phone: &str) -> Result<SmsChallenge> {
        let phone = require("phone", phone)?;
        let challenge: Option<SmsChallenge> = self
            .api
            .post_json_with(
                paths::SMS_SEND,
                &SmsSendRequest { phone },
                FetchOptions::new().with_max_attempts(1),
            )
            .await?;
        info!("Verification code requested");
        Ok(challenge.unwrap_or_default())
    }

    /// Exchange a texted code for a session.
    pub async fn verify_sms_code(&self, phone: &str, code: &str) -> Result<SignedIn> {
        let phone = require("phone", phone)?;
        let code = require("code", code)?;
        let response: SigninResponse = self
            .api
            .post_json(paths::SMS_VERIFY, &SmsVerifyRequest { phone, code })
            .await?;
        self.complete_signin(response)
    }

    /// Sign in with email and password.
    pub async fn email_signin(&self, email: &str, password: &str) -> Result<SignedIn> {
        let email = require("email", email)?;
        if !email.contains('@') {
            return Err(MoverlyError::Validation {
                field: "email".to_string(),
                message: "must be an email address".to_string(),
            });
        }
        if password.is_empty() {
            return Err(MoverlyError::Validation {
                field: "password".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        let response: SigninResponse = self
            .api
            .post_json(paths::EMAIL_SIGNIN, &EmailSigninRequest { email, password })
            .await?;
        self.complete_signin(response)
    }

    /// End the session. The local token and cached responses are cleared
    /// even when the backend call fails.
    pub async fn logout(&self) {
        if self.session.has_token() {
            let result: Result<Option<serde_json::Value>> = self
                .api
                .post_json(paths::LOGOUT, &serde_json::json!({}))
                .await;
            if let Err(e) = result {
                warn!("Backend logout failed, clearing local session anyway: {}", e);
            }
        }
        self.session.clear_token();
        self.api.clear_cache();
        info!("Signed out");
    }

    fn complete_signin(&self, response: SigninResponse) -> Result<SignedIn> {
        let token = response.token.trim();
        if token.is_empty() {
            return Err(MoverlyError::Decode {
                message: "signin response carried an empty token".to_string(),
            });
        }
        self.session.store_token(token)?;
        self.api.clear_cache();
        let user = self.session.user_info();
        match &user {
            Some(user) => info!("Signed in as {}", user.id),
            None => warn!("Signed in, but the session token could not be decoded"),
        }
        Ok(SignedIn { user })
    }
}

fn require<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(MoverlyError::Validation {
            field: field.to_string(),
            message: "must not be empty".to_string(),
        });
    }
    Ok(value)
}
