//! Backend access for feature code.
//!
//! [`ApiClient`] serves data-fetching call sites; [`AuthClient`] runs the
//! signin flows and owns the stored session token's lifecycle.

mod auth;
mod client;

pub use auth::{AuthClient, SignedIn, SmsChallenge};
pub use client::ApiClient;
