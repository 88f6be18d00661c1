//! Local session token helpers.
//!
//! Decodes the stored bearer token for UX decisions (show "signed in as",
//! prompt a refresh). Authorization is always decided by the backend.

mod reader;
mod storage;
mod token;

pub use reader::AuthSessionReader;
pub use storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};
pub use token::{decode_claims, decode_user_info, SessionClaims, TokenDecodeError, UserInfo};
