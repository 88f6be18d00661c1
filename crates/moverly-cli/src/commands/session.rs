//! `moverly session` - inspect or clear the stored token.

use anyhow::Result;
use clap::Subcommand;
use moverly_core::{AuthSessionReader, MoverlyClient};
use serde_json::{json, Value};

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Show what the stored token says (unverified)
    Status,
    /// Delete the stored token
    Clear,
}

pub fn run(client: &MoverlyClient, command: SessionCommand) -> Result<()> {
    match command {
        SessionCommand::Status => super::print_json(&status(client.session())),
        SessionCommand::Clear => {
            client.session().clear_token();
            println!("Session cleared");
            Ok(())
        }
    }
}

fn status(session: &AuthSessionReader) -> Value {
    json!({
        "has_token": session.has_token(),
        "expired": session.is_token_expired(),
        "needs_refresh": session.needs_refresh(),
        "minutes_left": session.time_until_expiration(),
        "user": session.user_info(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use moverly_core::MemoryTokenStorage;
    use std::sync::Arc;

    #[test]
    fn test_status_without_token() {
        let session = AuthSessionReader::new(Arc::new(MemoryTokenStorage::new()));
        let value = status(&session);

        assert_eq!(value["has_token"], json!(false));
        assert_eq!(value["expired"], json!(true));
        assert_eq!(value["needs_refresh"], json!(true));
        assert_eq!(value["minutes_left"], Value::Null);
        assert_eq!(value["user"], Value::Null);
    }

    #[test]
    fn test_status_with_garbage_token() {
        let session = AuthSessionReader::new(Arc::new(MemoryTokenStorage::new()));
        session.store_token("not-a-token").unwrap();
        let value = status(&session);

        assert_eq!(value["has_token"], json!(true));
        assert_eq!(value["expired"], json!(true));
        assert_eq!(value["user"], Value::Null);
    }
}
