//! `moverly login` - SMS and email signin.

use anyhow::Result;
use clap::Subcommand;
use moverly_core::{MoverlyClient, SignedIn};
use serde_json::json;

#[derive(Subcommand, Debug)]
pub enum LoginCommand {
    /// Text a one-time code to a phone number
    SmsSend {
        #[arg(long)]
        phone: String,
    },
    /// Exchange a texted code for a session
    SmsVerify {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        code: String,
    },
    /// Sign in with email and password
    Email {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

pub async fn run(client: &MoverlyClient, command: LoginCommand) -> Result<()> {
    match command {
        LoginCommand::SmsSend { phone } => {
            let challenge = client.auth().request_sms_code(&phone).await?;
            super::print_json(&json!({
                "sent": true,
                "expires_in": challenge.expires_in,
            }))
        }
        LoginCommand::SmsVerify { phone, code } => {
            let signed_in = client.auth().verify_sms_code(&phone, &code).await?;
            report(signed_in)
        }
        LoginCommand::Email { email, password } => {
            let signed_in = client.auth().email_signin(&email, &password).await?;
            report(signed_in)
        }
    }
}

fn report(signed_in: SignedIn) -> Result<()> {
    super::print_json(&json!({
        "signed_in": true,
        "user": signed_in.user,
    }))
}
