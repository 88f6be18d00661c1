//! Subcommand implementations, one module per command group.

pub mod fetch;
pub mod login;
pub mod probe;
pub mod session;

use anyhow::Result;
use serde_json::Value;

/// Print a JSON value to stdout.
pub fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
