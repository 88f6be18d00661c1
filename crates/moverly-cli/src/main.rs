//! Moverly CLI - diagnostics for the Moverly client layer.
//!
//! Probes connection quality and reachability, fetches backend paths through
//! the retrying client, and inspects or drives the stored session.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use moverly_core::config::default_token_path;
use moverly_core::{ClientConfig, MoverlyClient};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "moverly")]
#[command(about = "Diagnostics for the Moverly API client")]
struct Args {
    /// Backend base URL
    #[arg(long, default_value = "http://localhost:3000/api/")]
    api_base: String,

    /// Session token file (defaults to the user config directory)
    #[arg(long)]
    token_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Measure connection quality and reachability
    Probe(commands::probe::ProbeArgs),
    /// GET a backend path through the cache and retry layer
    Fetch(commands::fetch::FetchArgs),
    /// Inspect or clear the stored session token
    #[command(subcommand)]
    Session(commands::session::SessionCommand),
    /// Sign in against the backend
    #[command(subcommand)]
    Login(commands::login::LoginCommand),
    /// Sign out and clear the stored session token
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let token_path = match args.token_file {
        Some(path) => path,
        None => default_token_path()?,
    };
    debug!("Session token file: {}", token_path.display());

    let config = ClientConfig::parse(&args.api_base)?.with_token_path(token_path);

    match args.command {
        Command::Probe(probe) => commands::probe::run(config, probe).await,
        Command::Fetch(fetch) => {
            let client = MoverlyClient::new(config)?;
            commands::fetch::run(&client, fetch).await
        }
        Command::Session(session) => {
            let client = MoverlyClient::new(config)?;
            commands::session::run(&client, session)
        }
        Command::Login(login) => {
            let client = MoverlyClient::new(config)?;
            commands::login::run(&client, login).await
        }
        Command::Logout => {
            let client = MoverlyClient::new(config)?;
            client.auth().logout().await;
            println!("Signed out");
            Ok(())
        }
    }
}
