//! ChatOps CLI - Operator tools for the relay.
//!
//! # Usage
//!
//! ```bash
//! # Answer a request locally and print the Slack message
//! chatops-cli ask "show open errors for my-project-123"
//!
//! # Print signature headers for a webhook payload
//! chatops-cli sign --body event.json
//! chatops-cli sign --body event.json --timestamp 1700000000
//! ```
//!
//! # Commands
//!
//! - `ask` - Run the dispatcher and formatter without Slack
//! - `sign` - Sign a payload with `SLACK_SIGNING_SECRET`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "chatops-cli")]
#[command(author, version, about = "ChatOps relay operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a request with the agent and print the outbound message
    Ask {
        /// Free-text request, as a user would type it in Slack
        text: String,
    },
    /// Print Slack signature headers for a request body
    Sign {
        /// File holding the exact request body
        #[arg(short, long)]
        body: PathBuf,

        /// Unix timestamp to sign with (defaults to now)
        #[arg(short, long)]
        timestamp: Option<i64>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Ask { text } => commands::ask::run(&text).await?,
        Commands::Sign { body, timestamp } => commands::sign::run(&body, timestamp)?,
    }
    Ok(())
}
