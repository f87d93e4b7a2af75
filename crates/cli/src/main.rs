//! Libertad Hub CLI - maintenance tools over the hub's stores.
//!
//! # Usage
//!
//! ```bash
//! # Reconcile local and remote copies once, then upload the result
//! hub-cli sync
//!
//! # Show collection counts, identity and remote reachability
//! hub-cli status
//!
//! # List cosmetics close to or past their period after opening
//! hub-cli expiring
//!
//! # Wipe everything, locally and remotely
//! hub-cli reset --yes
//! ```
//!
//! # Commands
//!
//! - `sync` - One-shot startup reconciliation plus flush
//! - `status` - Local counts and remote reachability
//! - `expiring` - Cosmetics expiry report
//! - `reset` - Destructive reset of both stores

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "hub-cli")]
#[command(author, version, about = "Libertad Hub CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the local and remote snapshots and upload the result
    Sync,
    /// Show what is stored locally and whether the remote copy is reachable
    Status {
        /// Skip the remote fetch
        #[arg(long)]
        offline: bool,
    },
    /// List cosmetics by expiry
    Expiring {
        /// Include products that are still fresh
        #[arg(short, long)]
        all: bool,
    },
    /// Replace both stores with an empty snapshot
    Reset {
        /// Confirm the data loss
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Sync => commands::sync::run().await?,
        Commands::Status { offline } => commands::status::run(offline).await?,
        Commands::Expiring { all } => commands::expiring::run(all)?,
        Commands::Reset { yes } => commands::reset::run(yes).await?,
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_reset_flag_parsing() {
        let cli = Cli::try_parse_from(["hub-cli", "reset", "--yes"]).unwrap();
        assert!(matches!(cli.command, Commands::Reset { yes: true }));

        let cli = Cli::try_parse_from(["hub-cli", "reset"]).unwrap();
        assert!(matches!(cli.command, Commands::Reset { yes: false }));
    }
}
