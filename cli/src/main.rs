//! Courier CLI - Bot account manager for the Courier messaging platform
//!
//! Courier authenticates an operator against the platform via a
//! browser-mediated login and keeps per-account tokens in the OS keyring,
//! so every subsequent invocation can pick the right credential without
//! re-prompting.

mod accounts;
mod cli;
mod client;
mod config;
mod error;
mod login;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{AccountCommands, AccountSelection, AuthCommands, Cli, Commands};
use crate::config::settings::env;
use crate::error::Result;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(env::LOG_LEVEL)
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    // Run the command
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::load_config()?;
    // Account selection (flag > env > primary) is resolved per handler from
    // this one explicit value; nothing reads ambient state later.
    let selection = AccountSelection::new(cli.account.clone());

    match cli.command {
        Commands::Auth { command } => match command {
            AuthCommands::Login {
                name,
                token,
                no_browser,
            } => cli::commands::handle_login(&config, name, token, no_browser).await,
            AuthCommands::Logout { name, yes } => {
                cli::commands::handle_logout(&selection, name, yes)
            }
            AuthCommands::Status => cli::commands::handle_status(&config, &selection).await,
        },
        Commands::Account { command } => match command {
            AccountCommands::List => cli::commands::handle_account_list(),
            AccountCommands::Use { name } => cli::commands::handle_account_use(&name),
        },
        Commands::Completions { shell } => {
            cli::commands::handle_completions(shell);
            Ok(())
        }
    }
}
