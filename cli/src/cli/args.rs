//! Command-line argument parsing.

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::settings::env;

/// Courier bot account manager.
///
/// Courier connects command-line tooling to bots on the Courier messaging
/// platform. Log in once per account; tokens are kept in the OS keyring and
/// reused across invocations.
#[derive(Parser, Debug)]
#[command(name = "courier")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Account to operate on. Falls back to the primary account.
    #[arg(short = 'a', long, global = true, env = env::ACCOUNT)]
    pub account: Option<String>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage authentication.
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Manage saved accounts.
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },

    /// Generate shell completion scripts.
    ///
    /// Outputs completion script for the specified shell.
    /// Follow shell-specific instructions to install.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: ShellType,
    },
}

/// Authentication subcommands.
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Log in to the Courier platform.
    ///
    /// By default this opens a local page in your browser where you paste
    /// the bot token, keeping it out of shell history. Use --token to skip
    /// the browser and store a token directly.
    Login {
        /// Name to store the account under (defaults to "default").
        #[arg(short, long)]
        name: Option<String>,

        /// Store this token directly instead of using the browser flow.
        #[arg(long, value_name = "TOKEN")]
        token: Option<String>,

        /// Skip opening the browser automatically.
        #[arg(long)]
        no_browser: bool,
    },

    /// Log out and remove a stored account.
    Logout {
        /// Account to remove (defaults to the selected account).
        name: Option<String>,

        /// Skip confirmation prompt.
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show current authentication status.
    Status,
}

/// Account management subcommands.
#[derive(Subcommand, Debug)]
pub enum AccountCommands {
    /// List all saved accounts.
    List,

    /// Make an account the primary (default) account.
    Use {
        /// Name of the account to make primary.
        name: String,
    },
}

/// Supported shell types for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
}

impl From<ShellType> for clap_complete::Shell {
    fn from(shell: ShellType) -> Self {
        match shell {
            ShellType::Bash => Self::Bash,
            ShellType::Zsh => Self::Zsh,
            ShellType::Fish => Self::Fish,
        }
    }
}
