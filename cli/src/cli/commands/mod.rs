//! Command implementations.

pub mod account;
pub mod auth;

pub use account::{handle_account_list, handle_account_use};
pub use auth::{handle_login, handle_logout, handle_status};

use clap::CommandFactory;

use crate::cli::args::{Cli, ShellType};

/// Handle the `courier completions <shell>` command.
pub fn handle_completions(shell: ShellType) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(
        clap_complete::Shell::from(shell),
        &mut cmd,
        name,
        &mut std::io::stdout(),
    );
}
