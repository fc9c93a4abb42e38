//! Command dispatch: bridges CLI args -> domain handles -> output formatting.

pub mod agents;
pub mod config_cmd;
pub mod elements;
pub mod protocols;
pub mod services;
pub mod util;
pub mod views;

use dms_core::Dms;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a gateway-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, dms: &Dms, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Agents(args) => agents::handle(dms, args, global).await,
        Command::Elements(args) => elements::handle(dms, args, global).await,
        Command::Views(args) => views::handle(dms, args, global).await,
        Command::Services(args) => services::handle(dms, args, global).await,
        Command::Protocols(args) => protocols::handle(dms, args, global).await,
        // Handled before a gateway is built
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(_) => Ok(()),
    }
}
