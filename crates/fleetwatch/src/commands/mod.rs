//! Command dispatch: bridges CLI args -> controller calls -> output formatting.

pub mod config_cmd;
pub mod reboot;
pub mod servers;
pub mod services;
pub mod stats;
pub mod util;
pub mod watch;

use fleetwatch_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a controller-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Servers(args) => servers::handle(controller, args, global).await,
        Command::Services(args) => services::handle(controller, args, global).await,
        Command::Reboot(args) => reboot::handle(controller, args, global).await,
        Command::Stats => stats::handle(controller, global).await,
        Command::Watch(args) => watch::handle(controller, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions do not need a controller".into(),
        )),
    }
}
