//! Shared helpers for command handlers.

use std::io::IsTerminal;

use fleetwatch_core::Status;

use crate::cli::{GlobalOpts, OutputFormat, StatusArg};
use crate::error::CliError;
use crate::output;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to prompt on, `--yes` is mandatory.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

pub fn status_of(arg: StatusArg) -> Status {
    match arg {
        StatusArg::Online => Status::Online,
        StatusArg::Warning => Status::Warning,
        StatusArg::Offline => Status::Offline,
    }
}

/// Color only applies to human-readable table output.
pub fn use_color(global: &GlobalOpts) -> bool {
    matches!(global.output, OutputFormat::Table) && output::should_color(&global.color)
}

/// Status label colored per `--color`.
pub fn status_label(status: Status, global: &GlobalOpts) -> String {
    output::paint_status(status, use_color(global))
}

/// Progress/status line on stderr, silenced by `--quiet`.
pub fn note(message: &str, global: &GlobalOpts) {
    if !global.quiet {
        eprintln!("{message}");
    }
}
