// ── Command API ──
//
// All operator write operations flow through the `Command` enum and are
// applied by the `CommandEngine`.

mod engine;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::CoreError;
use crate::model::Status;

pub use engine::CommandEngine;

/// An operator write against the fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartService { server: String, service: String },
    StopService { server: String, service: String },
    /// Always lands online, even if the service already was.
    RestartService { server: String, service: String },
    /// All services go offline now and come back after a delay.
    RebootServer { server: String },
}

impl Command {
    pub fn server(&self) -> &str {
        match self {
            Self::StartService { server, .. }
            | Self::StopService { server, .. }
            | Self::RestartService { server, .. }
            | Self::RebootServer { server } => server,
        }
    }

    pub fn service(&self) -> Option<&str> {
        match self {
            Self::StartService { service, .. }
            | Self::StopService { service, .. }
            | Self::RestartService { service, .. } => Some(service),
            Self::RebootServer { .. } => None,
        }
    }

    /// Lowercase verb for logs and output.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::StartService { .. } => "start",
            Self::StopService { .. } => "stop",
            Self::RestartService { .. } => "restart",
            Self::RebootServer { .. } => "reboot",
        }
    }

    /// Reject blank identifiers before anything is looked up.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.server().trim().is_empty() {
            return Err(CoreError::InvalidCommand {
                message: format!("{}: server name is empty", self.verb()),
            });
        }
        if self.service().is_some_and(|s| s.trim().is_empty()) {
            return Err(CoreError::InvalidCommand {
                message: format!("{}: service name is empty", self.verb()),
            });
        }
        Ok(())
    }
}

/// Outcome of a successfully applied command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandResult {
    Changed {
        server: String,
        service: String,
        old: Status,
        new: Status,
    },
    /// The service already was in the requested state.
    Unchanged {
        server: String,
        service: String,
        status: Status,
    },
    RebootScheduled {
        server: String,
        completes_at: DateTime<Utc>,
    },
}
