// ── Change events ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::Status;

/// Actor recorded for transitions observed by a refresh rather than
/// caused by an operator.
pub const SYSTEM_ACTOR: &str = "system";

/// A state change or lifecycle milestone, fanned out to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// Audit record from the (external) login layer.
    LoginAttempt {
        user: String,
        success: bool,
        at: DateTime<Utc>,
    },
    ServiceStatusChanged {
        server: String,
        service: String,
        old: Status,
        new: Status,
        actor: String,
        at: DateTime<Utc>,
    },
    ServerRebootStarted {
        server: String,
        actor: String,
        at: DateTime<Utc>,
    },
    ServerRebootCompleted {
        server: String,
        actor: String,
        at: DateTime<Utc>,
    },
    /// A refresh replaced the whole snapshot.
    FleetRefreshed {
        generation: u64,
        servers: usize,
        at: DateTime<Utc>,
    },
}

impl ChangeEvent {
    /// Server this event concerns, if any.
    pub fn server(&self) -> Option<&str> {
        match self {
            Self::ServiceStatusChanged { server, .. }
            | Self::ServerRebootStarted { server, .. }
            | Self::ServerRebootCompleted { server, .. } => Some(server),
            Self::LoginAttempt { .. } | Self::FleetRefreshed { .. } => None,
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::LoginAttempt { at, .. }
            | Self::ServiceStatusChanged { at, .. }
            | Self::ServerRebootStarted { at, .. }
            | Self::ServerRebootCompleted { at, .. }
            | Self::FleetRefreshed { at, .. } => *at,
        }
    }

    /// Short machine-readable name, matching the serialized `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LoginAttempt { .. } => "login_attempt",
            Self::ServiceStatusChanged { .. } => "service_status_changed",
            Self::ServerRebootStarted { .. } => "server_reboot_started",
            Self::ServerRebootCompleted { .. } => "server_reboot_completed",
            Self::FleetRefreshed { .. } => "fleet_refreshed",
        }
    }
}
