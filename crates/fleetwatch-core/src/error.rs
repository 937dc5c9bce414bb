// ── Core error types ──
//
// User-facing errors from fleetwatch-core. Remote transport failures are
// folded into `OperationFailed` / `Timeout`; consumers never see raw
// process or JSON errors.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Lookup errors ────────────────────────────────────────────────
    #[error("Server not found: {name}")]
    ServerNotFound { name: String },

    #[error("Service '{service}' not found on server {server}")]
    ServiceNotFound { server: String, service: String },

    // ── Command errors ───────────────────────────────────────────────
    #[error("Invalid command: {message}")]
    InvalidCommand { message: String },

    #[error("Remote operation failed on {address}: {message}")]
    OperationFailed { address: String, message: String },

    #[error("Remote command timed out after {timeout_secs}s on {address}")]
    Timeout { address: String, timeout_secs: u64 },

    // ── Source / cache errors ────────────────────────────────────────
    #[error("Status source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    /// No refresh has ever succeeded, so there is nothing to serve.
    #[error("Fleet status unavailable: {reason}")]
    Unavailable { reason: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Seed inventory error ({path}): {reason}")]
    Seed { path: String, reason: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` for the server/service lookup failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ServerNotFound { .. } | Self::ServiceNotFound { .. }
        )
    }

    pub(crate) fn server_not_found(name: &str) -> Self {
        Self::ServerNotFound { name: name.into() }
    }

    pub(crate) fn service_not_found(server: &str, service: &str) -> Self {
        Self::ServiceNotFound {
            server: server.into(),
            service: service.into(),
        }
    }
}
