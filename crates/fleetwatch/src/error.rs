//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use fleetwatch_config::ConfigError;
use fleetwatch_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const UNAVAILABLE: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(fleetwatch::not_found),
        help("Run: fleetwatch {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Source ───────────────────────────────────────────────────────
    #[error("Fleet status unavailable: {reason}")]
    #[diagnostic(
        code(fleetwatch::unavailable),
        help(
            "The status source could not produce a fleet snapshot.\n\
             For the live source, check remote.program and that the machines are reachable.\n\
             Try: fleetwatch --source simulated servers list"
        )
    )]
    Unavailable { reason: String },

    #[error("Remote operation failed on {address}: {message}")]
    #[diagnostic(code(fleetwatch::operation_failed))]
    OperationFailed { address: String, message: String },

    #[error("Remote command timed out after {seconds}s on {address}")]
    #[diagnostic(
        code(fleetwatch::timeout),
        help("Increase remote.timeout_secs or check that {address} is responsive.")
    )]
    Timeout { address: String, seconds: u64 },

    #[error("Could not read inventory {path}: {reason}")]
    #[diagnostic(
        code(fleetwatch::seed),
        help("The inventory is a JSON array of servers with name, ip, and services.")
    )]
    Seed { path: String, reason: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fleetwatch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(fleetwatch::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(fleetwatch::config))]
    Config(Box<figment::Error>),

    #[error("Keyring error: {0}")]
    #[diagnostic(
        code(fleetwatch::keyring),
        help("Set remote.password_env to read the password from an environment variable instead.")
    )]
    Keyring(String),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(fleetwatch::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    #[diagnostic(code(fleetwatch::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Unavailable { .. } => exit_code::UNAVAILABLE,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::ConfigExists { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ServerNotFound { name } => CliError::NotFound {
                resource_type: "server".into(),
                identifier: name,
                list_command: "servers list".into(),
            },

            CoreError::ServiceNotFound { server, service } => CliError::NotFound {
                resource_type: "service".into(),
                identifier: service,
                list_command: format!("services list {server}"),
            },

            CoreError::InvalidCommand { message } => CliError::Validation {
                field: "command".into(),
                reason: message,
            },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::OperationFailed { address, message } => {
                CliError::OperationFailed { address, message }
            }

            CoreError::Timeout {
                address,
                timeout_secs,
            } => CliError::Timeout {
                address,
                seconds: timeout_secs,
            },

            CoreError::SourceUnavailable { reason } | CoreError::Unavailable { reason } => {
                CliError::Unavailable { reason }
            }

            CoreError::Seed { path, reason } => CliError::Seed { path, reason },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Serialization(e) => CliError::Serialization(e),
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Keyring(message) => CliError::Keyring(message),
            ConfigError::Core(e) => e.into(),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
