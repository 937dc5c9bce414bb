//! Configuration for the fleetwatch tools.
//!
//! TOML file plus `FLEETWATCH_*` environment overrides, remote credential
//! resolution (env + keyring + plaintext), and translation to
//! `fleetwatch_core::FleetConfig` and a ready-to-use status source.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use fleetwatch_core::remote::{POWERSHELL_PROGRAM, powershell_args};
use fleetwatch_core::source::default_inventory;
use fleetwatch_core::source::seed::load_seed;
use fleetwatch_core::{
    CoreError, FleetConfig, LiveSource, ProcessExecutor, RebootPolicy, SimulatedSource,
    StatusSource, StatusWeights,
};

/// Prefix of environment overrides; nested keys are separated by `__`
/// (`FLEETWATCH_CACHE__TTL_SECS=10`).
pub const ENV_PREFIX: &str = "FLEETWATCH_";

/// Exported to the remote program when a username is configured.
pub const REMOTE_USER_ENV: &str = "FLEETWATCH_REMOTE_USER";
/// Exported to the remote program when a password resolves.
pub const REMOTE_PASSWORD_ENV: &str = "FLEETWATCH_REMOTE_PASSWORD";

const KEYRING_SERVICE: &str = "fleetwatch";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub simulation: SimulationSection,

    #[serde(default)]
    pub reboot: RebootSection,

    #[serde(default)]
    pub source: SourceSection,

    #[serde(default)]
    pub remote: RemoteSection,
}

/// Output preferences for the CLI.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CacheSection {
    /// Snapshot lifetime before a read triggers a refresh.
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,

    /// Background refresh cadence; 0 disables the poller.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Per-subscriber event backlog.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            refresh_interval_secs: default_refresh_interval(),
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_ttl() -> u64 {
    60
}
fn default_refresh_interval() -> u64 {
    30
}
fn default_event_capacity() -> usize {
    256
}

/// Weights of the simulated source's status draw.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulationSection {
    #[serde(default = "default_sim_online")]
    pub online_weight: f64,

    #[serde(default = "default_sim_warning")]
    pub warning_weight: f64,

    #[serde(default = "default_sim_offline")]
    pub offline_weight: f64,

    /// Fixed RNG seed for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            online_weight: default_sim_online(),
            warning_weight: default_sim_warning(),
            offline_weight: default_sim_offline(),
            seed: None,
        }
    }
}

fn default_sim_online() -> f64 {
    0.8
}
fn default_sim_warning() -> f64 {
    0.15
}
fn default_sim_offline() -> f64 {
    0.05
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RebootSection {
    #[serde(default = "default_reboot_delay")]
    pub delay_secs: u64,

    #[serde(default = "default_reboot_online")]
    pub online_weight: f64,

    #[serde(default = "default_reboot_warning")]
    pub warning_weight: f64,
}

impl Default for RebootSection {
    fn default() -> Self {
        Self {
            delay_secs: default_reboot_delay(),
            online_weight: default_reboot_online(),
            warning_weight: default_reboot_warning(),
        }
    }
}

fn default_reboot_delay() -> u64 {
    5
}
fn default_reboot_online() -> f64 {
    0.9
}
fn default_reboot_warning() -> f64 {
    0.1
}

/// Which status source backs the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Simulated,
    Live,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SourceSection {
    #[serde(default)]
    pub kind: SourceKind,

    /// JSON server inventory. Required for the live source.
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
}

/// How the live source reaches machines.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RemoteSection {
    #[serde(default = "default_remote_program")]
    pub program: String,

    /// Arguments; `{address}` and `{command}` are substituted per call.
    #[serde(default = "powershell_args")]
    pub args: Vec<String>,

    #[serde(default = "default_remote_timeout")]
    pub timeout_secs: u64,

    pub username: Option<String>,

    /// Environment variable holding the remote password.
    pub password_env: Option<String>,

    /// Plaintext password (prefer keyring or env var).
    pub password: Option<String>,
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            program: default_remote_program(),
            args: powershell_args(),
            timeout_secs: default_remote_timeout(),
            username: None,
            password_env: None,
            password: None,
        }
    }
}

fn default_remote_program() -> String {
    POWERSHELL_PROGRAM.into()
}
fn default_remote_timeout() -> u64 {
    30
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "fleetwatch", "fleetwatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("fleetwatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` + environment. A missing file is not an
/// error; defaults apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), source = ?config.source.kind, "configuration loaded");
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

/// Serialize config to TOML and write it to `path`, creating parents.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation to core types ───────────────────────────────────────

impl Config {
    /// Engine configuration, validated.
    pub fn fleet_config(&self) -> Result<FleetConfig, ConfigError> {
        let fleet = FleetConfig {
            cache_ttl: Duration::from_secs(self.cache.ttl_secs),
            refresh_interval: Duration::from_secs(self.cache.refresh_interval_secs),
            reboot: RebootPolicy {
                delay: Duration::from_secs(self.reboot.delay_secs),
                online_weight: self.reboot.online_weight,
                warning_weight: self.reboot.warning_weight,
            },
            simulation: StatusWeights::new(
                self.simulation.online_weight,
                self.simulation.warning_weight,
                self.simulation.offline_weight,
            ),
            remote_timeout: Duration::from_secs(self.remote.timeout_secs),
            event_capacity: self.cache.event_capacity,
            rng_seed: self.simulation.seed,
        };
        fleet.validate().map_err(|e| ConfigError::Validation {
            field: "fleet".into(),
            reason: e.to_string(),
        })?;
        Ok(fleet)
    }
}

/// Build the status source the config selects.
pub fn build_source(cfg: &Config) -> Result<Arc<dyn StatusSource>, ConfigError> {
    let fleet = cfg.fleet_config()?;
    match cfg.source.kind {
        SourceKind::Simulated => {
            let inventory = match &cfg.source.seed_file {
                Some(path) => load_seed(path)?.iter().map(|s| s.template()).collect(),
                None => default_inventory(),
            };
            Ok(Arc::new(SimulatedSource::new(
                inventory,
                fleet.simulation,
                fleet.rng_seed,
            )?))
        }
        SourceKind::Live => {
            let path = cfg
                .source
                .seed_file
                .as_ref()
                .ok_or_else(|| ConfigError::Validation {
                    field: "source.seed_file".into(),
                    reason: "the live source needs a server inventory".into(),
                })?;
            let inventory = load_seed(path)?;
            let executor = build_executor(&cfg.remote);
            Ok(Arc::new(LiveSource::new(
                inventory,
                Arc::new(executor),
                fleet.remote_timeout,
            )))
        }
    }
}

fn build_executor(remote: &RemoteSection) -> ProcessExecutor {
    let mut executor = ProcessExecutor::new(remote.program.clone(), remote.args.clone());
    if let Some(ref user) = remote.username {
        executor = executor.with_env(REMOTE_USER_ENV, SecretString::from(user.clone()));
    }
    if let Some(password) = resolve_remote_password(remote) {
        executor = executor.with_env(REMOTE_PASSWORD_ENV, password);
    }
    executor
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_account(remote: &RemoteSection) -> String {
    format!(
        "remote/{}",
        remote.username.as_deref().unwrap_or("default")
    )
}

/// Resolve the remote password: env var, then keyring, then plaintext.
/// `None` means the remote program authenticates on its own.
pub fn resolve_remote_password(remote: &RemoteSection) -> Option<SecretString> {
    // 1. Configured env var
    if let Some(ref env_name) = remote.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_account(remote)) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    remote
        .password
        .as_ref()
        .map(|pw| SecretString::from(pw.clone()))
}

/// Store the remote password in the system keyring.
pub fn store_remote_password(
    remote: &RemoteSection,
    password: &SecretString,
) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &keyring_account(remote))
        .and_then(|entry| entry.set_password(password.expose_secret()))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}
