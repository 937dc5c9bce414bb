//! Clap derive structures for the `fleetwatch` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.
//! Only depends on clap + clap_complete so `build.rs` can include it.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fleetwatch -- status cache and service control for a server fleet
#[derive(Debug, Parser)]
#[command(
    name = "fleetwatch",
    version,
    about = "Monitor and operate a Windows server fleet from the command line",
    long_about = "Inspect server and service status, start/stop/restart services,\n\
        and reboot machines across a fleet.\n\n\
        Status comes from a simulated fleet by default, or from real machines\n\
        via PowerShell remoting with `--source live`.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "FLEETWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Server inventory JSON (overrides source.seed_file)
    #[arg(long, global = true)]
    pub seed_file: Option<PathBuf>,

    /// Status source (overrides source.kind)
    #[arg(long, global = true)]
    pub source: Option<SourceArg>,

    /// Fixed RNG seed for reproducible simulation
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FLEETWATCH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Name recorded as the actor of state changes
    #[arg(long, env = "FLEETWATCH_ACTOR", default_value = "cli", global = true)]
    pub actor: String,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SourceArg {
    /// Randomised statuses over the built-in or seeded inventory
    Simulated,
    /// Query machines through the configured remote program
    Live,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Online,
    Warning,
    Offline,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List and inspect servers
    #[command(alias = "srv", alias = "s")]
    Servers(ServersArgs),

    /// Start, stop, restart, and list services
    #[command(alias = "svc")]
    Services(ServicesArgs),

    /// Reboot a server
    Reboot(RebootArgs),

    /// Fleet-wide status counts and resource averages
    Stats,

    /// Stream change events as they happen
    Watch(WatchArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Servers ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ServersArgs {
    #[command(subcommand)]
    pub command: ServersCommand,
}

#[derive(Debug, Subcommand)]
pub enum ServersCommand {
    /// List servers
    #[command(alias = "ls")]
    List {
        /// Case-insensitive match on name, IP, type, or location
        #[arg(long, short = 's')]
        search: Option<String>,

        /// Only servers with at least one service in this state
        #[arg(long)]
        status: Option<StatusArg>,
    },

    /// Show one server and its services
    Get {
        /// Server name
        name: String,
    },

    /// Write the current fleet as an inventory JSON file
    Export {
        /// Destination path
        path: PathBuf,
    },
}

// ── Services ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ServicesArgs {
    #[command(subcommand)]
    pub command: ServicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ServicesCommand {
    /// List the services of a server
    #[command(alias = "ls")]
    List {
        /// Server name
        server: String,
    },

    /// Start a service
    Start(ServiceTarget),

    /// Stop a service
    Stop(ServiceTarget),

    /// Restart a service
    Restart(ServiceTarget),
}

#[derive(Debug, Args)]
pub struct ServiceTarget {
    /// Server name
    pub server: String,

    /// Service name
    pub service: String,
}

// ── Reboot ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RebootArgs {
    /// Server name
    pub server: String,

    /// Return once the reboot is scheduled instead of waiting for it
    #[arg(long)]
    pub no_wait: bool,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Only events concerning this server
    #[arg(long, short = 's')]
    pub server: Option<String>,

    /// Exit after this many events
    #[arg(long, short = 'n')]
    pub count: Option<usize>,

    /// Refresh interval in seconds (overrides cache.refresh_interval_secs)
    #[arg(long)]
    pub interval: Option<u64>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display current resolved configuration
    Show,

    /// Print the config file location
    Path,

    /// Store the remote password in the system keyring
    SetPassword,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
