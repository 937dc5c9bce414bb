// fleetwatch-core: Status cache and service-state engine for a server fleet.

pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod remote;
pub mod source;
pub mod stats;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandEngine, CommandResult};
pub use config::{FleetConfig, RebootPolicy};
pub use controller::Controller;
pub use error::CoreError;
pub use remote::{ProcessExecutor, RemoteCommand, RemoteExecutor, RemoteOutput};
pub use source::{LiveSource, ServiceAction, SimulatedSource, StatusSource};
pub use stats::FleetStats;
pub use store::{Mutation, StatusCache};
pub use stream::{ChangeNotifier, EventFilter, EventStream, ServerFilter};

pub use model::{
    ChangeEvent, HardwareSpecs, SYSTEM_ACTOR, Server, ServerKind, Service, Snapshot, Status,
    StatusDistribution, StatusWeights, UNKNOWN_SERVICE,
};
