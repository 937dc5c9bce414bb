// ── Status sources ──
//
// A `StatusSource` produces a complete, fresh list of servers on demand
// and optionally carries out operator actions against real machines.
// The cache is the only caller of `produce`; the command engine is the
// only caller of `perform`.

mod catalog;
mod live;
pub mod seed;
mod simulated;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::Server;
use crate::remote::RemoteCommand;

pub use catalog::{ServerTemplate, default_inventory};
pub use live::LiveSource;
pub use simulated::SimulatedSource;

/// An operator action forwarded to the source before the cache is mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceAction {
    Start(String),
    Stop(String),
    Restart(String),
    Reboot,
}

impl From<&ServiceAction> for RemoteCommand {
    fn from(action: &ServiceAction) -> Self {
        match action {
            ServiceAction::Start(name) => Self::StartService(name.clone()),
            ServiceAction::Stop(name) => Self::StopService(name.clone()),
            ServiceAction::Restart(name) => Self::RestartService(name.clone()),
            ServiceAction::Reboot => Self::Reboot,
        }
    }
}

/// Capability that produces fleet state.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Produce a full list of servers.
    ///
    /// A failure to reach an individual machine is reported as a degraded
    /// server, not as an error. `Err` means the source as a whole could
    /// not produce anything.
    async fn produce(&self) -> Result<Vec<Server>, CoreError>;

    /// Carry out an operator action. Sources without a side channel to
    /// real machines accept every action.
    async fn perform(&self, _server: &Server, _action: &ServiceAction) -> Result<(), CoreError> {
        Ok(())
    }
}
