// ── Fleet domain model ──
//
// Canonical types shared by the sources, the cache, the command engine
// and every consumer.

pub mod event;
pub mod server;
pub mod snapshot;
pub mod status;

pub use event::{ChangeEvent, SYSTEM_ACTOR};
pub use server::{HardwareSpecs, Server, ServerKind, Service, UNKNOWN_SERVICE};
pub use snapshot::Snapshot;
pub use status::{Status, StatusDistribution, StatusWeights};
