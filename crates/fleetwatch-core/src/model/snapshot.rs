// ── Published fleet snapshot ──

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::server::Server;

/// The complete fleet at one point in time.
///
/// Snapshots are immutable once published. The cache hands them out as
/// `Arc<Snapshot>`; a refresh or command swaps in a new one wholesale.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Monotonic per-cache counter, bumped on every replacement.
    pub generation: u64,
    pub taken_at: DateTime<Utc>,
    servers: Vec<Server>,
}

impl Snapshot {
    pub(crate) fn new(generation: u64, servers: Vec<Server>) -> Self {
        Self {
            generation,
            taken_at: Utc::now(),
            servers,
        }
    }

    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    pub fn server(&self, name: &str) -> Option<&Server> {
        self.servers.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn service_count(&self) -> usize {
        self.servers.iter().map(|s| s.services().len()).sum()
    }
}
