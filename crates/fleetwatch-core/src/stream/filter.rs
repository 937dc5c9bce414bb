// ── Filter predicates ──
//
// Applied to snapshots and event streams without touching the source.

use crate::model::{ChangeEvent, Server, Status};

/// Server list filter: free-text search combined with a status match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerFilter {
    /// Case-insensitive substring of name, address or location.
    pub search: Option<String>,
    /// Keep servers with at least one service in this status.
    pub status: Option<Status>,
}

impl ServerFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        self.search = (!term.trim().is_empty()).then_some(term);
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, server: &Server) -> bool {
        let search_ok = self.search.as_deref().is_none_or(|term| {
            let term = term.to_lowercase();
            [&server.name, &server.ip, &server.location]
                .iter()
                .any(|field| field.to_lowercase().contains(&term))
        });
        let status_ok = self.status.is_none_or(|s| server.has_status(s));
        search_ok && status_ok
    }

    /// Matching servers, in snapshot order.
    pub fn apply<'a>(&self, servers: &'a [Server]) -> Vec<&'a Server> {
        servers.iter().filter(|s| self.matches(s)).collect()
    }
}

/// Event subscription predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFilter {
    All,
    /// Events naming this server. Fleet-wide events are excluded.
    Server(String),
}

impl EventFilter {
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        match self {
            Self::All => true,
            Self::Server(name) => event.server() == Some(name.as_str()),
        }
    }
}
