// ── TTL-bound status cache ──
//
// Holds the current fleet snapshot. Readers load it lock-free through
// `ArcSwapOption`; every replacement (refresh, forced set, command
// mutation) is serialized by a single async mutex so that concurrent
// expired readers share one source call and events go out in the same
// order the snapshots were published.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::history::History;
use crate::error::CoreError;
use crate::model::{ChangeEvent, SYSTEM_ACTOR, Server, Snapshot};
use crate::source::StatusSource;
use crate::stream::ChangeNotifier;

/// Outcome of a closure passed to [`StatusCache::update`].
#[derive(Debug)]
pub struct Mutation<R> {
    value: R,
    events: Vec<ChangeEvent>,
    replace: bool,
}

impl<R> Mutation<R> {
    /// Nothing changed; the snapshot is left as is.
    pub fn unchanged(value: R) -> Self {
        Self {
            value,
            events: Vec::new(),
            replace: false,
        }
    }

    /// Publish the edited servers, then `events` in order.
    pub fn changed(value: R, events: Vec<ChangeEvent>) -> Self {
        Self {
            value,
            events,
            replace: true,
        }
    }
}

struct Published {
    snapshot: Arc<Snapshot>,
    /// Monotonic time of the last replacement or refresh attempt; drives
    /// TTL expiry.
    checked_at: Instant,
    /// Wall-clock time of the last replacement.
    refreshed_at: DateTime<Utc>,
}

#[derive(Default)]
struct WriteState {
    generation: u64,
    history: History,
}

/// Memoized fleet snapshot with time-to-live refresh.
pub struct StatusCache {
    source: Arc<dyn StatusSource>,
    notifier: ChangeNotifier,
    ttl: Duration,
    current: ArcSwapOption<Published>,
    write: Mutex<WriteState>,
}

impl StatusCache {
    pub fn new(source: Arc<dyn StatusSource>, notifier: ChangeNotifier, ttl: Duration) -> Self {
        Self {
            source,
            notifier,
            ttl,
            current: ArcSwapOption::empty(),
            write: Mutex::new(WriteState::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub async fn get(&self) -> Result<Arc<Snapshot>, CoreError> {
        self.get_at(Instant::now()).await
    }

    /// Current snapshot, refreshing first if it is missing or older than
    /// the TTL at `now`.
    pub async fn get_at(&self, now: Instant) -> Result<Arc<Snapshot>, CoreError> {
        if let Some(snapshot) = self.fresh(now) {
            debug!(generation = snapshot.generation, "status cache hit");
            return Ok(snapshot);
        }

        let mut state = self.write.lock().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(snapshot) = self.fresh(now) {
            return Ok(snapshot);
        }
        match self.refresh_locked(&mut state, now).await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => self.peek().ok_or_else(|| CoreError::Unavailable {
                reason: e.to_string(),
            }),
        }
    }

    /// Current snapshot without triggering a refresh.
    pub fn peek(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full().map(|p| Arc::clone(&p.snapshot))
    }

    /// Wall-clock time of the last replacement.
    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.current.load().as_ref().map(|p| p.refreshed_at)
    }

    fn fresh(&self, now: Instant) -> Option<Arc<Snapshot>> {
        let published = self.current.load_full()?;
        (now.saturating_duration_since(published.checked_at) <= self.ttl)
            .then(|| Arc::clone(&published.snapshot))
    }

    // ── Writes ───────────────────────────────────────────────────────

    pub async fn refresh(&self) -> Result<Arc<Snapshot>, CoreError> {
        self.refresh_at(Instant::now()).await
    }

    /// Pull a new snapshot from the source regardless of age.
    ///
    /// On failure the previous snapshot stays published and the source
    /// error is returned.
    pub async fn refresh_at(&self, now: Instant) -> Result<Arc<Snapshot>, CoreError> {
        let mut state = self.write.lock().await;
        self.refresh_locked(&mut state, now).await
    }

    /// Replace the snapshot without consulting the source. Transitions
    /// are attributed to `actor`.
    pub async fn force_set(
        &self,
        servers: Vec<Server>,
        now: Instant,
        actor: &str,
    ) -> Result<Arc<Snapshot>, CoreError> {
        check_unique_names(&servers)?;
        let mut state = self.write.lock().await;
        Ok(self.replace_locked(&mut state, servers, now, actor))
    }

    /// Read-modify-replace under the write lock.
    ///
    /// `f` edits a copy of the current servers. If it reports a change the
    /// copy is published as the next generation, the history is updated
    /// and the mutation's events are sent in order before the lock is
    /// released. An error from `f` leaves the cache untouched.
    pub async fn update<R, F>(&self, now: Instant, f: F) -> Result<R, CoreError>
    where
        F: FnOnce(&mut Vec<Server>) -> Result<Mutation<R>, CoreError>,
    {
        let mut state = self.write.lock().await;
        let current = match self.fresh(now) {
            Some(snapshot) => snapshot,
            None => match self.refresh_locked(&mut state, now).await {
                Ok(snapshot) => snapshot,
                Err(e) => self.peek().ok_or_else(|| CoreError::Unavailable {
                    reason: e.to_string(),
                })?,
            },
        };

        let mut servers = current.servers().to_vec();
        let mutation = f(&mut servers)?;
        if !mutation.replace {
            return Ok(mutation.value);
        }

        check_unique_names(&servers)?;
        state.history.record(&servers);
        let snapshot = self.install(&mut state, servers, now);
        debug!(
            generation = snapshot.generation,
            events = mutation.events.len(),
            "applied cache mutation"
        );
        for event in mutation.events {
            self.notifier.publish(event);
        }
        Ok(mutation.value)
    }

    async fn refresh_locked(
        &self,
        state: &mut WriteState,
        now: Instant,
    ) -> Result<Arc<Snapshot>, CoreError> {
        let produced = self
            .source
            .produce()
            .await
            .and_then(|servers| check_unique_names(&servers).map(|()| servers));

        match produced {
            Ok(servers) => Ok(self.replace_locked(state, servers, now, SYSTEM_ACTOR)),
            Err(e) => {
                warn!(source = self.source.name(), error = %e, "status refresh failed");
                // Keep serving the last good snapshot, but wait a full TTL
                // before asking the source again.
                if let Some(previous) = self.current.load_full() {
                    self.current.store(Some(Arc::new(Published {
                        snapshot: Arc::clone(&previous.snapshot),
                        checked_at: now,
                        refreshed_at: previous.refreshed_at,
                    })));
                }
                Err(e)
            }
        }
    }

    fn replace_locked(
        &self,
        state: &mut WriteState,
        servers: Vec<Server>,
        now: Instant,
        actor: &str,
    ) -> Arc<Snapshot> {
        let at = Utc::now();
        let events = state.history.diff(&servers, actor, at);
        state.history.record(&servers);
        let snapshot = self.install(state, servers, now);

        debug!(
            source = self.source.name(),
            generation = snapshot.generation,
            servers = snapshot.len(),
            transitions = events.len(),
            "status snapshot replaced"
        );
        for event in events {
            self.notifier.publish(event);
        }
        self.notifier.publish(ChangeEvent::FleetRefreshed {
            generation: snapshot.generation,
            servers: snapshot.len(),
            at,
        });
        snapshot
    }

    fn install(&self, state: &mut WriteState, servers: Vec<Server>, now: Instant) -> Arc<Snapshot> {
        state.generation += 1;
        let snapshot = Arc::new(Snapshot::new(state.generation, servers));
        self.current.store(Some(Arc::new(Published {
            snapshot: Arc::clone(&snapshot),
            checked_at: now,
            refreshed_at: snapshot.taken_at,
        })));
        snapshot
    }
}

fn check_unique_names(servers: &[Server]) -> Result<(), CoreError> {
    let mut seen = HashSet::with_capacity(servers.len());
    for server in servers {
        if !seen.insert(server.name.as_str()) {
            return Err(CoreError::ValidationFailed {
                message: format!("server {} appears twice in snapshot", server.name),
            });
        }
    }
    Ok(())
}
