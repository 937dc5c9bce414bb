// ── Controller facade ──
//
// Owns the cache, command engine and notifier for one fleet, plus the
// background refresh task. Consumers read and write exclusively
// through this type.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandEngine, CommandResult};
use crate::config::FleetConfig;
use crate::error::CoreError;
use crate::model::{ChangeEvent, Server, Snapshot};
use crate::source::{SimulatedSource, StatusSource, default_inventory};
use crate::stats::FleetStats;
use crate::store::StatusCache;
use crate::stream::{ChangeNotifier, EventStream, ServerFilter};

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Reads go through the
/// TTL cache, writes through the command engine; both are safe to call
/// concurrently from any number of tasks.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: FleetConfig,
    cache: Arc<StatusCache>,
    engine: CommandEngine,
    notifier: ChangeNotifier,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Build a controller over `source`. Does not touch the source until
    /// [`start()`](Self::start) or the first read.
    pub fn new(config: FleetConfig, source: Arc<dyn StatusSource>) -> Result<Self, CoreError> {
        config.validate()?;
        let notifier = ChangeNotifier::new(config.event_capacity);
        let cache = Arc::new(StatusCache::new(
            Arc::clone(&source),
            notifier.clone(),
            config.cache_ttl,
        ));
        let engine = CommandEngine::new(
            Arc::clone(&cache),
            source,
            config.reboot,
            config.rng_seed.map(|seed| seed.wrapping_add(1)),
        )?;

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                cache,
                engine,
                notifier,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Controller over the built-in simulated fleet.
    pub fn simulated(config: FleetConfig) -> Result<Self, CoreError> {
        let source = SimulatedSource::new(default_inventory(), config.simulation, config.rng_seed)?;
        Self::new(config, Arc::new(source))
    }

    pub fn config(&self) -> &FleetConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &Arc<StatusCache> {
        &self.inner.cache
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Load the first snapshot and spawn the periodic refresh task.
    pub async fn start(&self) -> Result<(), CoreError> {
        let snapshot = self.inner.cache.get().await?;
        info!(
            source = self.inner.cache.source_name(),
            servers = snapshot.len(),
            "fleet controller started"
        );

        let period = self.inner.config.refresh_interval;
        if !period.is_zero() {
            let mut handles = self.inner.task_handles.lock().await;
            if !handles.is_empty() {
                debug!("refresh task already running");
                return Ok(());
            }
            let cache = Arc::clone(&self.inner.cache);
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(refresh_task(cache, period, cancel)));
        }
        Ok(())
    }

    /// Stop the refresh task and wait for pending reboot completions.
    pub async fn shutdown(&self) {
        self.stop_tasks().await;
        self.inner.engine.drain().await;
        debug!("fleet controller stopped");
    }

    /// Like [`shutdown()`](Self::shutdown) but pending reboot
    /// completions are dropped instead of awaited.
    pub async fn abort(&self) {
        self.stop_tasks().await;
        self.inner.engine.abort().await;
        debug!("fleet controller aborted");
    }

    async fn stop_tasks(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
    }

    /// One-shot: start without a poller, run closure, shut down.
    pub async fn oneshot<F, Fut, T>(
        config: FleetConfig,
        source: Arc<dyn StatusSource>,
        f: F,
    ) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.refresh_interval = Duration::ZERO;

        let controller = Controller::new(cfg, source)?;
        controller.start().await?;
        let result = f(controller.clone()).await;
        controller.shutdown().await;
        result
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub async fn snapshot(&self) -> Result<Arc<Snapshot>, CoreError> {
        self.inner.cache.get().await
    }

    /// Refresh from the source now, regardless of cache age.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, CoreError> {
        self.inner.cache.refresh().await
    }

    pub async fn list_servers(&self, filter: &ServerFilter) -> Result<Vec<Server>, CoreError> {
        let snapshot = self.snapshot().await?;
        Ok(filter
            .apply(snapshot.servers())
            .into_iter()
            .cloned()
            .collect())
    }

    pub async fn get_server(&self, name: &str) -> Result<Server, CoreError> {
        self.snapshot()
            .await?
            .server(name)
            .cloned()
            .ok_or_else(|| CoreError::server_not_found(name))
    }

    pub async fn stats(&self) -> Result<FleetStats, CoreError> {
        let snapshot = self.snapshot().await?;
        Ok(FleetStats::compute(&snapshot, Utc::now()))
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub async fn execute(&self, cmd: Command, actor: &str) -> Result<CommandResult, CoreError> {
        self.inner.engine.execute(cmd, actor).await
    }

    pub async fn start_service(
        &self,
        server: &str,
        service: &str,
        actor: &str,
    ) -> Result<CommandResult, CoreError> {
        self.execute(
            Command::StartService {
                server: server.into(),
                service: service.into(),
            },
            actor,
        )
        .await
    }

    pub async fn stop_service(
        &self,
        server: &str,
        service: &str,
        actor: &str,
    ) -> Result<CommandResult, CoreError> {
        self.execute(
            Command::StopService {
                server: server.into(),
                service: service.into(),
            },
            actor,
        )
        .await
    }

    pub async fn restart_service(
        &self,
        server: &str,
        service: &str,
        actor: &str,
    ) -> Result<CommandResult, CoreError> {
        self.execute(
            Command::RestartService {
                server: server.into(),
                service: service.into(),
            },
            actor,
        )
        .await
    }

    pub async fn reboot_server(&self, server: &str, actor: &str) -> Result<CommandResult, CoreError> {
        self.execute(
            Command::RebootServer {
                server: server.into(),
            },
            actor,
        )
        .await
    }

    pub fn pending_reboots(&self) -> usize {
        self.inner.engine.pending_reboots()
    }

    // ── Events ───────────────────────────────────────────────────────

    pub fn events(&self) -> EventStream {
        self.inner.notifier.subscribe()
    }

    pub fn server_events(&self, name: &str) -> EventStream {
        self.inner.notifier.subscribe_server(name)
    }

    /// Publish a login audit record from the authentication layer.
    pub fn record_login(&self, user: &str, success: bool) {
        self.inner.notifier.publish(ChangeEvent::LoginAttempt {
            user: user.into(),
            success,
            at: Utc::now(),
        });
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Periodically refresh the cache from its source.
async fn refresh_task(cache: Arc<StatusCache>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = cache.refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}
