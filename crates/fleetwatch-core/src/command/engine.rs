// ── Command engine ──
//
// Validates operator commands, forwards them to the status source, and
// applies the resulting state to the cache. Reboots run in two phases:
// every service goes offline at once, and a tracked background task
// brings them back after the configured delay.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{TimeDelta, Utc};
use dashmap::DashMap;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::{Command, CommandResult};
use crate::config::RebootPolicy;
use crate::error::CoreError;
use crate::model::{ChangeEvent, Server, Service, Status, StatusDistribution};
use crate::source::{ServiceAction, StatusSource};
use crate::store::{Mutation, StatusCache};

/// Applies commands to the cache. Cheaply cloneable.
#[derive(Clone)]
pub struct CommandEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    cache: Arc<StatusCache>,
    source: Arc<dyn StatusSource>,
    policy: RebootPolicy,
    completion: StatusDistribution,
    rng: Mutex<StdRng>,
    /// Latest reboot ticket per server. A completion only applies while
    /// its ticket is still the current one.
    reboots: DashMap<String, u64>,
    next_ticket: AtomicU64,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl CommandEngine {
    pub fn new(
        cache: Arc<StatusCache>,
        source: Arc<dyn StatusSource>,
        policy: RebootPolicy,
        seed: Option<u64>,
    ) -> Result<Self, CoreError> {
        let completion = policy.distribution()?;
        let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Ok(Self {
            inner: Arc::new(EngineInner {
                cache,
                source,
                policy,
                completion,
                rng: Mutex::new(rng),
                reboots: DashMap::new(),
                next_ticket: AtomicU64::new(0),
                tracker: TaskTracker::new(),
                cancel: CancellationToken::new(),
            }),
        })
    }

    /// Validate and apply `cmd`, attributing changes to `actor`.
    pub async fn execute(&self, cmd: Command, actor: &str) -> Result<CommandResult, CoreError> {
        cmd.validate()?;
        info!(
            verb = cmd.verb(),
            server = cmd.server(),
            service = ?cmd.service(),
            actor,
            "executing command"
        );
        match cmd {
            Command::StartService { server, service } => {
                self.set_service(&server, &service, Status::Online, actor).await
            }
            Command::StopService { server, service } => {
                self.set_service(&server, &service, Status::Offline, actor).await
            }
            Command::RestartService { server, service } => {
                self.restart_service(&server, &service, actor).await
            }
            Command::RebootServer { server } => self.reboot_server(&server, actor).await,
        }
    }

    /// Reboot completions still waiting to fire.
    pub fn pending_reboots(&self) -> usize {
        self.inner.tracker.len()
    }

    /// Wait for every scheduled reboot completion to finish.
    pub async fn drain(&self) {
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
    }

    /// Drop scheduled reboot completions without applying them.
    pub async fn abort(&self) {
        self.inner.cancel.cancel();
        self.drain().await;
    }

    // ── Service state ────────────────────────────────────────────────

    async fn set_service(
        &self,
        server: &str,
        service: &str,
        target: Status,
        actor: &str,
    ) -> Result<CommandResult, CoreError> {
        let snapshot = self.inner.cache.get().await?;
        let current = lookup(snapshot.servers(), server, service)?;
        if current.1 == target {
            debug!(server, service, %target, "service already in requested state");
            return Ok(CommandResult::Unchanged {
                server: server.into(),
                service: service.into(),
                status: target,
            });
        }

        let action = if target == Status::Online {
            ServiceAction::Start(service.into())
        } else {
            ServiceAction::Stop(service.into())
        };
        self.inner.source.perform(current.0, &action).await?;

        self.inner
            .cache
            .update(Instant::now(), |servers| {
                let svc = find_service_mut(servers, server, service)?;
                let old = svc.status;
                if old == target {
                    return Ok(Mutation::unchanged(CommandResult::Unchanged {
                        server: server.into(),
                        service: service.into(),
                        status: target,
                    }));
                }
                svc.status = target;
                Ok(Mutation::changed(
                    CommandResult::Changed {
                        server: server.into(),
                        service: service.into(),
                        old,
                        new: target,
                    },
                    vec![status_changed(server, service, old, target, actor)],
                ))
            })
            .await
    }

    async fn restart_service(
        &self,
        server: &str,
        service: &str,
        actor: &str,
    ) -> Result<CommandResult, CoreError> {
        let snapshot = self.inner.cache.get().await?;
        let (target, _) = lookup(snapshot.servers(), server, service)?;
        self.inner
            .source
            .perform(target, &ServiceAction::Restart(service.into()))
            .await?;

        self.inner
            .cache
            .update(Instant::now(), |servers| {
                let svc = find_service_mut(servers, server, service)?;
                let old = svc.status;
                svc.status = Status::Online;
                Ok(Mutation::changed(
                    CommandResult::Changed {
                        server: server.into(),
                        service: service.into(),
                        old,
                        new: Status::Online,
                    },
                    vec![status_changed(server, service, old, Status::Online, actor)],
                ))
            })
            .await
    }

    // ── Reboot sequence ──────────────────────────────────────────────

    async fn reboot_server(&self, server: &str, actor: &str) -> Result<CommandResult, CoreError> {
        let snapshot = self.inner.cache.get().await?;
        let target = snapshot
            .server(server)
            .ok_or_else(|| CoreError::server_not_found(server))?;
        self.inner
            .source
            .perform(target, &ServiceAction::Reboot)
            .await?;

        let delay = self.inner.policy.delay;
        let ticket = self
            .inner
            .cache
            .update(Instant::now(), |servers| {
                let srv = find_server_mut(servers, server)?;
                let at = Utc::now();
                let mut events = Vec::with_capacity(srv.services().len() + 1);
                for svc in srv.services_mut() {
                    if svc.status != Status::Offline {
                        events.push(status_changed(
                            server,
                            &svc.name,
                            svc.status,
                            Status::Offline,
                            actor,
                        ));
                        svc.status = Status::Offline;
                    }
                }
                events.push(ChangeEvent::ServerRebootStarted {
                    server: server.into(),
                    actor: actor.into(),
                    at,
                });
                let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed) + 1;
                self.inner.reboots.insert(server.to_owned(), ticket);
                Ok(Mutation::changed(ticket, events))
            })
            .await?;

        info!(server, actor, ?delay, ticket, "reboot started");

        let engine = self.clone();
        let name = server.to_owned();
        let who = actor.to_owned();
        let cancel = self.inner.cancel.clone();
        self.inner.tracker.spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(server = %name, ticket, "reboot completion cancelled");
                }
                () = tokio::time::sleep(delay) => {
                    engine.complete_reboot(&name, ticket, &who).await;
                }
            }
        });

        Ok(CommandResult::RebootScheduled {
            server: server.into(),
            completes_at: Utc::now()
                + TimeDelta::from_std(delay).unwrap_or_else(|_| TimeDelta::zero()),
        })
    }

    async fn complete_reboot(&self, server: &str, ticket: u64, actor: &str) {
        let result = self
            .inner
            .cache
            .update(Instant::now(), |servers| {
                // Checked under the write lock so a reboot that lands while
                // we wait for it always wins.
                if self
                    .inner
                    .reboots
                    .remove_if(server, |_, current| *current == ticket)
                    .is_none()
                {
                    return Ok(Mutation::unchanged(Completion::Superseded));
                }
                let Some(srv) = servers.iter_mut().find(|s| s.name == server) else {
                    return Ok(Mutation::unchanged(Completion::ServerGone));
                };
                let at = Utc::now();
                let mut events = Vec::with_capacity(srv.services().len() + 1);
                {
                    let mut rng = self.inner.rng.lock().unwrap_or_else(PoisonError::into_inner);
                    for svc in srv.services_mut() {
                        let new = self.inner.completion.sample(&mut *rng);
                        if new != svc.status {
                            events.push(status_changed(server, &svc.name, svc.status, new, actor));
                            svc.status = new;
                        }
                    }
                }
                srv.last_reboot = Some(at);
                srv.uptime_days = 0.0;
                events.push(ChangeEvent::ServerRebootCompleted {
                    server: server.into(),
                    actor: actor.into(),
                    at,
                });
                Ok(Mutation::changed(Completion::Applied, events))
            })
            .await;

        match result {
            Ok(Completion::Applied) => info!(server, ticket, "reboot completed"),
            Ok(Completion::Superseded) => debug!(server, ticket, "superseded by a later reboot"),
            Ok(Completion::ServerGone) => {
                debug!(server, ticket, "server gone before reboot completed");
            }
            Err(e) => warn!(server, ticket, error = %e, "reboot completion failed"),
        }
    }
}

/// What a reboot completion did once it held the write lock.
enum Completion {
    Applied,
    Superseded,
    ServerGone,
}

// ── Helpers ──────────────────────────────────────────────────────────

fn lookup<'a>(
    servers: &'a [Server],
    server: &str,
    service: &str,
) -> Result<(&'a Server, Status), CoreError> {
    let srv = servers
        .iter()
        .find(|s| s.name == server)
        .ok_or_else(|| CoreError::server_not_found(server))?;
    let svc = srv
        .service(service)
        .ok_or_else(|| CoreError::service_not_found(server, service))?;
    Ok((srv, svc.status))
}

fn find_server_mut<'a>(servers: &'a mut [Server], server: &str) -> Result<&'a mut Server, CoreError> {
    servers
        .iter_mut()
        .find(|s| s.name == server)
        .ok_or_else(|| CoreError::server_not_found(server))
}

fn find_service_mut<'a>(
    servers: &'a mut [Server],
    server: &str,
    service: &str,
) -> Result<&'a mut Service, CoreError> {
    find_server_mut(servers, server)?
        .service_mut(service)
        .ok_or_else(|| CoreError::service_not_found(server, service))
}

fn status_changed(server: &str, service: &str, old: Status, new: Status, actor: &str) -> ChangeEvent {
    ChangeEvent::ServiceStatusChanged {
        server: server.into(),
        service: service.into(),
        old,
        new,
        actor: actor.into(),
        at: Utc::now(),
    }
}
