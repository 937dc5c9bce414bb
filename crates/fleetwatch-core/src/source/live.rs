// ── Live status source ──
//
// Probes every server in the seed inventory through a `RemoteExecutor`.
// Probes run concurrently and each one is bounded by the configured
// timeout; an unreachable server is reported degraded instead of
// failing the whole refresh.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use serde::Deserialize;
use tracing::{debug, warn};

use super::seed::SeedServer;
use super::{ServiceAction, StatusSource};
use crate::error::CoreError;
use crate::model::{Server, Service, Status};
use crate::remote::{RemoteCommand, RemoteExecutor};

/// Queries real machines for service status.
pub struct LiveSource {
    inventory: Vec<SeedServer>,
    executor: Arc<dyn RemoteExecutor>,
    timeout: Duration,
}

impl LiveSource {
    pub fn new(
        inventory: Vec<SeedServer>,
        executor: Arc<dyn RemoteExecutor>,
        timeout: Duration,
    ) -> Self {
        Self {
            inventory,
            executor,
            timeout,
        }
    }

    async fn probe(&self, seed: &SeedServer) -> Server {
        let (services, info) = tokio::join!(
            self.executor
                .execute(&seed.ip, &RemoteCommand::QueryServices, self.timeout),
            self.executor
                .execute(&seed.ip, &RemoteCommand::SystemInfo, self.timeout),
        );

        let reported = match services
            .and_then(|out| out.into_result(&seed.ip))
            .and_then(|out| parse_services(&out.stdout, &seed.ip))
        {
            Ok(reported) => reported,
            Err(e) => {
                warn!(server = %seed.name, error = %e, "service probe failed, marking degraded");
                return Server::degraded(&seed.name, &seed.ip, seed.kind())
                    .with_os(seed.os())
                    .with_location(seed.location.clone().unwrap_or_default())
                    .with_specs(seed.specs.clone());
            }
        };

        let services = select_services(seed, reported);
        let server = match Server::new(&seed.name, &seed.ip, seed.kind(), services) {
            Ok(server) => server,
            Err(e) => {
                warn!(server = %seed.name, error = %e, "probe returned no usable services");
                Server::degraded(&seed.name, &seed.ip, seed.kind())
            }
        }
        .with_os(seed.os())
        .with_location(seed.location.clone().unwrap_or_default())
        .with_specs(seed.specs.clone())
        .with_last_reboot(seed.last_reboot_at());

        match info
            .and_then(|out| out.into_result(&seed.ip))
            .and_then(|out| parse_system_info(&out.stdout, &seed.ip))
        {
            Ok(info) => apply_system_info(server, &info),
            Err(e) => {
                debug!(server = %seed.name, error = %e, "system info unavailable");
                let uptime = seed
                    .last_reboot_at()
                    .map_or(0.0, |at| super::seed::uptime_days(at, Utc::now()));
                server.with_uptime_days(uptime)
            }
        }
    }
}

#[async_trait]
impl StatusSource for LiveSource {
    fn name(&self) -> &'static str {
        "live"
    }

    async fn produce(&self) -> Result<Vec<Server>, CoreError> {
        if self.inventory.is_empty() {
            return Err(CoreError::SourceUnavailable {
                reason: "live source has an empty inventory".into(),
            });
        }
        let servers = join_all(self.inventory.iter().map(|seed| self.probe(seed))).await;
        debug!(count = servers.len(), "live probe complete");
        Ok(servers)
    }

    async fn perform(&self, server: &Server, action: &ServiceAction) -> Result<(), CoreError> {
        let command = RemoteCommand::from(action);
        debug!(server = %server.name, address = %server.ip, ?command, "forwarding action");
        self.executor
            .execute(&server.ip, &command, self.timeout)
            .await?
            .into_result(&server.ip)?;
        Ok(())
    }
}

// ── Output parsing ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawService {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    status: serde_json::Value,
}

/// `ConvertTo-Json` emits a bare object when only one item matches.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

/// `Running` / `4` map to online, `Stopped` / `1` to offline; every
/// pending or paused state is a warning.
fn map_service_status(value: &serde_json::Value) -> Status {
    match value {
        serde_json::Value::Number(n) => match n.as_u64() {
            Some(4) => Status::Online,
            Some(1) => Status::Offline,
            _ => Status::Warning,
        },
        serde_json::Value::String(s) if s.eq_ignore_ascii_case("running") => Status::Online,
        serde_json::Value::String(s) if s.eq_ignore_ascii_case("stopped") => Status::Offline,
        _ => Status::Warning,
    }
}

fn parse_services(stdout: &str, address: &str) -> Result<Vec<Service>, CoreError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let raw: OneOrMany<RawService> =
        serde_json::from_str(trimmed).map_err(|e| CoreError::OperationFailed {
            address: address.into(),
            message: format!("unreadable service list: {e}"),
        })?;
    Ok(raw
        .into_vec()
        .into_iter()
        .map(|svc| {
            let status = map_service_status(&svc.status);
            Service::new(svc.name, svc.display_name.unwrap_or_default(), status)
        })
        .collect())
}

/// Keep the services the inventory watches, in inventory order. Watched
/// services absent from the machine are reported offline.
fn select_services(seed: &SeedServer, reported: Vec<Service>) -> Vec<Service> {
    let mut by_name: HashMap<String, Service> =
        reported.into_iter().map(|s| (s.name.clone(), s)).collect();
    seed.template()
        .services
        .into_iter()
        .map(|(name, desc)| match by_name.remove(&name) {
            Some(mut svc) => {
                if !desc.is_empty() {
                    svc.description = desc;
                }
                svc
            }
            None => Service::new(name, desc, Status::Offline),
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawSystemInfo {
    #[serde(default)]
    os_name: Option<String>,
    #[serde(default)]
    cpu_load: Option<f64>,
    #[serde(default)]
    memory_percent: Option<f64>,
    #[serde(default)]
    disk_percent: Option<f64>,
    #[serde(default)]
    uptime_days: Option<f64>,
}

fn parse_system_info(stdout: &str, address: &str) -> Result<RawSystemInfo, CoreError> {
    serde_json::from_str(stdout.trim()).map_err(|e| CoreError::OperationFailed {
        address: address.into(),
        message: format!("unreadable system info: {e}"),
    })
}

fn apply_system_info(server: Server, info: &RawSystemInfo) -> Server {
    let os = info.os_name.clone().unwrap_or_else(|| server.os.clone());
    server
        .with_os(os)
        .with_gauges(
            info.cpu_load.unwrap_or_default(),
            info.memory_percent.unwrap_or_default(),
            info.disk_percent.unwrap_or_default(),
        )
        .with_uptime_days(info.uptime_days.unwrap_or_default())
}
