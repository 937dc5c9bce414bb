// ── Seed inventory file ──
//
// JSON array describing the fleet: identity, services, hardware specs and
// the last known reboot. Both sources can be driven from it; the live
// source requires it.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::ServerTemplate;
use crate::error::CoreError;
use crate::model::{HardwareSpecs, Server, ServerKind, Service, Status};

const LAST_REBOOT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedService {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedServer {
    pub name: String,
    pub ip: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ServerKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub services: Vec<SeedService>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specs: Option<HardwareSpecs>,
    /// Availability figure as displayed, e.g. `"99.98%"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<String>,
    /// `YYYY-MM-DD HH:MM:SS` (UTC) or RFC 3339.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reboot: Option<String>,
}

impl SeedServer {
    pub fn kind(&self) -> ServerKind {
        self.kind.unwrap_or_default()
    }

    pub fn os(&self) -> String {
        self.specs
            .as_ref()
            .and_then(|s| s.os.clone())
            .unwrap_or_default()
    }

    pub fn last_reboot_at(&self) -> Option<DateTime<Utc>> {
        self.last_reboot.as_deref().and_then(parse_timestamp)
    }

    /// Services listed in the file, or the catalog defaults for the
    /// server's kind when the file lists none.
    pub fn template(&self) -> ServerTemplate {
        let mut template = ServerTemplate::new(&self.name, &self.ip, self.kind(), &self.os());
        if !self.services.is_empty() {
            template.services = self
                .services
                .iter()
                .map(|s| (s.name.clone(), s.description.clone().unwrap_or_default()))
                .collect();
        }
        template
    }

    /// Build a server exactly as recorded, statuses defaulting to online.
    pub fn to_server(&self, now: DateTime<Utc>) -> Result<Server, CoreError> {
        let services = if self.services.is_empty() {
            self.template()
                .services
                .into_iter()
                .map(|(name, desc)| Service::new(name, desc, Status::Online))
                .collect()
        } else {
            self.services
                .iter()
                .map(|s| {
                    Service::new(
                        s.name.clone(),
                        s.description.clone().unwrap_or_default(),
                        s.status.unwrap_or(Status::Online),
                    )
                })
                .collect()
        };
        let last_reboot = self.last_reboot_at();
        Ok(Server::new(self.name.clone(), self.ip.clone(), self.kind(), services)?
            .with_os(self.os())
            .with_location(self.location.clone().unwrap_or_default())
            .with_uptime_days(last_reboot.map_or(0.0, |at| uptime_days(at, now)))
            .with_specs(self.specs.clone())
            .with_last_reboot(last_reboot))
    }
}

impl From<&Server> for SeedServer {
    fn from(server: &Server) -> Self {
        Self {
            name: server.name.clone(),
            ip: server.ip.clone(),
            kind: Some(server.kind),
            location: (!server.location.is_empty()).then(|| server.location.clone()),
            services: server
                .services()
                .iter()
                .map(|s| SeedService {
                    name: s.name.clone(),
                    description: (!s.description.is_empty()).then(|| s.description.clone()),
                    status: Some(s.status),
                })
                .collect(),
            specs: server.specs.clone(),
            uptime: None,
            last_reboot: server
                .last_reboot
                .map(|at| at.format(LAST_REBOOT_FORMAT).to_string()),
        }
    }
}

/// Days elapsed since `since`, to one decimal place.
pub(crate) fn uptime_days(since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    let secs = (now - since).num_seconds().max(0) as f64;
    (secs / 86_400.0 * 10.0).round() / 10.0
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, LAST_REBOOT_FORMAT)
        .map(|n| n.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)))
        .ok()
}

/// Parse seed JSON. `origin` names the input in error messages.
pub fn parse_seed(json: &str, origin: &str) -> Result<Vec<SeedServer>, CoreError> {
    let servers: Vec<SeedServer> = serde_json::from_str(json).map_err(|e| CoreError::Seed {
        path: origin.into(),
        reason: e.to_string(),
    })?;

    let mut seen = std::collections::HashSet::new();
    for server in &servers {
        if server.name.trim().is_empty() {
            return Err(CoreError::Seed {
                path: origin.into(),
                reason: "server with empty name".into(),
            });
        }
        if !seen.insert(server.name.as_str()) {
            return Err(CoreError::Seed {
                path: origin.into(),
                reason: format!("server {} listed twice", server.name),
            });
        }
    }
    Ok(servers)
}

pub fn load_seed(path: &Path) -> Result<Vec<SeedServer>, CoreError> {
    let display = path.display().to_string();
    let json = std::fs::read_to_string(path).map_err(|e| CoreError::Seed {
        path: display.clone(),
        reason: e.to_string(),
    })?;
    parse_seed(&json, &display)
}

/// Write the servers as a seed file, statuses included.
pub fn save_seed(path: &Path, servers: &[Server]) -> Result<(), CoreError> {
    let display = path.display().to_string();
    let seed: Vec<SeedServer> = servers.iter().map(SeedServer::from).collect();
    let json = serde_json::to_string_pretty(&seed).map_err(|e| CoreError::Seed {
        path: display.clone(),
        reason: e.to_string(),
    })?;
    std::fs::write(path, json).map_err(|e| CoreError::Seed {
        path: display,
        reason: e.to_string(),
    })
}
