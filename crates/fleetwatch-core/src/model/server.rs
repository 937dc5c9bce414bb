// ── Server and service domain types ──

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::status::Status;
use crate::error::CoreError;

/// Name given to the placeholder service of a server that could not be probed.
pub const UNKNOWN_SERVICE: &str = "Unknown";

/// Server classification.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
pub enum ServerKind {
    #[serde(rename = "Database Server")]
    #[strum(serialize = "Database Server")]
    Database,
    #[serde(rename = "Directory Server")]
    #[strum(serialize = "Directory Server")]
    Directory,
    #[serde(rename = "Admin Server")]
    #[strum(serialize = "Admin Server")]
    Admin,
    #[serde(rename = "Application Server")]
    #[strum(serialize = "Application Server")]
    Application,
    #[serde(rename = "CATI Server")]
    #[strum(serialize = "CATI Server")]
    Cati,
    #[serde(rename = "Reporting Server")]
    #[strum(serialize = "Reporting Server")]
    Reporting,
    #[serde(rename = "Dialer Server")]
    #[strum(serialize = "Dialer Server")]
    Dialer,
    #[serde(rename = "Web Server")]
    #[strum(serialize = "Web Server")]
    Web,
    #[serde(rename = "File Server")]
    #[strum(serialize = "File Server")]
    File,
    #[serde(rename = "Mail Server")]
    #[strum(serialize = "Mail Server")]
    Mail,
    #[serde(rename = "Proxy Server")]
    #[strum(serialize = "Proxy Server")]
    Proxy,
    #[default]
    #[serde(rename = "General Server")]
    #[strum(serialize = "General Server")]
    General,
}

/// A managed service on a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: Status,
}

impl Service {
    pub fn new(name: impl Into<String>, description: impl Into<String>, status: Status) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            status,
        }
    }
}

/// Free-form hardware description carried over from the seed inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareSpecs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cores: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
}

/// A machine in the fleet and its services.
///
/// The service list is never empty and service names are unique within the
/// server. Both are enforced at construction and deserialization; callers
/// can edit services in place but cannot add or remove them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawServer")]
pub struct Server {
    pub name: String,
    pub ip: String,
    #[serde(rename = "type")]
    pub kind: ServerKind,
    pub os: String,
    pub location: String,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub uptime_days: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specs: Option<HardwareSpecs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reboot: Option<DateTime<Utc>>,
    services: Vec<Service>,
}

impl Server {
    pub fn new(
        name: impl Into<String>,
        ip: impl Into<String>,
        kind: ServerKind,
        services: Vec<Service>,
    ) -> Result<Self, CoreError> {
        let name = name.into();
        validate_services(&name, &services)?;
        Ok(Self {
            name,
            ip: ip.into(),
            kind,
            os: String::new(),
            location: String::new(),
            cpu_usage: 0.0,
            memory_usage: 0.0,
            disk_usage: 0.0,
            uptime_days: 0.0,
            specs: None,
            last_reboot: None,
            services,
        })
    }

    /// A server that could not be probed: one `Unknown` service, offline.
    pub fn degraded(name: impl Into<String>, ip: impl Into<String>, kind: ServerKind) -> Self {
        Self {
            name: name.into(),
            ip: ip.into(),
            kind,
            os: String::new(),
            location: String::new(),
            cpu_usage: 0.0,
            memory_usage: 0.0,
            disk_usage: 0.0,
            uptime_days: 0.0,
            specs: None,
            last_reboot: None,
            services: vec![Service::new(
                UNKNOWN_SERVICE,
                "Status unavailable",
                Status::Offline,
            )],
        }
    }

    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = os.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Set CPU, memory and disk gauges, clamped to `0..=100`.
    pub fn with_gauges(mut self, cpu: f64, memory: f64, disk: f64) -> Self {
        self.cpu_usage = clamp_pct(cpu);
        self.memory_usage = clamp_pct(memory);
        self.disk_usage = clamp_pct(disk);
        self
    }

    pub fn with_uptime_days(mut self, days: f64) -> Self {
        self.uptime_days = if days.is_finite() { days.max(0.0) } else { 0.0 };
        self
    }

    pub fn with_specs(mut self, specs: Option<HardwareSpecs>) -> Self {
        self.specs = specs;
        self
    }

    pub fn with_last_reboot(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.last_reboot = at;
        self
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Mutable access to the services. The slice cannot grow or shrink.
    pub fn services_mut(&mut self) -> &mut [Service] {
        &mut self.services
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn service_mut(&mut self, name: &str) -> Option<&mut Service> {
        self.services.iter_mut().find(|s| s.name == name)
    }

    /// `true` if any service is currently in `status`.
    pub fn has_status(&self, status: Status) -> bool {
        self.services.iter().any(|s| s.status == status)
    }

    /// Worst status across services (offline > warning > online).
    pub fn overall_status(&self) -> Status {
        self.services
            .iter()
            .map(|s| s.status)
            .max()
            .unwrap_or(Status::Offline)
    }
}

fn validate_services(server: &str, services: &[Service]) -> Result<(), CoreError> {
    if services.is_empty() {
        return Err(CoreError::ValidationFailed {
            message: format!("server {server} must have at least one service"),
        });
    }
    let mut seen = HashSet::with_capacity(services.len());
    for svc in services {
        if svc.name.trim().is_empty() {
            return Err(CoreError::ValidationFailed {
                message: format!("server {server} has a service with an empty name"),
            });
        }
        if !seen.insert(svc.name.as_str()) {
            return Err(CoreError::ValidationFailed {
                message: format!("server {server} lists service '{}' twice", svc.name),
            });
        }
    }
    Ok(())
}

pub(crate) fn clamp_pct(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Wire shape of [`Server`]; validated on the way in.
#[derive(Deserialize)]
struct RawServer {
    name: String,
    ip: String,
    #[serde(rename = "type", default)]
    kind: ServerKind,
    #[serde(default)]
    os: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    cpu_usage: f64,
    #[serde(default)]
    memory_usage: f64,
    #[serde(default)]
    disk_usage: f64,
    #[serde(default)]
    uptime_days: f64,
    #[serde(default)]
    specs: Option<HardwareSpecs>,
    #[serde(default)]
    last_reboot: Option<DateTime<Utc>>,
    services: Vec<Service>,
}

impl TryFrom<RawServer> for Server {
    type Error = CoreError;

    fn try_from(raw: RawServer) -> Result<Self, Self::Error> {
        Ok(Server::new(raw.name, raw.ip, raw.kind, raw.services)?
            .with_os(raw.os)
            .with_location(raw.location)
            .with_gauges(raw.cpu_usage, raw.memory_usage, raw.disk_usage)
            .with_uptime_days(raw.uptime_days)
            .with_specs(raw.specs)
            .with_last_reboot(raw.last_reboot))
    }
}
