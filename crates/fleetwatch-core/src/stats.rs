// ── Fleet-wide statistics ──

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Snapshot, Status};

/// Aggregate counts and averages over one snapshot.
///
/// Percentages and averages are rounded to two decimal places; an empty
/// fleet reports zero everywhere.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetStats {
    pub total_servers: usize,
    pub total_services: usize,
    pub online_services: usize,
    pub warning_services: usize,
    pub offline_services: usize,
    /// Share of services that are online.
    pub uptime_percentage: f64,
    pub avg_cpu_usage: f64,
    pub avg_memory_usage: f64,
    pub avg_disk_usage: f64,
    pub generation: u64,
    pub timestamp: DateTime<Utc>,
}

impl FleetStats {
    pub fn compute(snapshot: &Snapshot, at: DateTime<Utc>) -> Self {
        let servers = snapshot.servers();
        let mut online = 0;
        let mut warning = 0;
        let mut offline = 0;
        for svc in servers.iter().flat_map(|s| s.services()) {
            match svc.status {
                Status::Online => online += 1,
                Status::Warning => warning += 1,
                Status::Offline => offline += 1,
            }
        }
        let total_services = online + warning + offline;

        Self {
            total_servers: servers.len(),
            total_services,
            online_services: online,
            warning_services: warning,
            offline_services: offline,
            uptime_percentage: round2(ratio(online, total_services) * 100.0),
            avg_cpu_usage: round2(mean(servers.iter().map(|s| s.cpu_usage))),
            avg_memory_usage: round2(mean(servers.iter().map(|s| s.memory_usage))),
            avg_disk_usage: round2(mean(servers.iter().map(|s| s.disk_usage))),
            generation: snapshot.generation,
            timestamp: at,
        }
    }

    pub fn count(&self, status: Status) -> usize {
        match status {
            Status::Online => self.online_services,
            Status::Warning => self.warning_services,
            Status::Offline => self.offline_services,
        }
    }
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0_usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Server, ServerKind, Service};

    fn server(name: &str, statuses: &[Status], cpu: f64) -> Server {
        let services = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| Service::new(format!("svc{i}"), "", *s))
            .collect();
        Server::new(name, "10.0.0.1", ServerKind::General, services)
            .unwrap()
            .with_gauges(cpu, 50.0, 25.0)
    }

    #[test]
    fn empty_fleet_is_all_zero() {
        let stats = FleetStats::compute(&Snapshot::new(0, vec![]), Utc::now());
        assert_eq!(stats.total_servers, 0);
        assert!(stats.uptime_percentage.abs() < f64::EPSILON);
        assert!(stats.avg_cpu_usage.abs() < f64::EPSILON);
    }

    #[test]
    fn averages_round_to_two_places() {
        let snapshot = Snapshot::new(
            1,
            vec![
                server("a", &[Status::Online], 10.0),
                server("b", &[Status::Online], 10.0),
                server("c", &[Status::Offline], 11.0),
            ],
        );
        let stats = FleetStats::compute(&snapshot, Utc::now());
        assert!((stats.avg_cpu_usage - 10.33).abs() < 1e-9);
        assert!((stats.uptime_percentage - 66.67).abs() < 1e-9);
        assert_eq!(stats.count(Status::Offline), 1);
    }
}
