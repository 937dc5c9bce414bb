// Integration tests for the command engine through the `Controller`.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use fleetwatch_core::{
    ChangeEvent, CommandResult, Controller, CoreError, FleetConfig, RebootPolicy, Server,
    ServerKind, Service, ServiceAction, Status, StatusSource,
};

// ── Helpers ─────────────────────────────────────────────────────────

/// Two servers, five services, four of them online.
struct SmallFleet;

#[async_trait]
impl StatusSource for SmallFleet {
    fn name(&self) -> &'static str {
        "small"
    }

    async fn produce(&self) -> Result<Vec<Server>, CoreError> {
        Ok(vec![
            Server::new(
                "VXSQL1",
                "172.16.1.150",
                ServerKind::Database,
                vec![
                    Service::new("SQL Server", "SQL Database Engine", Status::Online),
                    Service::new("SQLAgent", "SQL Server Agent", Status::Online),
                    Service::new("W3SVC", "IIS Web Server", Status::Offline),
                ],
            )?
            .with_gauges(40.0, 60.0, 70.0),
            Server::new(
                "VXCATI1",
                "172.16.1.156",
                ServerKind::Cati,
                vec![
                    Service::new("VoxcoBridgeService", "Bridge Service", Status::Online),
                    Service::new("VoxcoCATIService", "CATI Service", Status::Online),
                ],
            )?
            .with_gauges(20.0, 30.0, 51.0),
        ])
    }
}

/// `SmallFleet` behind a slow link: every fetch takes 800ms and a reboot
/// request takes 1.1s to be acknowledged.
struct SlowFleet;

#[async_trait]
impl StatusSource for SlowFleet {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn produce(&self) -> Result<Vec<Server>, CoreError> {
        tokio::time::sleep(Duration::from_millis(800)).await;
        SmallFleet.produce().await
    }

    async fn perform(&self, _server: &Server, action: &ServiceAction) -> Result<(), CoreError> {
        if matches!(action, ServiceAction::Reboot) {
            tokio::time::sleep(Duration::from_millis(1100)).await;
        }
        Ok(())
    }
}

fn config() -> FleetConfig {
    FleetConfig {
        cache_ttl: Duration::from_secs(3600),
        refresh_interval: Duration::ZERO,
        reboot: RebootPolicy {
            delay: Duration::from_secs(5),
            ..RebootPolicy::default()
        },
        rng_seed: Some(99),
        ..FleetConfig::default()
    }
}

async fn controller() -> Controller {
    let controller = Controller::new(config(), Arc::new(SmallFleet)).unwrap();
    controller.start().await.unwrap();
    controller
}

/// Collect whatever is already buffered on `stream`.
async fn drain_events(stream: &mut fleetwatch_core::EventStream) -> Vec<Arc<ChangeEvent>> {
    let mut out = Vec::new();
    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_millis(20), stream.next_event()).await
    {
        out.push(event);
    }
    out
}

// ── Service commands ────────────────────────────────────────────────

#[tokio::test]
async fn test_stop_then_stop_again_is_idempotent() {
    let controller = controller().await;
    let mut events = controller.events();

    let first = controller
        .stop_service("VXSQL1", "SQLAgent", "alice")
        .await
        .unwrap();
    assert_eq!(
        first,
        CommandResult::Changed {
            server: "VXSQL1".into(),
            service: "SQLAgent".into(),
            old: Status::Online,
            new: Status::Offline,
        }
    );
    let generation = controller.snapshot().await.unwrap().generation;

    let second = controller
        .stop_service("VXSQL1", "SQLAgent", "alice")
        .await
        .unwrap();
    assert!(matches!(second, CommandResult::Unchanged { status: Status::Offline, .. }));
    assert_eq!(controller.snapshot().await.unwrap().generation, generation);

    let seen = drain_events(&mut events).await;
    assert_eq!(seen.len(), 1);
    assert!(matches!(
        seen[0].as_ref(),
        ChangeEvent::ServiceStatusChanged { actor, .. } if actor == "alice"
    ));
}

#[tokio::test]
async fn test_start_brings_service_online() {
    let controller = controller().await;
    controller
        .start_service("VXSQL1", "W3SVC", "bob")
        .await
        .unwrap();
    let server = controller.get_server("VXSQL1").await.unwrap();
    assert_eq!(server.service("W3SVC").unwrap().status, Status::Online);
}

#[tokio::test]
async fn test_unknown_targets_are_not_found_and_silent() {
    let controller = controller().await;
    let mut events = controller.events();
    let before = controller.snapshot().await.unwrap();

    let err = controller
        .start_service("GHOST", "W3SVC", "ops")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ServerNotFound { .. }));

    let err = controller
        .restart_service("VXSQL1", "Spooler", "ops")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ServiceNotFound { .. }));

    let err = controller.reboot_server("GHOST", "ops").await.unwrap_err();
    assert!(err.is_not_found());

    let after = controller.snapshot().await.unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert!(drain_events(&mut events).await.is_empty());
}

#[tokio::test]
async fn test_blank_identifiers_are_rejected() {
    let controller = controller().await;
    let err = controller.stop_service("VXSQL1", "", "ops").await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidCommand { .. }));
}

// ── Reboot sequence ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_reboot_goes_offline_then_recovers() {
    let controller = controller().await;
    let mut events = controller.server_events("VXSQL1");

    let result = controller.reboot_server("VXSQL1", "carol").await.unwrap();
    assert!(matches!(result, CommandResult::RebootScheduled { .. }));

    let server = controller.get_server("VXSQL1").await.unwrap();
    assert!(server.services().iter().all(|s| s.status == Status::Offline));
    let other = controller.get_server("VXCATI1").await.unwrap();
    assert!(other.services().iter().all(|s| s.status == Status::Online));

    tokio::time::sleep(Duration::from_secs(6)).await;

    let server = controller.get_server("VXSQL1").await.unwrap();
    assert!(
        server
            .services()
            .iter()
            .all(|s| matches!(s.status, Status::Online | Status::Warning))
    );
    assert!(server.last_reboot.is_some());

    let kinds: Vec<&'static str> = drain_events(&mut events)
        .await
        .iter()
        .map(|e| e.kind())
        .collect();
    assert_eq!(kinds.first(), Some(&"service_status_changed"));
    assert!(kinds.contains(&"server_reboot_started"));
    assert_eq!(kinds.last(), Some(&"server_reboot_completed"));

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_pending_completion() {
    let controller = controller().await;
    controller.reboot_server("VXCATI1", "ops").await.unwrap();
    assert_eq!(controller.pending_reboots(), 1);

    controller.shutdown().await;
    assert_eq!(controller.pending_reboots(), 0);
    let server = controller.cache().peek().unwrap();
    let server = server.server("VXCATI1").unwrap();
    assert!(server.services().iter().all(|s| s.status != Status::Offline));
}

#[tokio::test(start_paused = true)]
async fn test_completion_for_removed_server_is_silent() {
    let controller = controller().await;
    controller.reboot_server("VXSQL1", "ops").await.unwrap();

    let remaining: Vec<Server> = SmallFleet
        .produce()
        .await
        .unwrap()
        .into_iter()
        .filter(|s| s.name != "VXSQL1")
        .collect();
    let before = controller
        .cache()
        .force_set(remaining, tokio::time::Instant::now(), "ops")
        .await
        .unwrap();
    let mut events = controller.events();

    tokio::time::sleep(Duration::from_secs(6)).await;

    assert_eq!(controller.pending_reboots(), 0);
    let after = controller.cache().peek().unwrap();
    assert_eq!(after.generation, before.generation);
    assert!(after.server("VXSQL1").is_none());
    assert!(drain_events(&mut events).await.is_empty());

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_reboot_during_stale_refresh_outlives_earlier_completion() {
    let controller = Controller::new(
        FleetConfig {
            cache_ttl: Duration::from_secs(1),
            ..config()
        },
        Arc::new(SlowFleet),
    )
    .unwrap();
    controller.start().await.unwrap();
    let mut events = controller.server_events("VXSQL1");

    // First reboot is applied at t=2.7s, so its completion is due at 7.7s.
    controller.reboot_server("VXSQL1", "first").await.unwrap();
    tokio::time::sleep(Duration::from_millis(2700)).await;

    // The second reboot refreshes the stale cache under the write lock from
    // 7.3s to 8.1s, straddling the first completion.
    controller.reboot_server("VXSQL1", "second").await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let server = controller.cache().peek().unwrap();
    let server = server.server("VXSQL1").unwrap();
    assert!(server.services().iter().all(|s| s.status == Status::Offline));
    assert!(server.last_reboot.is_none());
    assert_eq!(controller.pending_reboots(), 1);

    let lifecycle = |seen: Vec<Arc<ChangeEvent>>| -> Vec<String> {
        seen.iter()
            .filter_map(|e| match e.as_ref() {
                ChangeEvent::ServerRebootStarted { actor, .. } => Some(format!("started:{actor}")),
                ChangeEvent::ServerRebootCompleted { actor, .. } => {
                    Some(format!("completed:{actor}"))
                }
                _ => None,
            })
            .collect()
    };
    assert_eq!(
        lifecycle(drain_events(&mut events).await),
        vec!["started:first", "started:second"]
    );

    // Only the second completion applies.
    tokio::time::sleep(Duration::from_secs(6)).await;
    let server = controller.cache().peek().unwrap();
    let server = server.server("VXSQL1").unwrap();
    assert!(server.services().iter().all(|s| s.status != Status::Offline));
    assert!(server.last_reboot.is_some());
    assert_eq!(
        lifecycle(drain_events(&mut events).await),
        vec!["completed:second"]
    );

    controller.shutdown().await;
}

// ── Statistics ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_stats_arithmetic() {
    let controller = controller().await;
    let stats = controller.stats().await.unwrap();
    assert_eq!(stats.total_servers, 2);
    assert_eq!(stats.total_services, 5);
    assert_eq!(stats.online_services, 4);
    assert_eq!(stats.offline_services, 1);
    assert!((stats.uptime_percentage - 80.0).abs() < f64::EPSILON);
    assert!((stats.avg_cpu_usage - 30.0).abs() < f64::EPSILON);
    assert!((stats.avg_disk_usage - 60.5).abs() < f64::EPSILON);
}
