// Integration tests for `StatusCache` expiry and snapshot atomicity.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use fleetwatch_core::{
    ChangeEvent, ChangeNotifier, CoreError, Server, ServerKind, Service, Status, StatusCache,
    StatusSource,
};

// ── Helpers ─────────────────────────────────────────────────────────

/// Counts `produce` calls and stamps the call number into every server's
/// location, so a torn snapshot would show mixed tags.
#[derive(Default)]
struct Counting {
    calls: AtomicU64,
    delay: Option<Duration>,
}

#[async_trait]
impl StatusSource for Counting {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn produce(&self) -> Result<Vec<Server>, CoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let status = if call % 2 == 0 {
            Status::Offline
        } else {
            Status::Online
        };
        (0..8)
            .map(|i| {
                Server::new(
                    format!("srv{i}"),
                    format!("10.0.0.{i}"),
                    ServerKind::General,
                    vec![
                        Service::new("a", "", status),
                        Service::new("b", "", Status::Online),
                    ],
                )
                .map(|s| s.with_location(format!("gen-{call}")))
            })
            .collect()
    }
}

fn cache_over(source: Arc<Counting>, ttl: Duration) -> StatusCache {
    StatusCache::new(source, ChangeNotifier::new(1024), ttl)
}

// ── TTL ─────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_same_snapshot_within_ttl() {
    let source = Arc::new(Counting::default());
    let cache = cache_over(Arc::clone(&source), Duration::from_secs(60));

    let first = cache.get().await.unwrap();
    tokio::time::advance(Duration::from_secs(59)).await;
    let second = cache.get().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    let third = cache.get().await.unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(third.generation, 2);
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_explicit_instant_drives_expiry() {
    let source = Arc::new(Counting::default());
    let cache = cache_over(Arc::clone(&source), Duration::from_secs(60));
    let t0 = Instant::now();

    cache.get_at(t0).await.unwrap();
    cache.get_at(t0 + Duration::from_secs(60)).await.unwrap();
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    cache.get_at(t0 + Duration::from_secs(61)).await.unwrap();
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_expired_readers_share_one_refresh() {
    let source = Arc::new(Counting {
        delay: Some(Duration::from_millis(100)),
        ..Counting::default()
    });
    let cache = Arc::new(cache_over(Arc::clone(&source), Duration::from_secs(60)));

    let readers: Vec<_> = (0..16)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get().await.unwrap().generation })
        })
        .collect();
    for reader in readers {
        assert_eq!(reader.await.unwrap(), 1);
    }
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

// ── Change detection ────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_emits_transitions_as_system() {
    let source = Arc::new(Counting::default());
    let notifier = ChangeNotifier::new(1024);
    let cache = StatusCache::new(source, notifier.clone(), Duration::from_secs(60));
    cache.get().await.unwrap();

    let mut events = notifier.subscribe();
    cache.refresh().await.unwrap();

    let mut transitions = 0;
    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_millis(20), events.next_event()).await
    {
        match event.as_ref() {
            ChangeEvent::ServiceStatusChanged {
                service, actor, old, new, ..
            } => {
                assert_eq!(service, "a");
                assert_eq!(actor, "system");
                assert_eq!((*old, *new), (Status::Online, Status::Offline));
                transitions += 1;
            }
            ChangeEvent::FleetRefreshed { generation, servers, .. } => {
                assert_eq!((*generation, *servers), (2, 8));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(transitions, 8);
}

// ── Atomicity ───────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_observe_torn_snapshots() {
    let source = Arc::new(Counting::default());
    let cache = Arc::new(cache_over(Arc::clone(&source), Duration::ZERO));
    cache.get().await.unwrap();

    let writer = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            for _ in 0..200 {
                cache.refresh().await.unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                let mut last_generation = 0;
                for _ in 0..500 {
                    let snapshot = cache.peek().unwrap();
                    let tag = &snapshot.servers()[0].location;
                    assert!(snapshot.servers().iter().all(|s| &s.location == tag));
                    assert!(snapshot.generation >= last_generation);
                    last_generation = snapshot.generation;
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(cache.peek().unwrap().generation, 201);
}
