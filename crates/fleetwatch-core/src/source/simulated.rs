// ── Simulated status source ──
//
// Produces a plausible fleet from a fixed inventory: weighted random
// service statuses, random gauges and locations. Seedable for tests.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use super::StatusSource;
use super::catalog::{ServerTemplate, default_inventory};
use crate::error::CoreError;
use crate::model::{Server, Service, StatusDistribution, StatusWeights};

const LOCATIONS: &[&str] = &[
    "New York",
    "London",
    "Tokyo",
    "Sydney",
    "Berlin",
    "Paris",
    "Toronto",
    "Singapore",
];

/// Weighted-random fleet generator.
pub struct SimulatedSource {
    inventory: Vec<ServerTemplate>,
    distribution: StatusDistribution,
    rng: Mutex<StdRng>,
}

impl SimulatedSource {
    /// Simulate `inventory`. `seed` fixes the random sequence.
    pub fn new(
        inventory: Vec<ServerTemplate>,
        weights: StatusWeights,
        seed: Option<u64>,
    ) -> Result<Self, CoreError> {
        let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Ok(Self {
            inventory,
            distribution: weights.distribution()?,
            rng: Mutex::new(rng),
        })
    }

    /// The built-in ten-server fleet with default weights.
    pub fn with_defaults(seed: Option<u64>) -> Result<Self, CoreError> {
        Self::new(default_inventory(), StatusWeights::default(), seed)
    }

    fn generate(&self, template: &ServerTemplate, rng: &mut StdRng) -> Result<Server, CoreError> {
        let services = template
            .services
            .iter()
            .map(|(name, desc)| Service::new(name.clone(), desc.clone(), self.distribution.sample(rng)))
            .collect();
        let location = LOCATIONS.choose(rng).copied().unwrap_or_default();
        let cpu = round1(rng.random_range(5.0..=95.0));
        let memory = round1(rng.random_range(10.0..=90.0));
        let disk = round1(rng.random_range(20.0..=95.0));
        let uptime = f64::from(rng.random_range(1_u32..=365));

        Ok(
            Server::new(template.name.clone(), template.ip.clone(), template.kind, services)?
                .with_os(template.os.clone())
                .with_location(location)
                .with_gauges(cpu, memory, disk)
                .with_uptime_days(uptime),
        )
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[async_trait]
impl StatusSource for SimulatedSource {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn produce(&self) -> Result<Vec<Server>, CoreError> {
        if self.inventory.is_empty() {
            return Err(CoreError::SourceUnavailable {
                reason: "simulated inventory is empty".into(),
            });
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        self.inventory
            .iter()
            .map(|template| self.generate(template, &mut rng))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Status;

    #[tokio::test]
    async fn produces_full_inventory_within_ranges() {
        let source = SimulatedSource::with_defaults(Some(42)).unwrap();
        let servers = source.produce().await.unwrap();
        assert_eq!(servers.len(), 10);
        for server in &servers {
            assert!((5.0..=95.0).contains(&server.cpu_usage));
            assert!((10.0..=90.0).contains(&server.memory_usage));
            assert!((20.0..=95.0).contains(&server.disk_usage));
            assert!((1.0..=365.0).contains(&server.uptime_days));
            assert!(LOCATIONS.contains(&server.location.as_str()));
        }
    }

    #[tokio::test]
    async fn same_seed_same_fleet() {
        let a = SimulatedSource::with_defaults(Some(7)).unwrap();
        let b = SimulatedSource::with_defaults(Some(7)).unwrap();
        assert_eq!(a.produce().await.unwrap(), b.produce().await.unwrap());
    }

    #[tokio::test]
    async fn weights_are_honoured() {
        let source = SimulatedSource::new(
            default_inventory(),
            StatusWeights::new(0.0, 0.0, 1.0),
            Some(1),
        )
        .unwrap();
        let servers = source.produce().await.unwrap();
        assert!(
            servers
                .iter()
                .flat_map(Server::services)
                .all(|s| s.status == Status::Offline)
        );
    }

    #[tokio::test]
    async fn empty_inventory_is_unavailable() {
        let source = SimulatedSource::new(vec![], StatusWeights::default(), None).unwrap();
        assert!(matches!(
            source.produce().await,
            Err(CoreError::SourceUnavailable { .. })
        ));
    }
}
