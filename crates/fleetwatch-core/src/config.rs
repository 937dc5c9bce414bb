// ── Runtime engine configuration ──
//
// These types describe *how* the engine behaves: cache lifetime, poll
// cadence, reboot timing, simulation weights. They never touch disk;
// `fleetwatch-config` builds a `FleetConfig` from files and env and
// hands it in.

use std::time::Duration;

use crate::error::CoreError;
use crate::model::{StatusDistribution, StatusWeights};

/// Timing and outcome weights of the simulated reboot sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RebootPolicy {
    /// Time between the offline phase and the completion phase.
    pub delay: Duration,
    pub online_weight: f64,
    pub warning_weight: f64,
}

impl RebootPolicy {
    /// Distribution used when services come back after a reboot.
    /// Never yields `offline`.
    pub fn distribution(&self) -> Result<StatusDistribution, CoreError> {
        StatusWeights::new(self.online_weight, self.warning_weight, 0.0).distribution()
    }
}

impl Default for RebootPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            online_weight: 0.9,
            warning_weight: 0.1,
        }
    }
}

/// Configuration for a single fleet engine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct FleetConfig {
    /// Maximum age of a cached snapshot before `get` refreshes it.
    pub cache_ttl: Duration,
    /// Background refresh cadence. `Duration::ZERO` disables the poller.
    pub refresh_interval: Duration,
    pub reboot: RebootPolicy,
    /// Status weights used by the simulated source.
    pub simulation: StatusWeights,
    /// Upper bound for every remote command issued by the live source.
    pub remote_timeout: Duration,
    /// Per-subscriber buffer of the change notifier.
    pub event_capacity: usize,
    /// Fixed RNG seed for reproducible simulation and reboot outcomes.
    pub rng_seed: Option<u64>,
}

impl FleetConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        self.simulation.distribution()?;
        self.reboot.distribution()?;
        if self.event_capacity == 0 {
            return Err(CoreError::ValidationFailed {
                message: "event_capacity must be at least 1".into(),
            });
        }
        if self.remote_timeout.is_zero() {
            return Err(CoreError::ValidationFailed {
                message: "remote_timeout must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(60),
            refresh_interval: Duration::from_secs(30),
            reboot: RebootPolicy::default(),
            simulation: StatusWeights::default(),
            remote_timeout: Duration::from_secs(30),
            event_capacity: 256,
            rng_seed: None,
        }
    }
}
