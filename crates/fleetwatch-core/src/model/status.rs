// ── Service status and weighted status draws ──

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::CoreError;

/// Observed state of a single service.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Status {
    Online,
    Warning,
    Offline,
}

impl Status {
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// Relative weights for a random status draw.
///
/// Weights need not sum to one; they are normalised on use. At least one
/// weight must be positive and none may be negative or NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusWeights {
    pub online: f64,
    pub warning: f64,
    pub offline: f64,
}

impl StatusWeights {
    pub const fn new(online: f64, warning: f64, offline: f64) -> Self {
        Self {
            online,
            warning,
            offline,
        }
    }

    /// Build the sampling distribution, rejecting unusable weights.
    pub fn distribution(&self) -> Result<StatusDistribution, CoreError> {
        let weights = [self.online, self.warning, self.offline];
        if weights.iter().any(|w| w.is_nan() || *w < 0.0) {
            return Err(CoreError::ValidationFailed {
                message: format!("status weights must be non-negative numbers, got {weights:?}"),
            });
        }
        let index = WeightedIndex::new(weights).map_err(|e| CoreError::ValidationFailed {
            message: format!("invalid status weights {weights:?}: {e}"),
        })?;
        Ok(StatusDistribution { index })
    }
}

impl Default for StatusWeights {
    fn default() -> Self {
        Self::new(0.8, 0.15, 0.05)
    }
}

/// Precomputed weighted distribution over [`Status`].
#[derive(Debug, Clone)]
pub struct StatusDistribution {
    index: WeightedIndex<f64>,
}

impl StatusDistribution {
    const CHOICES: [Status; 3] = [Status::Online, Status::Warning, Status::Offline];

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Status {
        Self::CHOICES
            .get(self.index.sample(rng))
            .copied()
            .unwrap_or(Status::Online)
    }
}
