//! Engine tunables

use serde::{Deserialize, Serialize};

/// Minimum operator actor version the pricing formulas support
pub const MIN_ACTOR_VERSION: u32 = 16;

/// Growth/decay assumptions used when the target epoch is in the future.
///
/// This is a deterministic placeholder, not an economic model: power
/// grows and reward decays linearly with the projection offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionParams {
    /// Fractional power growth per epoch
    pub power_growth_per_epoch: f64,
    /// Fractional reward decay per epoch
    pub reward_decay_per_epoch: f64,
    /// Lowest reward decay factor, as a fraction of the original
    pub reward_floor: f64,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self {
            power_growth_per_epoch: 0.0001,
            reward_decay_per_epoch: 0.00005,
            reward_floor: 0.1,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub projection: ProjectionParams,
    /// Operators below this actor version fail before pricing
    pub min_actor_version: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            projection: ProjectionParams::default(),
            min_actor_version: MIN_ACTOR_VERSION,
        }
    }
}

impl EngineConfig {
    pub fn with_projection(mut self, projection: ProjectionParams) -> Self {
        self.projection = projection;
        self
    }
}
