//! Network parameter projection for future target epochs.

use terminator_types::{ChainEpoch, SmoothedEstimate};

use crate::config::ProjectionParams;

/// Project reward and power signals `offset` epochs ahead.
///
/// Power grows by `1 + g·offset`, reward decays by `1 - d·offset` floored
/// at `reward_floor`. Both factors are truncated to thousandths before
/// being applied so results are reproducible. Non-positive offsets
/// return the inputs unchanged.
pub fn project(
    reward: &SmoothedEstimate,
    power: &SmoothedEstimate,
    offset: ChainEpoch,
    params: &ProjectionParams,
) -> (SmoothedEstimate, SmoothedEstimate) {
    if offset <= 0 {
        return (reward.clone(), power.clone());
    }

    let offset = offset as f64;
    let growth = 1.0 + params.power_growth_per_epoch * offset;
    let decay = (1.0 - params.reward_decay_per_epoch * offset).max(params.reward_floor);

    let growth_milli = to_milli(growth);
    let decay_milli = to_milli(decay);

    (reward.scale_milli(decay_milli), power.scale_milli(growth_milli))
}

fn to_milli(factor: f64) -> i64 {
    (factor * 1000.0).trunc() as i64
}
