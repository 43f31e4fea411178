//! Terminate-vs-expire optimizer.

use terminator_types::{
    ChainEpoch, Sector, SectorAction, SectorOmission, SectorStrategy, StrategyResult,
    TerminatorError, TerminatorResult, EPOCHS_IN_DAY,
};
use tracing::warn;

use crate::fee::SectorFee;

/// Choose the action for a sector with `remaining` epochs to expiration.
///
/// A zero threshold always terminates. Otherwise sectors expiring within
/// the threshold, boundary included, are left to expire.
pub fn decide(threshold_days: u32, remaining: ChainEpoch) -> SectorAction {
    if threshold_days == 0 {
        return SectorAction::Terminate;
    }
    let threshold_epochs = ChainEpoch::from(threshold_days) * EPOCHS_IN_DAY;
    if remaining <= threshold_epochs {
        SectorAction::Expire
    } else {
        SectorAction::Terminate
    }
}

/// Folds priced sectors of one operator into a [`StrategyResult`]
#[derive(Debug, Clone, Copy)]
pub struct StrategyOptimizer {
    threshold_days: u32,
}

impl StrategyOptimizer {
    pub fn new(threshold_days: u32) -> Self {
        Self { threshold_days }
    }

    pub fn threshold_days(&self) -> u32 {
        self.threshold_days
    }

    /// Aggregate per-sector outcomes.
    ///
    /// Expired sectors are only counted. Sectors whose pricing failed are
    /// omitted from totals and recorded as `AggregationSkipped`.
    pub fn aggregate<I>(&self, mut result: StrategyResult, priced: I) -> StrategyResult
    where
        I: IntoIterator<Item = (Sector, TerminatorResult<SectorFee>)>,
    {
        for (sector, fee) in priced {
            result.total_sectors += 1;

            let active = match fee {
                Ok(SectorFee::Expired { .. }) => {
                    result.expired_sectors += 1;
                    continue;
                }
                Ok(SectorFee::Active(active)) => active,
                Err(e) => {
                    warn!(
                        operator = %result.operator,
                        sector = sector.number,
                        error = %e,
                        "Sector omitted from strategy totals"
                    );
                    result.omitted_sectors += 1;
                    result.omissions.push(SectorOmission {
                        sector: sector.number,
                        error: TerminatorError::AggregationSkipped {
                            sector: sector.number,
                            reason: e.to_string(),
                        },
                    });
                    continue;
                }
            };

            let action = decide(self.threshold_days, active.remaining_epochs);
            let expiration_cost = active.expiration_cost();
            let recommended_fee = match action {
                SectorAction::Terminate => {
                    result.terminate_sectors += 1;
                    result.termination_fee += &active.termination_fee;
                    active.termination_fee.clone()
                }
                SectorAction::Expire => {
                    result.expire_sectors += 1;
                    result.expiration_fee += &expiration_cost;
                    expiration_cost.clone()
                }
            };

            result.sector_details.push(SectorStrategy {
                sector: sector.number,
                expiration: sector.expiration,
                remaining_days: active.remaining_days(),
                action,
                termination_fee: active.termination_fee,
                accrual_rate: active.accrual_rate,
                expiration_cost,
                recommended_fee,
            });
        }

        result.total_fee = &result.termination_fee + &result.expiration_fee;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fee::ActiveSectorFee;
    use num_bigint::BigInt;
    use terminator_types::{OperatorId, StrategyTask, TokenAmount};

    fn sector(number: u64, expiration: ChainEpoch) -> Sector {
        Sector {
            number,
            activation: 0,
            expiration,
            initial_pledge: TokenAmount::from_whole(1),
            qa_power: BigInt::from(1),
        }
    }

    fn active(remaining_epochs: ChainEpoch) -> TerminatorResult<SectorFee> {
        Ok(SectorFee::Active(ActiveSectorFee {
            age: 100,
            accrual_rate: TokenAmount::from_atto(10),
            termination_fee: TokenAmount::from_atto(1000),
            remaining_epochs,
        }))
    }

    fn empty_result(threshold_days: u32) -> StrategyResult {
        StrategyResult::new(&StrategyTask {
            operator: OperatorId::parse("f01000").unwrap(),
            termination_epoch: 0,
            threshold_days,
        })
    }

    #[test]
    fn test_zero_threshold_always_terminates() {
        assert_eq!(decide(0, 1), SectorAction::Terminate);
        assert_eq!(decide(0, 0), SectorAction::Terminate);
    }

    #[test]
    fn test_threshold_boundary_resolves_to_expire() {
        let t = 7 * EPOCHS_IN_DAY;
        assert_eq!(decide(7, t - 1), SectorAction::Expire);
        assert_eq!(decide(7, t), SectorAction::Expire);
        assert_eq!(decide(7, t + 1), SectorAction::Terminate);
    }

    #[test]
    fn test_aggregate_totals() {
        let optimizer = StrategyOptimizer::new(7);
        let result = optimizer.aggregate(
            empty_result(7),
            vec![
                (sector(1, 0), Ok(SectorFee::Expired { expired_days: 1.0 })),
                (sector(2, 0), active(3 * EPOCHS_IN_DAY)),
                (sector(3, 0), active(300 * EPOCHS_IN_DAY)),
            ],
        );

        assert_eq!(result.total_sectors, 3);
        assert_eq!(result.expired_sectors, 1);
        assert_eq!(result.expire_sectors, 1);
        assert_eq!(result.terminate_sectors, 1);
        assert_eq!(result.expiration_fee, TokenAmount::from_atto(30));
        assert_eq!(result.termination_fee, TokenAmount::from_atto(1000));
        assert_eq!(result.total_fee, TokenAmount::from_atto(1030));
        assert_eq!(result.all_terminate_cost(), TokenAmount::from_atto(2000));
        assert_eq!(result.sector_details[0].recommended_fee, TokenAmount::from_atto(30));
    }

    #[test]
    fn test_failed_sector_is_omitted() {
        let optimizer = StrategyOptimizer::new(7);
        let result = optimizer.aggregate(
            empty_result(7),
            vec![
                (sector(1, 0), active(300 * EPOCHS_IN_DAY)),
                (sector(2, 0), Err(TerminatorError::external("penalty lookup failed"))),
            ],
        );

        assert!(result.is_success());
        assert_eq!(result.total_sectors, 2);
        assert_eq!(result.omitted_sectors, 1);
        assert_eq!(result.omissions[0].sector, 2);
        assert_eq!(result.omissions[0].error.kind(), "aggregation_skipped");
        assert_eq!(
            result.terminate_sectors
                + result.expire_sectors
                + result.expired_sectors
                + result.omitted_sectors,
            result.total_sectors
        );
        assert_eq!(result.total_fee, TokenAmount::from_atto(1000));
    }
}
