//! Per-sector fee evaluation.

use terminator_types::{
    ChainEpoch, NetworkVersion, OperatorInfo, Sector, SmoothedEstimate, TerminatorResult,
    TokenAmount, EPOCHS_IN_DAY,
};

use crate::resolver::Resolution;
use crate::traits::PenaltyModel;

/// Everything needed to price sectors of one operator at one epoch.
///
/// `reward` and `power` are already projected when the resolution is an
/// estimate.
#[derive(Debug, Clone)]
pub struct PricingContext {
    pub resolution: Resolution,
    pub network_version: NetworkVersion,
    pub operator_info: OperatorInfo,
    pub reward: SmoothedEstimate,
    pub power: SmoothedEstimate,
}

impl PricingContext {
    pub fn target_epoch(&self) -> ChainEpoch {
        self.resolution.target_epoch
    }
}

/// Costs of an active sector at the target epoch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSectorFee {
    /// Epochs since activation
    pub age: ChainEpoch,
    /// Continued-fault fee, per day
    pub accrual_rate: TokenAmount,
    pub termination_fee: TokenAmount,
    /// Epochs left until natural expiration, always positive
    pub remaining_epochs: ChainEpoch,
}

impl ActiveSectorFee {
    pub fn remaining_days(&self) -> f64 {
        self.remaining_epochs as f64 / EPOCHS_IN_DAY as f64
    }

    /// Accrual paid while waiting for expiration, over whole remaining days
    pub fn expiration_cost(&self) -> TokenAmount {
        &self.accrual_rate * (self.remaining_epochs / EPOCHS_IN_DAY)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectorFee {
    /// Target is at or past expiration; nothing is priced
    Expired { expired_days: f64 },
    Active(ActiveSectorFee),
}

/// Prices single sectors against a [`PricingContext`]
pub struct SectorFeeEvaluator<'a> {
    penalties: &'a dyn PenaltyModel,
    context: &'a PricingContext,
}

impl<'a> SectorFeeEvaluator<'a> {
    pub fn new(penalties: &'a dyn PenaltyModel, context: &'a PricingContext) -> Self {
        Self { penalties, context }
    }

    /// Penalty function failures propagate; a fee is never zeroed out.
    pub fn evaluate(&self, sector: &Sector) -> TerminatorResult<SectorFee> {
        let target = self.context.target_epoch();
        if sector.is_expired_at(target) {
            let expired_days = (target - sector.expiration) as f64 / EPOCHS_IN_DAY as f64;
            return Ok(SectorFee::Expired { expired_days });
        }

        let age = target - sector.activation;
        let version = self.context.network_version;
        let accrual_rate = self.penalties.continued_fault_fee(
            version,
            &self.context.reward,
            &self.context.power,
            &sector.qa_power,
        )?;
        let termination_fee =
            self.penalties
                .termination_fee(version, &sector.initial_pledge, age, &accrual_rate)?;

        Ok(SectorFee::Active(ActiveSectorFee {
            age,
            accrual_rate,
            termination_fee,
            remaining_epochs: sector.expiration - target,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::FixedPenalties;
    use crate::resolver::ResolutionMode;
    use num_bigint::BigInt;
    use terminator_types::{SnapshotHandle, TerminatorError};

    fn context(target: ChainEpoch) -> PricingContext {
        PricingContext {
            resolution: Resolution {
                target_epoch: target,
                current_epoch: target,
                snapshot: SnapshotHandle::new(target, vec![]),
                mode: ResolutionMode::Historical,
            },
            network_version: 25,
            operator_info: OperatorInfo { sector_size: 32 << 30, actor_version: 16 },
            reward: SmoothedEstimate::new(1000, 0),
            power: SmoothedEstimate::new(100, 0),
        }
    }

    fn sector(activation: ChainEpoch, expiration: ChainEpoch) -> Sector {
        Sector {
            number: 9,
            activation,
            expiration,
            initial_pledge: TokenAmount::from_atto(10_000),
            qa_power: BigInt::from(4),
        }
    }

    #[test]
    fn test_expired_sector_is_not_priced() {
        let ctx = context(10 * EPOCHS_IN_DAY);
        let penalties = FixedPenalties::new(10);
        let fee = SectorFeeEvaluator::new(&penalties, &ctx)
            .evaluate(&sector(0, 7 * EPOCHS_IN_DAY))
            .unwrap();
        assert_eq!(fee, SectorFee::Expired { expired_days: 3.0 });

        // exactly at expiration counts as expired
        let fee = SectorFeeEvaluator::new(&penalties, &ctx)
            .evaluate(&sector(0, 10 * EPOCHS_IN_DAY))
            .unwrap();
        assert_eq!(fee, SectorFee::Expired { expired_days: 0.0 });
    }

    #[test]
    fn test_active_sector_fee() {
        let ctx = context(1000);
        let penalties = FixedPenalties::new(10);
        let fee = SectorFeeEvaluator::new(&penalties, &ctx)
            .evaluate(&sector(400, 1000 + 2 * EPOCHS_IN_DAY + 5))
            .unwrap();

        let SectorFee::Active(active) = fee else { panic!("expected active fee") };
        assert_eq!(active.age, 600);
        // 1000 * 4 / 100
        assert_eq!(active.accrual_rate, TokenAmount::from_atto(40));
        // 10% of pledge plus the fault fee
        assert_eq!(active.termination_fee, TokenAmount::from_atto(1040));
        assert_eq!(active.remaining_epochs, 2 * EPOCHS_IN_DAY + 5);
        // partial days are not charged
        assert_eq!(active.expiration_cost(), TokenAmount::from_atto(80));
    }

    #[test]
    fn test_penalty_failure_propagates() {
        let ctx = context(1000);
        let penalties = FixedPenalties::new(10).fail_on_qa_power(BigInt::from(4));
        let err = SectorFeeEvaluator::new(&penalties, &ctx)
            .evaluate(&sector(0, 5000))
            .unwrap_err();
        assert!(matches!(err, TerminatorError::ExternalCallFailure(_)));
    }
}
