//! Terminate-vs-expire strategy task and result types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::epoch::ChainEpoch;
use crate::operator::OperatorId;
use crate::sector::SectorNumber;
use crate::token::TokenAmount;
use crate::TerminatorError;

/// One operator to optimize at a shared termination epoch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyTask {
    pub operator: OperatorId,
    /// `0` means "current head"
    pub termination_epoch: ChainEpoch,
    /// Sectors expiring within this many days are left to expire;
    /// `0` disables optimization and terminates everything
    pub threshold_days: u32,
}

/// Recommended disposal of one sector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectorAction {
    Terminate,
    Expire,
}

impl fmt::Display for SectorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectorAction::Terminate => write!(f, "terminate"),
            SectorAction::Expire => write!(f, "expire"),
        }
    }
}

/// Both costs of a sector and the chosen action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorStrategy {
    pub sector: SectorNumber,
    pub expiration: ChainEpoch,
    pub remaining_days: f64,
    pub action: SectorAction,
    /// Lump penalty if terminated at the target epoch
    pub termination_fee: TokenAmount,
    /// Continued-fault fee, charged per day while waiting for expiration
    pub accrual_rate: TokenAmount,
    /// `accrual_rate * whole remaining days`
    pub expiration_cost: TokenAmount,
    /// Cost of the chosen action
    pub recommended_fee: TokenAmount,
}

/// A sector that could not be priced and is excluded from totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorOmission {
    pub sector: SectorNumber,
    pub error: TerminatorError,
}

/// Outcome of optimizing one operator.
///
/// Invariants: `terminate_sectors + expire_sectors <= total_sectors`,
/// `terminate + expire + expired + omitted == total_sectors` and
/// `total_fee == termination_fee + expiration_fee`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyResult {
    pub operator: OperatorId,
    pub termination_epoch: ChainEpoch,
    pub current_epoch: ChainEpoch,
    pub is_estimate: bool,
    pub threshold_days: u32,
    pub total_sectors: usize,
    pub expired_sectors: usize,
    pub terminate_sectors: usize,
    pub expire_sectors: usize,
    pub omitted_sectors: usize,
    pub termination_fee: TokenAmount,
    pub expiration_fee: TokenAmount,
    pub total_fee: TokenAmount,
    pub sector_details: Vec<SectorStrategy>,
    pub omissions: Vec<SectorOmission>,
    pub error: Option<TerminatorError>,
}

impl StrategyResult {
    pub fn new(task: &StrategyTask) -> Self {
        Self {
            operator: task.operator.clone(),
            termination_epoch: task.termination_epoch,
            current_epoch: 0,
            is_estimate: false,
            threshold_days: task.threshold_days,
            total_sectors: 0,
            expired_sectors: 0,
            terminate_sectors: 0,
            expire_sectors: 0,
            omitted_sectors: 0,
            termination_fee: TokenAmount::zero(),
            expiration_fee: TokenAmount::zero(),
            total_fee: TokenAmount::zero(),
            sector_details: Vec::new(),
            omissions: Vec::new(),
            error: None,
        }
    }

    pub fn failed(mut self, error: TerminatorError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn status(&self) -> &'static str {
        if self.is_success() {
            "success"
        } else {
            "failed"
        }
    }

    /// Hypothetical cost of terminating every priced sector
    pub fn all_terminate_cost(&self) -> TokenAmount {
        self.sector_details.iter().map(|d| &d.termination_fee).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_display() {
        assert_eq!(SectorAction::Terminate.to_string(), "terminate");
        assert_eq!(SectorAction::Expire.to_string(), "expire");
        assert_eq!(serde_json::to_string(&SectorAction::Expire).unwrap(), "\"expire\"");
    }

    #[test]
    fn test_new_result_is_empty_success() {
        let task = StrategyTask {
            operator: OperatorId::parse("f01234").unwrap(),
            termination_epoch: 10,
            threshold_days: 7,
        };
        let result = StrategyResult::new(&task);
        assert!(result.is_success());
        assert_eq!(result.threshold_days, 7);
        assert!(result.all_terminate_cost().is_zero());
    }
}
