//! Termination fee calculation request and result.

use serde::{Deserialize, Serialize};

use crate::epoch::ChainEpoch;
use crate::operator::OperatorId;
use crate::sector::SectorNumber;
use crate::token::TokenAmount;
use crate::TerminatorError;

/// What to price: one operator at one target epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub operator: OperatorId,
    /// `0` means "current head"
    pub target_epoch: ChainEpoch,
    /// `None` prices every sector the operator has
    pub sectors: Option<Vec<SectorNumber>>,
}

impl CalculationRequest {
    pub fn all_sectors(operator: OperatorId, target_epoch: ChainEpoch) -> Self {
        Self {
            operator,
            target_epoch,
            sectors: None,
        }
    }

    pub fn with_sectors(mut self, sectors: Vec<SectorNumber>) -> Self {
        self.sectors = Some(sectors);
        self
    }
}

/// Pricing of a single sector at the target epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorResult {
    pub sector: SectorNumber,
    /// Zero for expired sectors
    pub fee: TokenAmount,
    /// Epochs since activation (zero for expired sectors)
    pub age: ChainEpoch,
    pub expired: bool,
    /// Whole-epoch distance past expiration, expressed in days
    pub expired_days: Option<f64>,
}

impl SectorResult {
    pub fn active(sector: SectorNumber, fee: TokenAmount, age: ChainEpoch) -> Self {
        Self {
            sector,
            fee,
            age,
            expired: false,
            expired_days: None,
        }
    }

    pub fn expired(sector: SectorNumber, expired_days: f64) -> Self {
        Self {
            sector,
            fee: TokenAmount::zero(),
            age: 0,
            expired: true,
            expired_days: Some(expired_days),
        }
    }
}

/// Outcome of pricing one operator.
///
/// Invariants: `active_sectors + expired_sectors == total_sectors` and
/// `total_fee` is the sum of fees over non-expired sector results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub operator: OperatorId,
    pub target_epoch: ChainEpoch,
    /// Chain head observed when the request ran
    pub current_epoch: ChainEpoch,
    pub is_estimate: bool,
    pub total_sectors: usize,
    pub active_sectors: usize,
    pub expired_sectors: usize,
    pub total_fee: TokenAmount,
    pub sector_results: Vec<SectorResult>,
    pub error: Option<TerminatorError>,
}

impl CalculationResult {
    /// Empty result carrying only identity, filled in as pricing proceeds
    pub fn new(operator: OperatorId, target_epoch: ChainEpoch) -> Self {
        Self {
            operator,
            target_epoch,
            current_epoch: 0,
            is_estimate: false,
            total_sectors: 0,
            active_sectors: 0,
            expired_sectors: 0,
            total_fee: TokenAmount::zero(),
            sector_results: Vec::new(),
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

    /// Assemble totals from per-sector results
    pub fn with_sector_results(mut self, sector_results: Vec<SectorResult>) -> Self {
        self.total_sectors = sector_results.len();
        self.expired_sectors = sector_results.iter().filter(|r| r.expired).count();
        self.active_sectors = self.total_sectors - self.expired_sectors;
        self.total_fee = sector_results.iter().filter(|r| !r.expired).map(|r| &r.fee).sum();
        self.sector_results = sector_results;
        self
    }

    pub fn status(&self) -> &'static str {
        if self.is_success() {
            "success"
        } else {
            "failed"
        }
    }
}
