//! Batch and fleet-wide aggregation.

use serde::{Deserialize, Serialize};
use terminator_types::{CalculationResult, StrategyResult, TokenAmount};

/// Totals over a batch of calculations; failed rows are excluded from fees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_fee: TokenAmount,
}

impl BatchSummary {
    pub fn from_results(results: &[CalculationResult]) -> Self {
        let successful: Vec<_> = results.iter().filter(|r| r.is_success()).collect();
        Self {
            processed: results.len(),
            successful: successful.len(),
            failed: results.len() - successful.len(),
            total_fee: successful.iter().map(|r| &r.total_fee).sum(),
        }
    }
}

/// Totals over a batch of strategy results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSummary {
    pub operators: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_sectors: usize,
    pub expired_sectors: usize,
    pub terminate_sectors: usize,
    pub expire_sectors: usize,
    pub omitted_sectors: usize,
    pub termination_fee: TokenAmount,
    pub expiration_fee: TokenAmount,
    pub total_fee: TokenAmount,
    /// What terminating every priced sector would have cost
    pub all_terminate_cost: TokenAmount,
}

impl FleetSummary {
    pub fn from_results(results: &[StrategyResult]) -> Self {
        let mut summary = Self {
            operators: results.len(),
            successful: 0,
            failed: 0,
            total_sectors: 0,
            expired_sectors: 0,
            terminate_sectors: 0,
            expire_sectors: 0,
            omitted_sectors: 0,
            termination_fee: TokenAmount::zero(),
            expiration_fee: TokenAmount::zero(),
            total_fee: TokenAmount::zero(),
            all_terminate_cost: TokenAmount::zero(),
        };

        for result in results {
            if !result.is_success() {
                summary.failed += 1;
                continue;
            }
            summary.successful += 1;
            summary.total_sectors += result.total_sectors;
            summary.expired_sectors += result.expired_sectors;
            summary.terminate_sectors += result.terminate_sectors;
            summary.expire_sectors += result.expire_sectors;
            summary.omitted_sectors += result.omitted_sectors;
            summary.termination_fee += &result.termination_fee;
            summary.expiration_fee += &result.expiration_fee;
            summary.total_fee += &result.total_fee;
            summary.all_terminate_cost += &result.all_terminate_cost();
        }
        summary
    }

    /// Share of non-expired sectors that should be terminated
    pub fn terminate_percent(&self) -> f64 {
        percent(self.terminate_sectors, self.terminate_sectors + self.expire_sectors)
    }

    pub fn expire_percent(&self) -> f64 {
        percent(self.expire_sectors, self.terminate_sectors + self.expire_sectors)
    }

    pub fn termination_fee_percent(&self) -> f64 {
        self.termination_fee.percent_of(&self.total_fee)
    }

    pub fn expiration_fee_percent(&self) -> f64 {
        self.expiration_fee.percent_of(&self.total_fee)
    }

    /// Saving over terminating everything, only when there is one
    pub fn savings(&self) -> Option<TokenAmount> {
        let savings = &self.all_terminate_cost - &self.total_fee;
        savings.is_positive().then_some(savings)
    }

    pub fn savings_percent(&self) -> f64 {
        self.savings()
            .map(|s| s.percent_of(&self.all_terminate_cost))
            .unwrap_or(0.0)
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}
