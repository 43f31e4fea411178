//! Sector expiration distribution across operators.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use terminator_types::{ChainEpoch, OperatorId, TerminatorError, TerminatorResult, EPOCHS_IN_DAY};
use tracing::{info, warn};

use crate::resolver::resolve;
use crate::scheduler::BatchScheduler;
use crate::traits::ChainState;

/// Sector counts keyed by whole days from the reference epoch to
/// expiration; negative keys are already expired
pub type DayBuckets = BTreeMap<i64, usize>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorExpiration {
    pub operator: OperatorId,
    pub total_sectors: usize,
    pub buckets: DayBuckets,
}

/// One day of the fleet-wide distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayStats {
    pub sectors: usize,
    /// Sector count per contributing operator
    pub operators: BTreeMap<OperatorId, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpirationDistribution {
    pub reference_epoch: ChainEpoch,
    /// Operators that were scanned, in input order
    pub operators: Vec<OperatorExpiration>,
    /// Operators that could not be scanned, in input order
    pub failures: Vec<(OperatorId, TerminatorError)>,
    pub overall: BTreeMap<i64, DayStats>,
}

/// Whole days until expiration, truncated toward zero
pub fn days_until(expiration: ChainEpoch, reference: ChainEpoch) -> i64 {
    (expiration - reference) / EPOCHS_IN_DAY
}

/// Bucket one operator's sectors at an already-resolved reference epoch
pub async fn scan_operator(
    chain: &dyn ChainState,
    operator: &OperatorId,
    reference_epoch: ChainEpoch,
) -> TerminatorResult<OperatorExpiration> {
    let resolution = resolve(chain, reference_epoch).await?;
    let sectors = chain.sectors(&resolution.snapshot, operator, None).await?;

    let mut buckets = DayBuckets::new();
    for sector in &sectors {
        *buckets
            .entry(days_until(sector.expiration, resolution.target_epoch))
            .or_default() += 1;
    }

    Ok(OperatorExpiration {
        operator: operator.clone(),
        total_sectors: sectors.len(),
        buckets,
    })
}

impl ExpirationDistribution {
    /// Scan every operator over the scheduler.
    ///
    /// `reference_epoch == 0` means the current head. Operators that fail
    /// are logged and left out of the aggregate.
    pub async fn collect(
        chain: Arc<dyn ChainState>,
        scheduler: &BatchScheduler,
        operators: Vec<OperatorId>,
        reference_epoch: ChainEpoch,
    ) -> TerminatorResult<Self> {
        let reference_epoch = if reference_epoch == 0 {
            chain.chain_head().await?.epoch
        } else {
            reference_epoch
        };
        info!(operators = operators.len(), reference_epoch, "Scanning sector expirations");

        let originals = operators.clone();
        let outcomes = scheduler
            .run(operators, move |operator| {
                let chain = Arc::clone(&chain);
                async move { scan_operator(chain.as_ref(), &operator, reference_epoch).await }
            })
            .await;

        let mut distribution = Self {
            reference_epoch,
            operators: Vec::new(),
            failures: Vec::new(),
            overall: BTreeMap::new(),
        };
        for (outcome, operator) in outcomes.into_iter().zip(originals) {
            match outcome.into_result().and_then(|r| r) {
                Ok(scanned) => distribution.add(scanned),
                Err(e) => {
                    warn!(operator = %operator, error = %e, "Failed to scan operator");
                    distribution.failures.push((operator, e));
                }
            }
        }
        Ok(distribution)
    }

    fn add(&mut self, scanned: OperatorExpiration) {
        for (day, count) in &scanned.buckets {
            let stats = self.overall.entry(*day).or_insert_with(|| DayStats {
                sectors: 0,
                operators: BTreeMap::new(),
            });
            stats.sectors += count;
            stats.operators.insert(scanned.operator.clone(), *count);
        }
        self.operators.push(scanned);
    }

    pub fn total_sectors(&self) -> usize {
        self.overall.values().map(|s| s.sectors).sum()
    }
}
