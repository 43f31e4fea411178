//! Request orchestration.
//!
//! Drives resolver, projector, fee evaluator and optimizer for a single
//! operator. Batch entry points fan requests out over a
//! [`BatchScheduler`] and turn every failure into result data.

use std::sync::Arc;

use terminator_types::{
    CalculationRequest, CalculationResult, OperatorId, Sector, SectorNumber,
    SectorResult, StrategyResult, StrategyTask, TerminatorError, TerminatorResult,
};
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::fee::{PricingContext, SectorFee, SectorFeeEvaluator};
use crate::projector::project;
use crate::resolver::{resolve_at, target_for, Resolution};
use crate::scheduler::BatchScheduler;
use crate::strategy::StrategyOptimizer;
use crate::traits::{ChainState, PenaltyModel};

#[derive(Clone)]
pub struct TerminationCalculator {
    chain: Arc<dyn ChainState>,
    penalties: Arc<dyn PenaltyModel>,
    config: EngineConfig,
}

impl TerminationCalculator {
    pub fn new(chain: Arc<dyn ChainState>, penalties: Arc<dyn PenaltyModel>) -> Self {
        Self::with_config(chain, penalties, EngineConfig::default())
    }

    pub fn with_config(
        chain: Arc<dyn ChainState>,
        penalties: Arc<dyn PenaltyModel>,
        config: EngineConfig,
    ) -> Self {
        Self { chain, penalties, config }
    }

    pub fn chain(&self) -> &Arc<dyn ChainState> {
        &self.chain
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Load everything pricing needs at a resolved target
    async fn load(
        &self,
        operator: &OperatorId,
        resolution: Resolution,
        filter: Option<&[SectorNumber]>,
    ) -> TerminatorResult<(PricingContext, Vec<Sector>)> {
        let snapshot = &resolution.snapshot;
        let network_version = self.chain.network_version(snapshot).await?;
        let operator_info = self.chain.operator_info(snapshot, operator).await?;
        if operator_info.actor_version < self.config.min_actor_version {
            return Err(TerminatorError::UnsupportedVersion {
                version: operator_info.actor_version,
                minimum: self.config.min_actor_version,
            });
        }

        // an empty selection means every sector
        let filter = filter.filter(|f| !f.is_empty());
        let sectors = self.chain.sectors(snapshot, operator, filter).await?;

        let mut reward = self.chain.reward_signal(snapshot).await?;
        let mut power = self.chain.power_signal(snapshot).await?;
        let offset = resolution.projection_offset();
        if offset > 0 {
            (reward, power) = project(&reward, &power, offset, &self.config.projection);
            debug!(operator = %operator, offset, "Projected network parameters");
        }

        debug!(
            operator = %operator,
            network_version,
            sectors = sectors.len(),
            "Pricing context ready"
        );

        Ok((
            PricingContext {
                resolution,
                network_version,
                operator_info,
                reward,
                power,
            },
            sectors,
        ))
    }

    /// Fill `result` in place so a failure still reports the observed head
    async fn price_into(
        &self,
        request: &CalculationRequest,
        result: &mut CalculationResult,
    ) -> TerminatorResult<()> {
        let head = self.chain.chain_head().await?;
        result.current_epoch = head.epoch;
        result.target_epoch = target_for(request.target_epoch, head.epoch);
        result.is_estimate = result.target_epoch > head.epoch;

        let resolution = resolve_at(self.chain.as_ref(), head, request.target_epoch).await?;

        let (ctx, sectors) = self
            .load(&request.operator, resolution, request.sectors.as_deref())
            .await?;

        let evaluator = SectorFeeEvaluator::new(self.penalties.as_ref(), &ctx);
        let sector_results = sectors
            .iter()
            .map(|sector| {
                Ok(match evaluator.evaluate(sector)? {
                    SectorFee::Expired { expired_days } => {
                        SectorResult::expired(sector.number, expired_days)
                    }
                    SectorFee::Active(active) => {
                        SectorResult::active(sector.number, active.termination_fee, active.age)
                    }
                })
            })
            .collect::<TerminatorResult<Vec<_>>>()?;

        let done = std::mem::replace(
            result,
            CalculationResult::new(request.operator.clone(), request.target_epoch),
        );
        *result = done.with_sector_results(sector_results);
        info!(
            operator = %result.operator,
            total = result.total_sectors,
            active = result.active_sectors,
            expired = result.expired_sectors,
            fee = %result.total_fee,
            "Calculation complete"
        );
        Ok(())
    }

    /// Price one request; any failure fails the whole request.
    #[instrument(skip(self, request), fields(operator = %request.operator, epoch = request.target_epoch))]
    pub async fn calculate_one(
        &self,
        request: &CalculationRequest,
    ) -> TerminatorResult<CalculationResult> {
        let mut result = CalculationResult::new(request.operator.clone(), request.target_epoch);
        self.price_into(request, &mut result).await?;
        Ok(result)
    }

    /// Price one request, capturing a failure in the result's error field
    #[instrument(skip(self, request), fields(operator = %request.operator, epoch = request.target_epoch))]
    pub async fn calculate(&self, request: &CalculationRequest) -> CalculationResult {
        let mut result = CalculationResult::new(request.operator.clone(), request.target_epoch);
        match self.price_into(request, &mut result).await {
            Ok(()) => result,
            Err(e) => {
                warn!(error = %e, "Calculation failed");
                result.failed(e)
            }
        }
    }

    /// Optimize one operator. Sector pricing failures are omitted, any
    /// other failure is captured in the result's error field.
    #[instrument(skip(self, task), fields(operator = %task.operator, epoch = task.termination_epoch))]
    pub async fn strategy(&self, task: &StrategyTask) -> StrategyResult {
        let mut result = StrategyResult::new(task);
        let head = match self.chain.chain_head().await {
            Ok(head) => head,
            Err(e) => {
                warn!(error = %e, "Strategy failed");
                return result.failed(e);
            }
        };
        result.current_epoch = head.epoch;
        result.termination_epoch = target_for(task.termination_epoch, head.epoch);
        result.is_estimate = result.termination_epoch > head.epoch;

        let resolution = match resolve_at(self.chain.as_ref(), head, task.termination_epoch).await {
            Ok(resolution) => resolution,
            Err(e) => {
                warn!(error = %e, "Strategy failed");
                return result.failed(e);
            }
        };

        let (ctx, sectors) = match self.load(&task.operator, resolution, None).await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(error = %e, "Strategy failed");
                return result.failed(e);
            }
        };

        let evaluator = SectorFeeEvaluator::new(self.penalties.as_ref(), &ctx);
        let priced = sectors.into_iter().map(|sector| {
            let fee = evaluator.evaluate(&sector);
            (sector, fee)
        });
        let result = StrategyOptimizer::new(task.threshold_days).aggregate(result, priced);

        info!(
            terminate = result.terminate_sectors,
            expire = result.expire_sectors,
            expired = result.expired_sectors,
            omitted = result.omitted_sectors,
            fee = %result.total_fee,
            "Strategy complete"
        );
        result
    }

    /// Price many requests concurrently; output order matches input
    pub async fn calculate_batch(
        &self,
        scheduler: &BatchScheduler,
        requests: Vec<CalculationRequest>,
    ) -> Vec<CalculationResult> {
        let identities: Vec<_> = requests
            .iter()
            .map(|r| (r.operator.clone(), r.target_epoch))
            .collect();
        let calculator = self.clone();
        let outcomes = scheduler
            .run(requests, move |request| {
                let calculator = calculator.clone();
                async move { calculator.calculate(&request).await }
            })
            .await;

        outcomes
            .into_iter()
            .zip(identities)
            .map(|(outcome, (operator, epoch))| {
                outcome.unwrap_or_else(|e| CalculationResult::new(operator, epoch).failed(e))
            })
            .collect()
    }

    /// Optimize many operators concurrently; output order matches input
    pub async fn strategy_batch(
        &self,
        scheduler: &BatchScheduler,
        tasks: Vec<StrategyTask>,
    ) -> Vec<StrategyResult> {
        let originals = tasks.clone();
        let calculator = self.clone();
        let outcomes = scheduler
            .run(tasks, move |task| {
                let calculator = calculator.clone();
                async move { calculator.strategy(&task).await }
            })
            .await;

        outcomes
            .into_iter()
            .zip(originals)
            .map(|(outcome, task)| outcome.unwrap_or_else(|e| StrategyResult::new(&task).failed(e)))
            .collect()
    }
}
