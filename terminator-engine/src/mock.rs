//! In-memory collaborators for tests and offline runs.
//!
//! [`MockChain`] serves fixed operator data at any snapshot at or below
//! its head, with injectable failures and latency. [`FixedPenalties`] is
//! a penalty model with trivially checkable arithmetic.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use num_traits::Zero;
use terminator_types::{
    mainnet_genesis, ChainEpoch, NetworkVersion, OperatorId, OperatorInfo, Sector, SectorNumber,
    SmoothedEstimate, SnapshotHandle, TerminatorError, TerminatorResult, TokenAmount,
};

use crate::traits::{ChainState, PenaltyModel};

#[derive(Debug, Clone)]
struct MockOperator {
    info: OperatorInfo,
    sectors: Vec<Sector>,
}

#[derive(Debug, Clone)]
pub struct MockChain {
    head: ChainEpoch,
    genesis: DateTime<Utc>,
    network_version: NetworkVersion,
    reward: SmoothedEstimate,
    power: SmoothedEstimate,
    operators: HashMap<OperatorId, MockOperator>,
    missing_snapshots: HashSet<ChainEpoch>,
    failing_operators: HashMap<OperatorId, TerminatorError>,
    latency: HashMap<OperatorId, Duration>,
}

impl MockChain {
    pub fn builder() -> MockChainBuilder {
        MockChainBuilder::default()
    }

    fn operator(&self, operator: &OperatorId) -> TerminatorResult<&MockOperator> {
        if let Some(err) = self.failing_operators.get(operator) {
            return Err(err.clone());
        }
        self.operators
            .get(operator)
            .ok_or_else(|| TerminatorError::external(format!("actor {} not found", operator)))
    }

    fn check_snapshot(&self, snapshot: &SnapshotHandle) -> TerminatorResult<()> {
        if snapshot.epoch > self.head {
            return Err(TerminatorError::external(format!(
                "unknown snapshot at epoch {}",
                snapshot.epoch
            )));
        }
        Ok(())
    }
}

/// Builder for [`MockChain`]
#[derive(Debug, Clone)]
pub struct MockChainBuilder {
    chain: MockChain,
}

impl Default for MockChainBuilder {
    fn default() -> Self {
        Self {
            chain: MockChain {
                head: 1_000_000,
                genesis: mainnet_genesis(),
                network_version: 25,
                reward: SmoothedEstimate::new(1_000_000, 0),
                power: SmoothedEstimate::new(1_000, 0),
                operators: HashMap::new(),
                missing_snapshots: HashSet::new(),
                failing_operators: HashMap::new(),
                latency: HashMap::new(),
            },
        }
    }
}

impl MockChainBuilder {
    pub fn head(mut self, epoch: ChainEpoch) -> Self {
        self.chain.head = epoch;
        self
    }

    pub fn genesis(mut self, genesis: DateTime<Utc>) -> Self {
        self.chain.genesis = genesis;
        self
    }

    pub fn network_version(mut self, version: NetworkVersion) -> Self {
        self.chain.network_version = version;
        self
    }

    pub fn signals(mut self, reward: SmoothedEstimate, power: SmoothedEstimate) -> Self {
        self.chain.reward = reward;
        self.chain.power = power;
        self
    }

    pub fn operator(mut self, id: &OperatorId, info: OperatorInfo, sectors: Vec<Sector>) -> Self {
        self.chain
            .operators
            .insert(id.clone(), MockOperator { info, sectors });
        self
    }

    pub fn missing_snapshot(mut self, epoch: ChainEpoch) -> Self {
        self.chain.missing_snapshots.insert(epoch);
        self
    }

    /// Every lookup for `id` fails with `error`
    pub fn failing_operator(mut self, id: &OperatorId, error: TerminatorError) -> Self {
        self.chain.failing_operators.insert(id.clone(), error);
        self
    }

    /// Delay sector listing for `id`
    pub fn latency(mut self, id: &OperatorId, delay: Duration) -> Self {
        self.chain.latency.insert(id.clone(), delay);
        self
    }

    pub fn build(self) -> MockChain {
        self.chain
    }
}

#[async_trait]
impl ChainState for MockChain {
    async fn chain_head(&self) -> TerminatorResult<SnapshotHandle> {
        Ok(SnapshotHandle::new(self.head, vec![format!("head-{}", self.head)]))
    }

    async fn snapshot_at(&self, epoch: ChainEpoch) -> TerminatorResult<SnapshotHandle> {
        if epoch > self.head || self.missing_snapshots.contains(&epoch) {
            return Err(TerminatorError::snapshot_unavailable(epoch, "no tipset at height"));
        }
        Ok(SnapshotHandle::new(epoch, vec![format!("tipset-{}", epoch)]))
    }

    async fn network_version(&self, snapshot: &SnapshotHandle) -> TerminatorResult<NetworkVersion> {
        self.check_snapshot(snapshot)?;
        Ok(self.network_version)
    }

    async fn operator_info(
        &self,
        snapshot: &SnapshotHandle,
        operator: &OperatorId,
    ) -> TerminatorResult<OperatorInfo> {
        self.check_snapshot(snapshot)?;
        Ok(self.operator(operator)?.info)
    }

    async fn sectors(
        &self,
        snapshot: &SnapshotHandle,
        operator: &OperatorId,
        filter: Option<&[SectorNumber]>,
    ) -> TerminatorResult<Vec<Sector>> {
        self.check_snapshot(snapshot)?;
        if let Some(delay) = self.latency.get(operator) {
            tokio::time::sleep(*delay).await;
        }

        let data = self.operator(operator)?;
        Ok(match filter {
            None => data.sectors.clone(),
            Some(numbers) => numbers
                .iter()
                .filter_map(|n| data.sectors.iter().find(|s| s.number == *n).cloned())
                .collect(),
        })
    }

    async fn reward_signal(&self, snapshot: &SnapshotHandle) -> TerminatorResult<SmoothedEstimate> {
        self.check_snapshot(snapshot)?;
        Ok(self.reward.clone())
    }

    async fn power_signal(&self, snapshot: &SnapshotHandle) -> TerminatorResult<SmoothedEstimate> {
        self.check_snapshot(snapshot)?;
        Ok(self.power.clone())
    }

    async fn genesis_time(&self) -> TerminatorResult<DateTime<Utc>> {
        Ok(self.genesis)
    }
}

/// Deterministic penalty model.
///
/// Fault fee is `reward.position * qa_power / power.position`; the
/// termination fee is `termination_percent`% of pledge plus the fault fee.
#[derive(Debug, Clone)]
pub struct FixedPenalties {
    termination_percent: u32,
    fail_on_qa_power: Option<BigInt>,
}

impl FixedPenalties {
    pub fn new(termination_percent: u32) -> Self {
        Self {
            termination_percent,
            fail_on_qa_power: None,
        }
    }

    /// Fail fault-fee lookups for sectors with exactly this QA power
    pub fn fail_on_qa_power(mut self, qa_power: BigInt) -> Self {
        self.fail_on_qa_power = Some(qa_power);
        self
    }
}

impl PenaltyModel for FixedPenalties {
    fn continued_fault_fee(
        &self,
        _version: NetworkVersion,
        reward: &SmoothedEstimate,
        power: &SmoothedEstimate,
        qa_power: &BigInt,
    ) -> TerminatorResult<TokenAmount> {
        if self.fail_on_qa_power.as_ref() == Some(qa_power) {
            return Err(TerminatorError::external("fault fee lookup failed"));
        }
        if power.position.is_zero() {
            return Ok(TokenAmount::zero());
        }
        Ok(TokenAmount::from_atto(&reward.position * qa_power / &power.position))
    }

    fn termination_fee(
        &self,
        _version: NetworkVersion,
        initial_pledge: &TokenAmount,
        _age: ChainEpoch,
        fault_fee: &TokenAmount,
    ) -> TerminatorResult<TokenAmount> {
        let pledge_part =
            initial_pledge.atto() * BigInt::from(self.termination_percent) / BigInt::from(100);
        Ok(TokenAmount::from_atto(pledge_part) + fault_fee.clone())
    }
}
