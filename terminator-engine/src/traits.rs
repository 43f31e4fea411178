//! Collaborator interfaces.
//!
//! The engine never talks to a node or evaluates protocol formulas
//! itself. Both are injected so orchestration can be exercised against
//! deterministic fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use terminator_types::{
    ChainEpoch, NetworkVersion, OperatorId, OperatorInfo, Sector, SectorNumber, SmoothedEstimate,
    SnapshotHandle, TerminatorResult, TokenAmount,
};

/// Read-only view of chain state at points in history.
///
/// Every call is independent and idempotent. Implementations report a
/// missing historical snapshot as `TerminatorError::SnapshotUnavailable`
/// and any other failure as `ExternalCallFailure`.
#[async_trait]
pub trait ChainState: Send + Sync {
    /// Current head; its epoch is the "now" of every request
    async fn chain_head(&self) -> TerminatorResult<SnapshotHandle>;

    /// Finalized snapshot at exactly `epoch`
    async fn snapshot_at(&self, epoch: ChainEpoch) -> TerminatorResult<SnapshotHandle>;

    async fn network_version(&self, snapshot: &SnapshotHandle) -> TerminatorResult<NetworkVersion>;

    async fn operator_info(
        &self,
        snapshot: &SnapshotHandle,
        operator: &OperatorId,
    ) -> TerminatorResult<OperatorInfo>;

    /// Sectors of `operator`; `filter` restricts to the listed numbers
    /// in the listed order
    async fn sectors(
        &self,
        snapshot: &SnapshotHandle,
        operator: &OperatorId,
        filter: Option<&[SectorNumber]>,
    ) -> TerminatorResult<Vec<Sector>>;

    /// Smoothed network block reward
    async fn reward_signal(&self, snapshot: &SnapshotHandle) -> TerminatorResult<SmoothedEstimate>;

    /// Smoothed network quality-adjusted power
    async fn power_signal(&self, snapshot: &SnapshotHandle) -> TerminatorResult<SmoothedEstimate>;

    async fn genesis_time(&self) -> TerminatorResult<DateTime<Utc>>;
}

/// Protocol-defined penalty formulas, pure and deterministic.
///
/// May fail with `UnsupportedVersion` for network versions the
/// implementation does not cover.
pub trait PenaltyModel: Send + Sync {
    /// Per-day accrual charged while a sector stays faulty
    fn continued_fault_fee(
        &self,
        version: NetworkVersion,
        reward: &SmoothedEstimate,
        power: &SmoothedEstimate,
        qa_power: &BigInt,
    ) -> TerminatorResult<TokenAmount>;

    /// Lump penalty for terminating a sector of `age` epochs
    fn termination_fee(
        &self,
        version: NetworkVersion,
        initial_pledge: &TokenAmount,
        age: ChainEpoch,
        fault_fee: &TokenAmount,
    ) -> TerminatorResult<TokenAmount>;
}
