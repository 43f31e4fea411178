//! Historical vs projected epoch resolution.

use terminator_types::{ChainEpoch, SnapshotHandle, TerminatorError, TerminatorResult};
use tracing::debug;

use crate::traits::ChainState;

/// How a request's inputs are obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Target is finalized; exact state at the target snapshot
    Historical,
    /// Target is ahead of head; head state projected `offset` epochs
    Projected { offset: ChainEpoch },
}

/// Resolved target of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Target after `0` was rewritten to head
    pub target_epoch: ChainEpoch,
    pub current_epoch: ChainEpoch,
    /// Snapshot whose state is read
    pub snapshot: SnapshotHandle,
    pub mode: ResolutionMode,
}

impl Resolution {
    pub fn is_estimate(&self) -> bool {
        matches!(self.mode, ResolutionMode::Projected { .. })
    }

    pub fn projection_offset(&self) -> ChainEpoch {
        match self.mode {
            ResolutionMode::Historical => 0,
            ResolutionMode::Projected { offset } => offset,
        }
    }
}

/// Resolve `requested` against the current head.
///
/// A historical snapshot that cannot be loaded fails this request with
/// `SnapshotUnavailable`.
pub async fn resolve(chain: &dyn ChainState, requested: ChainEpoch) -> TerminatorResult<Resolution> {
    check_target(requested)?;
    let head = chain.chain_head().await?;
    resolve_at(chain, head, requested).await
}

/// Target epoch after `0` is rewritten to the head
pub fn target_for(requested: ChainEpoch, head_epoch: ChainEpoch) -> ChainEpoch {
    if requested == 0 {
        head_epoch
    } else {
        requested
    }
}

fn check_target(requested: ChainEpoch) -> TerminatorResult<()> {
    if requested < 0 {
        return Err(TerminatorError::invalid_input(format!(
            "target epoch must be non-negative, got {}",
            requested
        )));
    }
    Ok(())
}

/// Resolve `requested` against an already observed `head`
pub async fn resolve_at(
    chain: &dyn ChainState,
    head: SnapshotHandle,
    requested: ChainEpoch,
) -> TerminatorResult<Resolution> {
    check_target(requested)?;
    let current_epoch = head.epoch;
    let target_epoch = target_for(requested, current_epoch);

    if target_epoch > current_epoch {
        let offset = target_epoch - current_epoch;
        debug!(target_epoch, current_epoch, offset, "Projecting from chain head");
        return Ok(Resolution {
            target_epoch,
            current_epoch,
            snapshot: head,
            mode: ResolutionMode::Projected { offset },
        });
    }

    let snapshot = if target_epoch == current_epoch {
        head
    } else {
        chain.snapshot_at(target_epoch).await.map_err(|e| match e {
            TerminatorError::Cancelled | TerminatorError::SnapshotUnavailable { .. } => e,
            other => TerminatorError::snapshot_unavailable(target_epoch, other.to_string()),
        })?
    };

    debug!(target_epoch, current_epoch, "Using finalized snapshot");
    Ok(Resolution {
        target_epoch,
        current_epoch,
        snapshot,
        mode: ResolutionMode::Historical,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockChain;

    #[tokio::test]
    async fn test_zero_means_head() {
        let chain = MockChain::builder().head(5000).build();
        let res = resolve(&chain, 0).await.unwrap();
        assert_eq!(res.target_epoch, 5000);
        assert_eq!(res.current_epoch, 5000);
        assert_eq!(res.mode, ResolutionMode::Historical);
        assert!(!res.is_estimate());
    }

    #[tokio::test]
    async fn test_future_target_is_projected() {
        let chain = MockChain::builder().head(5000).build();
        let res = resolve(&chain, 8000).await.unwrap();
        assert_eq!(res.mode, ResolutionMode::Projected { offset: 3000 });
        assert_eq!(res.snapshot.epoch, 5000);
        assert!(res.is_estimate());
        assert_eq!(res.projection_offset(), 3000);
    }

    #[tokio::test]
    async fn test_past_target_loads_snapshot() {
        let chain = MockChain::builder().head(5000).build();
        let res = resolve(&chain, 1200).await.unwrap();
        assert_eq!(res.snapshot.epoch, 1200);
        assert_eq!(res.projection_offset(), 0);
    }

    #[tokio::test]
    async fn test_missing_snapshot() {
        let chain = MockChain::builder().head(5000).missing_snapshot(1200).build();
        let err = resolve(&chain, 1200).await.unwrap_err();
        assert!(matches!(err, TerminatorError::SnapshotUnavailable { epoch: 1200, .. }));
    }

    #[tokio::test]
    async fn test_resolve_at_observed_head() {
        let chain = MockChain::builder().head(5000).missing_snapshot(1200).build();
        let head = chain.chain_head().await.unwrap();
        assert_eq!(target_for(0, head.epoch), 5000);
        assert_eq!(target_for(1200, head.epoch), 1200);

        let res = resolve_at(&chain, head.clone(), 0).await.unwrap();
        assert_eq!(res.snapshot, head);
        assert!(resolve_at(&chain, head, 1200).await.is_err());
    }

    #[tokio::test]
    async fn test_negative_target_rejected() {
        let chain = MockChain::builder().build();
        let err = resolve(&chain, -1).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }
}
