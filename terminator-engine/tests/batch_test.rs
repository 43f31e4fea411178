//! Batch scheduling over many operators

use std::sync::Arc;
use std::time::Duration;

use num_bigint::BigInt;
use terminator_engine::mock::{FixedPenalties, MockChain};
use terminator_engine::{BatchScheduler, BatchSummary, ExpirationDistribution, TerminationCalculator};
use terminator_types::{
    CalculationRequest, ChainEpoch, OperatorId, OperatorInfo, Sector, TerminatorError,
    TokenAmount, EPOCHS_IN_DAY,
};

const HEAD: ChainEpoch = 2_000_000;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn op(n: u64) -> OperatorId {
    OperatorId::parse(&format!("f0{}", 1000 + n)).unwrap()
}

fn sectors(count: u64, expiration: ChainEpoch) -> Vec<Sector> {
    (0..count)
        .map(|n| Sector {
            number: n,
            activation: 0,
            expiration,
            initial_pledge: TokenAmount::from_atto(1000),
            qa_power: BigInt::from(1),
        })
        .collect()
}

/// Six operators; operator `n` has `n + 1` sectors and slower operators
/// come first so completion order is reversed
fn fleet() -> MockChain {
    let info = OperatorInfo { sector_size: 32 << 30, actor_version: 16 };
    let mut builder = MockChain::builder().head(HEAD);
    for n in 0..6 {
        builder = builder
            .operator(&op(n), info, sectors(n + 1, HEAD + 100 * EPOCHS_IN_DAY))
            .latency(&op(n), Duration::from_millis((6 - n) * 10));
    }
    builder.build()
}

#[tokio::test]
async fn test_batch_results_match_input_order() {
    init_tracing();
    let calc = TerminationCalculator::new(Arc::new(fleet()), Arc::new(FixedPenalties::new(10)));
    let requests: Vec<_> = (0..6).map(|n| CalculationRequest::all_sectors(op(n), 0)).collect();

    for workers in [1, 3, 6] {
        let results = calc.calculate_batch(&BatchScheduler::new(workers), requests.clone()).await;
        assert_eq!(results.len(), 6);
        for (n, result) in results.iter().enumerate() {
            assert_eq!(result.operator, op(n as u64));
            assert_eq!(result.total_sectors, n + 1);
        }
    }
}

#[tokio::test]
async fn test_one_failure_leaves_others_unchanged() {
    let calc = TerminationCalculator::new(Arc::new(fleet()), Arc::new(FixedPenalties::new(10)));
    let requests: Vec<_> = (0..6).map(|n| CalculationRequest::all_sectors(op(n), 0)).collect();
    let baseline = calc.calculate_batch(&BatchScheduler::new(3), requests.clone()).await;

    let failing = MockChain::builder()
        .head(HEAD)
        .failing_operator(&op(2), TerminatorError::external("timeout"));
    let mut chain = failing;
    let info = OperatorInfo { sector_size: 32 << 30, actor_version: 16 };
    for n in (0..6).filter(|n| *n != 2) {
        chain = chain.operator(&op(n), info, sectors(n + 1, HEAD + 100 * EPOCHS_IN_DAY));
    }
    let calc = TerminationCalculator::new(Arc::new(chain.build()), Arc::new(FixedPenalties::new(10)));
    let results = calc.calculate_batch(&BatchScheduler::new(3), requests).await;

    for (n, (got, want)) in results.iter().zip(&baseline).enumerate() {
        if n == 2 {
            assert_eq!(got.error, Some(TerminatorError::external("timeout")));
        } else {
            assert_eq!(got, want);
        }
    }

    let summary = BatchSummary::from_results(&results);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.successful, 5);
}

#[tokio::test]
async fn test_cancelled_batch_marks_unfinished_rows() {
    let calc = TerminationCalculator::new(Arc::new(fleet()), Arc::new(FixedPenalties::new(10)));
    let scheduler = BatchScheduler::new(2);
    scheduler.cancellation_token().cancel();

    let requests: Vec<_> = (0..3).map(|n| CalculationRequest::all_sectors(op(n), 0)).collect();
    let results = calc.calculate_batch(&scheduler, requests).await;
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.error == Some(TerminatorError::Cancelled)));
}

#[tokio::test]
async fn test_expiration_distribution() {
    let info = OperatorInfo { sector_size: 32 << 30, actor_version: 16 };
    let mut early = sectors(2, HEAD + 3 * EPOCHS_IN_DAY);
    early.extend(sectors(1, HEAD - 2 * EPOCHS_IN_DAY));
    let chain = MockChain::builder()
        .head(HEAD)
        .operator(&op(0), info, early)
        .operator(&op(1), info, sectors(4, HEAD + 3 * EPOCHS_IN_DAY + 10))
        .failing_operator(&op(2), TerminatorError::external("actor not found"))
        .build();

    let dist = ExpirationDistribution::collect(
        Arc::new(chain),
        &BatchScheduler::new(2),
        vec![op(0), op(1), op(2)],
        0,
    )
    .await
    .unwrap();

    assert_eq!(dist.reference_epoch, HEAD);
    assert_eq!(dist.operators.len(), 2);
    assert_eq!(dist.failures.len(), 1);
    assert_eq!(dist.failures[0].0, op(2));

    let in_three = &dist.overall[&3];
    assert_eq!(in_three.sectors, 6);
    assert_eq!(in_three.operators.len(), 2);
    assert_eq!(dist.overall[&-2].sectors, 1);
    assert_eq!(dist.total_sectors(), 7);
}
