//! End-to-end pricing against an in-memory chain
//!
//! One operator with three sectors around a head of 1,000,000:
//! 1. already expired two days ago
//! 2. active, expiring in three days
//! 3. active, expiring in 300 days

use std::sync::Arc;

use num_bigint::BigInt;
use terminator_engine::mock::{FixedPenalties, MockChain};
use terminator_engine::{BatchScheduler, FleetSummary, TerminationCalculator};
use terminator_types::{
    CalculationRequest, ChainEpoch, OperatorId, OperatorInfo, SectorAction, Sector,
    SmoothedEstimate, StrategyTask, TerminatorError, TokenAmount, EPOCHS_IN_DAY,
};

const HEAD: ChainEpoch = 1_000_000;

/// Initialize tracing for tests
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn operator() -> OperatorId {
    OperatorId::parse("f01000").unwrap()
}

fn sector(number: u64, activation: ChainEpoch, expiration: ChainEpoch) -> Sector {
    Sector {
        number,
        activation,
        expiration,
        initial_pledge: TokenAmount::from_atto(1_000_000),
        qa_power: BigInt::from(2),
    }
}

fn v16() -> OperatorInfo {
    OperatorInfo { sector_size: 32 << 30, actor_version: 16 }
}

fn chain() -> MockChain {
    MockChain::builder()
        .head(HEAD)
        .signals(SmoothedEstimate::new(1_000_000, 0), SmoothedEstimate::new(1_000, 0))
        .operator(
            &operator(),
            v16(),
            vec![
                sector(1, 0, HEAD - 2 * EPOCHS_IN_DAY),
                sector(2, 100_000, HEAD + 3 * EPOCHS_IN_DAY),
                sector(3, 200_000, HEAD + 300 * EPOCHS_IN_DAY),
            ],
        )
        .build()
}

fn calculator(chain: MockChain, penalties: FixedPenalties) -> TerminationCalculator {
    TerminationCalculator::new(Arc::new(chain), Arc::new(penalties))
}

#[tokio::test]
async fn test_strategy_three_sectors() {
    init_tracing();
    let calc = calculator(chain(), FixedPenalties::new(10));
    let result = calc
        .strategy(&StrategyTask {
            operator: operator(),
            termination_epoch: 0,
            threshold_days: 7,
        })
        .await;

    assert!(result.is_success(), "{:?}", result.error);
    assert_eq!(result.termination_epoch, HEAD);
    assert_eq!(result.current_epoch, HEAD);
    assert!(!result.is_estimate);
    assert_eq!(result.total_sectors, 3);
    assert_eq!(result.expired_sectors, 1);
    assert_eq!(result.expire_sectors, 1);
    assert_eq!(result.terminate_sectors, 1);
    assert_eq!(result.omitted_sectors, 0);

    // fault fee 1_000_000 * 2 / 1_000 = 2000 per day
    assert_eq!(result.expiration_fee, TokenAmount::from_atto(3 * 2000));
    // 10% of pledge plus fault fee
    assert_eq!(result.termination_fee, TokenAmount::from_atto(102_000));
    assert_eq!(result.total_fee, &result.termination_fee + &result.expiration_fee);

    let actions: Vec<_> = result.sector_details.iter().map(|d| (d.sector, d.action)).collect();
    assert_eq!(actions, vec![(2, SectorAction::Expire), (3, SectorAction::Terminate)]);

    let summary = FleetSummary::from_results(&[result]);
    assert_eq!(summary.all_terminate_cost, TokenAmount::from_atto(204_000));
    assert_eq!(summary.savings(), Some(TokenAmount::from_atto(204_000 - 108_000)));
}

#[tokio::test]
async fn test_strategy_zero_threshold_terminates_everything() {
    let calc = calculator(chain(), FixedPenalties::new(10));
    let result = calc
        .strategy(&StrategyTask {
            operator: operator(),
            termination_epoch: 0,
            threshold_days: 0,
        })
        .await;

    assert_eq!(result.expire_sectors, 0);
    assert_eq!(result.terminate_sectors, 2);
    assert_eq!(result.expiration_fee, TokenAmount::zero());
    assert_eq!(result.total_fee, result.all_terminate_cost());
}

#[tokio::test]
async fn test_strategy_omits_unpriceable_sectors() {
    init_tracing();
    let chain = MockChain::builder()
        .head(HEAD)
        .operator(
            &operator(),
            v16(),
            vec![
                sector(1, 0, HEAD + 300 * EPOCHS_IN_DAY),
                Sector { qa_power: BigInt::from(99), ..sector(2, 0, HEAD + 300 * EPOCHS_IN_DAY) },
            ],
        )
        .build();
    let calc = calculator(chain, FixedPenalties::new(10).fail_on_qa_power(BigInt::from(99)));
    let result = calc
        .strategy(&StrategyTask {
            operator: operator(),
            termination_epoch: 0,
            threshold_days: 7,
        })
        .await;

    assert!(result.is_success());
    assert_eq!(result.omitted_sectors, 1);
    assert_eq!(result.omissions[0].sector, 2);
    assert!(matches!(
        result.omissions[0].error,
        TerminatorError::AggregationSkipped { sector: 2, .. }
    ));
    assert_eq!(result.terminate_sectors, 1);
}

#[tokio::test]
async fn test_calculate_current_head() {
    let calc = calculator(chain(), FixedPenalties::new(10));
    let result = calc
        .calculate_one(&CalculationRequest::all_sectors(operator(), 0))
        .await
        .unwrap();

    assert!(!result.is_estimate);
    assert_eq!(result.total_sectors, 3);
    assert_eq!(result.active_sectors, 2);
    assert_eq!(result.expired_sectors, 1);
    assert_eq!(result.total_fee, TokenAmount::from_atto(2 * 102_000));

    let expired = &result.sector_results[0];
    assert!(expired.expired);
    assert_eq!(expired.expired_days, Some(2.0));
    assert!(expired.fee.is_zero());
    assert_eq!(result.sector_results[1].age, HEAD - 100_000);
}

#[tokio::test]
async fn test_calculate_sector_subset() {
    let calc = calculator(chain(), FixedPenalties::new(10));
    let request = CalculationRequest::all_sectors(operator(), 0).with_sectors(vec![3, 1]);
    let result = calc.calculate_one(&request).await.unwrap();
    let numbers: Vec<_> = result.sector_results.iter().map(|r| r.sector).collect();
    assert_eq!(numbers, vec![3, 1]);

    // an empty selection prices everything
    let request = CalculationRequest::all_sectors(operator(), 0).with_sectors(vec![]);
    let result = calc.calculate_one(&request).await.unwrap();
    assert_eq!(result.total_sectors, 3);
}

#[tokio::test]
async fn test_calculate_historical_epoch() {
    let calc = calculator(chain(), FixedPenalties::new(10));
    let target = HEAD - 10 * EPOCHS_IN_DAY;
    let result = calc
        .calculate_one(&CalculationRequest::all_sectors(operator(), target))
        .await
        .unwrap();

    assert!(!result.is_estimate);
    assert_eq!(result.target_epoch, target);
    assert_eq!(result.current_epoch, HEAD);
    // nothing has expired yet at the earlier epoch
    assert_eq!(result.active_sectors, 3);
    assert_eq!(result.sector_results[0].age, target);
}

#[tokio::test]
async fn test_calculate_projected_epoch() {
    let calc = calculator(chain(), FixedPenalties::new(10));
    let target = HEAD + 10 * EPOCHS_IN_DAY;
    let result = calc
        .calculate_one(&CalculationRequest::all_sectors(operator(), target))
        .await
        .unwrap();

    assert!(result.is_estimate);
    assert_eq!(result.current_epoch, HEAD);
    assert_eq!(result.expired_sectors, 2);
    // reward floored to 10%, power grown by 3.88x: 100_000 * 2 / 3880
    assert_eq!(result.total_fee, TokenAmount::from_atto(100_000 + 51));
}

#[tokio::test]
async fn test_missing_snapshot_fails_request() {
    let target = HEAD - 100;
    let chain = MockChain::builder()
        .head(HEAD)
        .missing_snapshot(target)
        .operator(&operator(), v16(), vec![])
        .build();
    let calc = calculator(chain, FixedPenalties::new(10));

    let err = calc
        .calculate_one(&CalculationRequest::all_sectors(operator(), target))
        .await
        .unwrap_err();
    assert!(matches!(err, TerminatorError::SnapshotUnavailable { epoch, .. } if epoch == target));

    let result = calc.calculate(&CalculationRequest::all_sectors(operator(), target)).await;
    assert!(!result.is_success());
    assert_eq!(result.current_epoch, HEAD);
    assert_eq!(result.target_epoch, target);
    assert!(!result.is_estimate);

    let strategy = calc
        .strategy(&StrategyTask { operator: operator(), termination_epoch: target, threshold_days: 7 })
        .await;
    assert!(!strategy.is_success());
    assert_eq!(strategy.current_epoch, HEAD);
    assert_eq!(strategy.termination_epoch, target);
}

#[tokio::test]
async fn test_old_actor_version_fails_fast() {
    let chain = MockChain::builder()
        .head(HEAD)
        .operator(
            &operator(),
            OperatorInfo { sector_size: 32 << 30, actor_version: 15 },
            vec![sector(1, 0, HEAD + 1000)],
        )
        .build();
    let calc = calculator(chain, FixedPenalties::new(10));
    let err = calc
        .calculate_one(&CalculationRequest::all_sectors(operator(), 0))
        .await
        .unwrap_err();
    assert_eq!(err, TerminatorError::UnsupportedVersion { version: 15, minimum: 16 });
}

#[tokio::test]
async fn test_zero_sector_operator() {
    let chain = MockChain::builder().head(HEAD).operator(&operator(), v16(), vec![]).build();
    let calc = calculator(chain, FixedPenalties::new(10));

    let result = calc
        .calculate_one(&CalculationRequest::all_sectors(operator(), 0))
        .await
        .unwrap();
    assert_eq!(result.total_sectors, 0);
    assert!(result.total_fee.is_zero());

    let strategy = calc
        .strategy(&StrategyTask { operator: operator(), termination_epoch: 0, threshold_days: 7 })
        .await;
    assert_eq!(strategy.total_sectors, 0);
    let summary = FleetSummary::from_results(&[strategy]);
    assert_eq!(summary.terminate_percent(), 0.0);
    assert_eq!(summary.expiration_fee_percent(), 0.0);
    assert_eq!(summary.savings(), None);
}

#[tokio::test]
async fn test_strategy_batch_isolates_failures() {
    init_tracing();
    let broken = OperatorId::parse("f01001").unwrap();
    let chain = MockChain::builder()
        .head(HEAD)
        .operator(&operator(), v16(), vec![sector(1, 0, HEAD + 300 * EPOCHS_IN_DAY)])
        .failing_operator(&broken, TerminatorError::external("connection reset"))
        .build();
    let calc = calculator(chain, FixedPenalties::new(10));
    let tasks = vec![
        StrategyTask { operator: broken.clone(), termination_epoch: 0, threshold_days: 7 },
        StrategyTask { operator: operator(), termination_epoch: 0, threshold_days: 7 },
    ];

    let results = calc.strategy_batch(&BatchScheduler::new(2), tasks).await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].operator, broken);
    assert_eq!(results[0].error, Some(TerminatorError::external("connection reset")));
    assert!(results[1].is_success());
    assert_eq!(results[1].terminate_sectors, 1);

    let summary = FleetSummary::from_results(&results);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.successful, 1);
}
