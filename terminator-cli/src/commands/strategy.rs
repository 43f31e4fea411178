//! Terminate-or-expire optimization across a fleet

use anyhow::Result;
use terminator_engine::FleetSummary;
use terminator_types::{ChainEpoch, StrategyTask};
use tracing::info;

use super::Context;
use crate::input::read_strategy_input;
use crate::output;

pub async fn handle(
    ctx: &Context,
    input: String,
    epoch: ChainEpoch,
    threshold: Option<u32>,
    workers: Option<usize>,
    output_path: Option<String>,
) -> Result<()> {
    let operators = read_strategy_input(&input)?;
    let threshold_days = threshold.unwrap_or(ctx.config.expiration_threshold_days);

    let calculator = ctx.calculator()?;
    let scheduler = ctx.scheduler(workers);

    println!("=== Strategy Calculation ===");
    println!("Miners to process: {}", operators.len());
    println!("Termination epoch: {}", epoch);
    if threshold_days == 0 {
        println!("Expiration threshold: 0 days (optimization disabled - terminate all)");
    } else {
        println!("Expiration threshold: {} days", threshold_days);
    }
    println!("Concurrent workers: {}", scheduler.workers());
    println!("=====================================");

    let tasks: Vec<_> = operators
        .into_iter()
        .map(|operator| StrategyTask {
            operator,
            termination_epoch: epoch,
            threshold_days,
        })
        .collect();

    let results = calculator.strategy_batch(&scheduler, tasks).await;
    let summary = FleetSummary::from_results(&results);
    info!(
        operators = summary.operators,
        failed = summary.failed,
        omitted = summary.omitted_sectors,
        "Strategy batch complete"
    );

    match output_path {
        Some(path) => output::write_file(&path, |file| output::write_strategy_csv(file, &results))?,
        None => output::print_strategy_results(&results, ctx.verbose),
    }
    output::print_fleet_summary(&summary);
    Ok(())
}
