//! Batch fee calculation from a CSV file

use anyhow::{bail, Result};
use colored::Colorize;
use terminator_engine::BatchSummary;
use terminator_types::{CalculationRequest, CalculationResult, ChainEpoch, TerminatorError};
use tracing::info;

use super::Context;
use crate::input::{read_batch_file, BatchRow};
use crate::output;

/// One row of batch output, in input order
#[derive(Debug, Clone, PartialEq)]
pub enum BatchLine {
    Priced(CalculationResult),
    /// Row whose miner address could not be parsed; never sent for pricing
    Rejected {
        miner: String,
        epoch: ChainEpoch,
        error: TerminatorError,
    },
}

impl BatchLine {
    pub fn miner(&self) -> &str {
        match self {
            BatchLine::Priced(r) => r.operator.as_str(),
            BatchLine::Rejected { miner, .. } => miner,
        }
    }

    pub fn epoch(&self) -> ChainEpoch {
        match self {
            BatchLine::Priced(r) => r.target_epoch,
            BatchLine::Rejected { epoch, .. } => *epoch,
        }
    }

    pub fn error(&self) -> Option<&TerminatorError> {
        match self {
            BatchLine::Priced(r) => r.error.as_ref(),
            BatchLine::Rejected { error, .. } => Some(error),
        }
    }

    pub fn result(&self) -> Option<&CalculationResult> {
        match self {
            BatchLine::Priced(r) => Some(r),
            BatchLine::Rejected { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error().is_none()
    }
}

/// Put priced results back between the rejected rows.
///
/// `priced` holds one result per row with a valid miner, in row order.
pub fn assemble(rows: Vec<BatchRow>, priced: Vec<CalculationResult>) -> Vec<BatchLine> {
    let mut priced = priced.into_iter();
    rows.into_iter()
        .map(|row| match row.operator {
            Ok(_) => match priced.next() {
                Some(result) => BatchLine::Priced(result),
                None => BatchLine::Rejected {
                    miner: row.miner,
                    epoch: row.epoch,
                    error: TerminatorError::Cancelled,
                },
            },
            Err(error) => BatchLine::Rejected {
                miner: row.miner,
                epoch: row.epoch,
                error,
            },
        })
        .collect()
}

/// Totals with rejected rows counted as failures
pub fn summarize(lines: &[BatchLine]) -> BatchSummary {
    let priced: Vec<CalculationResult> = lines.iter().filter_map(BatchLine::result).cloned().collect();
    let rejected = lines.len() - priced.len();
    let mut summary = BatchSummary::from_results(&priced);
    summary.processed += rejected;
    summary.failed += rejected;
    summary
}

pub async fn handle(
    ctx: &Context,
    input: String,
    output_path: Option<String>,
    workers: Option<usize>,
) -> Result<()> {
    let rows = read_batch_file(&input)?;
    if rows.is_empty() {
        bail!("no tasks found in {}", input);
    }

    let requests: Vec<_> = rows
        .iter()
        .filter_map(|row| {
            let operator = row.operator.as_ref().ok()?;
            Some(CalculationRequest::all_sectors(operator.clone(), row.epoch))
        })
        .collect();

    let calculator = ctx.calculator()?;
    let scheduler = ctx.scheduler(workers);
    println!(
        "{} Processing {} miners with {} workers...",
        "→".cyan().bold(),
        rows.len(),
        scheduler.workers()
    );

    let results = calculator.calculate_batch(&scheduler, requests).await;
    let lines = assemble(rows, results);
    let summary = summarize(&lines);
    info!(processed = summary.processed, failed = summary.failed, "Batch complete");

    match output_path {
        Some(path) => output::write_file(&path, |file| output::write_batch_csv(file, &lines))?,
        None => output::print_batch_results(&lines),
    }
    output::print_batch_summary(&summary);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use terminator_types::{OperatorId, SectorResult, TokenAmount};

    fn row(miner: &str, epoch: ChainEpoch) -> BatchRow {
        BatchRow {
            miner: miner.to_string(),
            epoch,
            operator: OperatorId::parse(miner),
        }
    }

    fn priced(miner: &str, fee: i64) -> CalculationResult {
        CalculationResult::new(OperatorId::parse(miner).unwrap(), 100).with_sector_results(vec![
            SectorResult::active(1, TokenAmount::from_atto(fee), 10),
        ])
    }

    #[test]
    fn test_rejected_row_keeps_its_place() {
        let rows = vec![row("f01000", 100), row("not-a-miner", 100), row("f01002", 100)];
        let lines = assemble(rows, vec![priced("f01000", 5), priced("f01002", 7)]);

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].miner(), "f01000");
        assert!(lines[0].is_success());
        assert_eq!(lines[1].miner(), "not-a-miner");
        assert_eq!(lines[1].epoch(), 100);
        assert!(matches!(lines[1].error(), Some(TerminatorError::InvalidInput(_))));
        assert_eq!(lines[2].miner(), "f01002");
        assert!(lines[2].is_success());
    }

    #[test]
    fn test_summary_counts_rejected_rows() {
        let rows = vec![row("f01000", 100), row("bogus", 1)];
        let lines = assemble(rows, vec![priced("f01000", 5)]);
        let summary = summarize(&lines);

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total_fee, TokenAmount::from_atto(5));
    }
}
