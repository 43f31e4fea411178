//! Single-operator fee calculation

use anyhow::{bail, Result};
use colored::Colorize;
use terminator_types::{
    epochs_to_days, parse_sector_numbers, CalculationRequest, CalculationResult, ChainEpoch,
    OperatorId, EPOCHS_IN_DAY,
};

use super::Context;

pub async fn handle(
    ctx: &Context,
    miner: String,
    sectors: Option<String>,
    all: bool,
    epoch: ChainEpoch,
) -> Result<()> {
    let request = build_request(&miner, sectors.as_deref(), all, epoch)?;

    let calculator = ctx.calculator()?;
    let result = calculator.calculate_one(&request).await?;
    print_result(&result, ctx.verbose);
    Ok(())
}

fn build_request(
    miner: &str,
    sectors: Option<&str>,
    all: bool,
    epoch: ChainEpoch,
) -> Result<CalculationRequest> {
    let operator = OperatorId::parse(miner)?;
    let request = CalculationRequest::all_sectors(operator, epoch);
    match (sectors, all) {
        (Some(_), true) => bail!("--sectors and --all are mutually exclusive"),
        (None, false) => bail!("either --sectors or --all must be specified"),
        (Some(range), false) => Ok(request.with_sectors(parse_sector_numbers(range)?)),
        (None, true) => Ok(request),
    }
}

fn print_result(result: &CalculationResult, verbose: bool) {
    println!("{} {}", "Miner:".bold(), result.operator.as_str().cyan());
    if result.is_estimate {
        println!(
            "{} predicting fees for epoch {} (+{:.1} days) based on data from epoch {}",
            "Estimation mode:".yellow().bold(),
            result.target_epoch,
            epochs_to_days(result.target_epoch - result.current_epoch),
            result.current_epoch
        );
    } else {
        println!("Calculation epoch: {}", result.target_epoch);
    }

    if verbose && !result.sector_results.is_empty() {
        println!("Sector details:");
        for sector in &result.sector_results {
            match sector.expired_days {
                Some(days) if sector.expired => {
                    println!("  Sector {}: {} (expired {:.1} days ago)", sector.sector, "EXPIRED".dimmed(), days)
                }
                _ => println!(
                    "  Sector {}: {} (age: {:.1} days)",
                    sector.sector,
                    sector.fee,
                    sector.age as f64 / EPOCHS_IN_DAY as f64
                ),
            }
        }
    }

    println!("Total sectors: {}", result.total_sectors);
    if result.expired_sectors > 0 {
        println!("Expired sectors: {}", result.expired_sectors);
        println!("Active sectors: {}", result.active_sectors);
    }
    println!("Total termination fee: {}", result.total_fee.to_string().cyan().bold());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_needs_exactly_one_selection() {
        assert!(build_request("f01000", None, false, 0).is_err());
        assert!(build_request("f01000", Some("1"), true, 0).is_err());

        let all = build_request("f01000", None, true, 10).unwrap();
        assert_eq!(all.sectors, None);
        assert_eq!(all.target_epoch, 10);

        let some = build_request("f01000", Some("3,1-2"), false, 0).unwrap();
        assert_eq!(some.sectors, Some(vec![3, 1, 2]));
    }

    #[test]
    fn test_request_rejects_bad_input() {
        assert!(build_request("nope", None, true, 0).is_err());
        assert!(build_request("f01000", Some("5-1"), false, 0).is_err());
    }
}
