//! Result tables and CSV exports.

use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::path::Path;
use terminator_engine::{BatchSummary, ExpirationDistribution, FleetSummary};
use terminator_types::{StrategyResult, TerminatorError};

use crate::commands::batch::BatchLine;

const ERROR_PREVIEW_CHARS: usize = 20;

fn error_text(error: Option<&TerminatorError>) -> String {
    error.map(|e| e.to_string()).unwrap_or_default()
}

/// Shorten an error message for table cells
pub fn truncate_error(message: &str) -> String {
    if message.chars().count() > ERROR_PREVIEW_CHARS {
        let head: String = message.chars().take(ERROR_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        message.to_string()
    }
}

fn status_cell(success: bool, width: usize) -> colored::ColoredString {
    let text = format!("{:<width$}", if success { "success" } else { "failed" });
    if success {
        text.green()
    } else {
        text.red()
    }
}

fn day_label(day: i64) -> String {
    match day {
        d if d < 0 => format!("{} (expired)", d),
        0 => "0 (today)".to_string(),
        d => format!("+{}", d),
    }
}

// ========== Batch ==========

pub fn print_batch_results(lines: &[BatchLine]) {
    println!("\n{}", "=== Results ===".bold());
    println!(
        "{:<12} {:<10} {:<8} {:<6} {:<6} {:<8} {:<25} {}",
        "MinerID", "Epoch", "Status", "Total", "Active", "Expired", "Fee(FIL)", "Error"
    );
    println!("{}", "-".repeat(90));

    for line in lines {
        let (total, active, expired, fee) = batch_counts(line);
        println!(
            "{:<12} {:<10} {} {:<6} {:<6} {:<8} {:<25} {}",
            line.miner(),
            line.epoch(),
            status_cell(line.is_success(), 8),
            total,
            active,
            expired,
            fee,
            truncate_error(&error_text(line.error())).red(),
        );
    }
}

fn batch_counts(line: &BatchLine) -> (usize, usize, usize, String) {
    match line.result() {
        Some(r) => (
            r.total_sectors,
            r.active_sectors,
            r.expired_sectors,
            r.total_fee.to_decimal_string(),
        ),
        None => (0, 0, 0, "0".to_string()),
    }
}

pub fn write_batch_csv<W: Write>(out: W, lines: &[BatchLine]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record([
        "MinerID", "Epoch", "Status", "TotalSectors", "ActiveSectors", "ExpiredSectors",
        "TotalFee(FIL)", "Error",
    ])?;
    for line in lines {
        let (total, active, expired, fee) = batch_counts(line);
        writer.write_record([
            line.miner().to_string(),
            line.epoch().to_string(),
            if line.is_success() { "success" } else { "failed" }.to_string(),
            total.to_string(),
            active.to_string(),
            expired.to_string(),
            fee,
            error_text(line.error()),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn print_batch_summary(summary: &BatchSummary) {
    println!("\n{}", "=== Summary ===".bold());
    println!("Total miners processed: {}", summary.processed);
    println!("Successful calculations: {}", summary.successful.to_string().green());
    println!("Failed calculations: {}", summary.failed.to_string().red());
    println!("Total termination fee: {}", summary.total_fee.to_string().cyan());
}

// ========== Strategy ==========

pub fn print_strategy_results(results: &[StrategyResult], verbose: bool) {
    println!("\n{}", "=== Strategy Results ===".bold());
    println!(
        "{:<12} {:<10} {:<8} {:<6} {:<6} {:<6} {:<6} {:<25} {:<25} {:<25} {}",
        "MinerID", "Epoch", "Status", "Total", "Term.", "Exp.", "Omit.",
        "TermFee(FIL)", "ExpFee(FIL)", "TotalFee(FIL)", "Error"
    );
    println!("{}", "-".repeat(150));

    for result in results {
        println!(
            "{:<12} {:<10} {} {:<6} {:<6} {:<6} {:<6} {:<25} {:<25} {:<25} {}",
            result.operator.as_str(),
            result.termination_epoch,
            status_cell(result.is_success(), 8),
            result.total_sectors,
            result.terminate_sectors,
            result.expire_sectors,
            result.omitted_sectors,
            result.termination_fee.to_decimal_string(),
            result.expiration_fee.to_decimal_string(),
            result.total_fee.to_decimal_string(),
            truncate_error(&error_text(result.error.as_ref())).red(),
        );

        if verbose && result.is_success() && !result.sector_details.is_empty() {
            println!("  Sector breakdown:");
            for detail in &result.sector_details {
                println!(
                    "    {}: {} ({:.1}d) -> {}",
                    detail.sector, detail.action, detail.remaining_days, detail.recommended_fee
                );
            }
        }
    }
}

pub fn write_strategy_csv<W: Write>(out: W, results: &[StrategyResult]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record([
        "MinerID", "TerminationEpoch", "Status", "TotalSectors", "TerminateSectors",
        "ExpireSectors", "ExpiredSectors", "OmittedSectors", "TerminationFee(FIL)",
        "ExpirationFee(FIL)", "TotalFee(FIL)", "Error",
    ])?;
    for r in results {
        writer.write_record([
            r.operator.to_string(),
            r.termination_epoch.to_string(),
            r.status().to_string(),
            r.total_sectors.to_string(),
            r.terminate_sectors.to_string(),
            r.expire_sectors.to_string(),
            r.expired_sectors.to_string(),
            r.omitted_sectors.to_string(),
            r.termination_fee.to_decimal_string(),
            r.expiration_fee.to_decimal_string(),
            r.total_fee.to_decimal_string(),
            error_text(r.error.as_ref()),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn print_fleet_summary(summary: &FleetSummary) {
    println!("\n{}", "=== Summary ===".bold());
    println!("Total miners processed: {}", summary.operators);
    println!("Successful calculations: {}", summary.successful.to_string().green());
    println!("Failed calculations: {}", summary.failed.to_string().red());
    println!("Total sectors analyzed: {}", summary.total_sectors);
    println!("Already expired sectors: {}", summary.expired_sectors);
    println!(
        "Sectors to terminate: {} ({:.1}%)",
        summary.terminate_sectors,
        summary.terminate_percent()
    );
    println!(
        "Sectors to let expire: {} ({:.1}%)",
        summary.expire_sectors,
        summary.expire_percent()
    );
    if summary.omitted_sectors > 0 {
        println!(
            "Sectors omitted (pricing failed): {}",
            summary.omitted_sectors.to_string().yellow()
        );
    }
    println!(
        "Total termination fees: {} ({:.1}%)",
        summary.termination_fee,
        summary.termination_fee_percent()
    );
    println!(
        "Total expiration fees: {} ({:.1}%)",
        summary.expiration_fee,
        summary.expiration_fee_percent()
    );
    println!("Combined total fees: {}", summary.total_fee.to_string().cyan());
    if let Some(savings) = summary.savings() {
        println!(
            "Strategy savings vs full termination: {} ({:.2}%)",
            savings.to_string().green().bold(),
            summary.savings_percent()
        );
    }
}

// ========== Expiration ==========

pub fn print_expiration(distribution: &ExpirationDistribution, verbose: bool) {
    println!("\n{}", "=== Sector Expiration Distribution ===".bold());
    println!("Reference epoch: {}", distribution.reference_epoch);

    if verbose || distribution.operators.len() == 1 {
        println!("\n--- Per Miner Details ---");
        for scanned in &distribution.operators {
            println!(
                "\nMiner: {} (Total sectors: {})",
                scanned.operator.as_str().cyan(),
                scanned.total_sectors
            );
            for (day, count) in &scanned.buckets {
                match *day {
                    d if d < 0 => println!("  Expired {} days ago: {} sectors", -d, count),
                    0 => println!("  Expires today: {} sectors", count),
                    d => println!("  Expires in {} days: {} sectors", d, count),
                }
            }
        }
    }

    println!("\n--- Overall Distribution ---");
    println!("{:<15} {:<10} {:<10}", "Days from now", "Sectors", "Miners");
    println!("{}", "-".repeat(40));
    for (day, stats) in &distribution.overall {
        println!("{:<15} {:<10} {:<10}", day_label(*day), stats.sectors, stats.operators.len());
    }

    println!("\nTotal sectors: {}", distribution.total_sectors());
    println!("Total miners: {}", distribution.operators.len());
    for (operator, error) in &distribution.failures {
        println!("{} {}: {}", "✗".red().bold(), operator, error);
    }
}

pub fn write_expiration_csv<W: Write>(out: W, distribution: &ExpirationDistribution) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(out);

    writer.write_record(["=== Overall Distribution ==="])?;
    writer.write_record(["Days from now", "Sectors", "Miners"])?;
    for (day, stats) in &distribution.overall {
        writer.write_record([
            day.to_string(),
            stats.sectors.to_string(),
            stats.operators.len().to_string(),
        ])?;
    }

    writer.write_record([""])?;
    writer.write_record(["=== Per Miner Details ==="])?;
    for scanned in &distribution.operators {
        writer.write_record([format!("Miner: {}", scanned.operator)])?;
        writer.write_record(["Days from now", "Sectors"])?;
        for (day, count) in &scanned.buckets {
            writer.write_record([day.to_string(), count.to_string()])?;
        }
        writer.write_record([""])?;
    }

    writer.flush()?;
    Ok(())
}

/// Create `path` and hand it to a CSV writer
pub fn write_file<F>(path: &str, write: F) -> Result<()>
where
    F: FnOnce(std::fs::File) -> Result<()>,
{
    let file = std::fs::File::create(Path::new(path))?;
    write(file)?;
    println!("{} Results written to {}", "✓".green().bold(), path.cyan());
    Ok(())
}
