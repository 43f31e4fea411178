//! Epoch/time conversion and sector expiration statistics

use anyhow::{bail, Context as _, Result};
use chrono::{DateTime, FixedOffset, Local, Utc};
use colored::Colorize;
use std::sync::Arc;
use terminator_engine::{ChainState, ExpirationDistribution};
use terminator_types::{epoch_to_time, mainnet_genesis, parse_time, time_to_epoch, ChainEpoch, OperatorId};
use tracing::{info, warn};

use super::Context;
use crate::input::{parse_miner_list, read_miner_list};
use crate::output;
use crate::ToolsAction;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

pub async fn handle(action: ToolsAction, ctx: &Context) -> Result<()> {
    match action {
        ToolsAction::EpochToTime { epoch, timezone, offline } => {
            if epoch < 0 {
                bail!("epoch must be non-negative");
            }
            let zone = DisplayZone::parse(&timezone)?;
            let genesis = genesis(ctx, offline).await;
            let time = epoch_to_time(epoch, genesis)?;

            println!("Epoch: {}", epoch.to_string().cyan());
            println!("Time (UTC): {}", time.format(TIME_FORMAT));
            if !matches!(zone, DisplayZone::Utc) {
                println!("Time ({}): {}", timezone, zone.format(time));
            }
            println!("Unix timestamp: {}", time.timestamp());
            Ok(())
        }

        ToolsAction::TimeToEpoch { time, offline } => {
            let time = parse_time(&time)?;
            let genesis = genesis(ctx, offline).await;
            let epoch = time_to_epoch(time, genesis);

            println!("Time: {}", time.with_timezone(&Local).format(TIME_FORMAT));
            println!("Time (UTC): {}", time.format(TIME_FORMAT));
            println!("Epoch: {}", epoch.to_string().cyan());
            println!("Unix timestamp: {}", time.timestamp());
            Ok(())
        }

        ToolsAction::SectorExpiration { miner, miners, file, epoch, output: output_path, workers } => {
            let operators = select_operators(miner, miners, file)?;
            sector_expiration(ctx, operators, epoch, output_path, workers).await
        }
    }
}

fn select_operators(
    miner: Option<String>,
    miners: Option<String>,
    file: Option<String>,
) -> Result<Vec<OperatorId>> {
    let operators = match (miner, miners, file) {
        (Some(miner), None, None) => vec![OperatorId::parse(&miner)?],
        (None, Some(list), None) => parse_miner_list(&list)?,
        (None, None, Some(file)) => read_miner_list(&file)?,
        _ => bail!("exactly one of --miner, --miners or --file must be specified"),
    };
    if operators.is_empty() {
        bail!("no miners specified");
    }
    Ok(operators)
}

async fn sector_expiration(
    ctx: &Context,
    operators: Vec<OperatorId>,
    epoch: ChainEpoch,
    output_path: Option<String>,
    workers: Option<usize>,
) -> Result<()> {
    let chain: Arc<dyn ChainState> = ctx.connect()?;
    let scheduler = ctx.scheduler(workers);
    println!(
        "{} Processing {} miners at reference epoch {}...",
        "→".cyan().bold(),
        operators.len(),
        if epoch == 0 { "head".to_string() } else { epoch.to_string() }
    );

    let distribution = ExpirationDistribution::collect(chain, &scheduler, operators, epoch).await?;

    match output_path {
        Some(path) => {
            output::write_file(&path, |file| output::write_expiration_csv(file, &distribution))?
        }
        None => output::print_expiration(&distribution, ctx.verbose),
    }
    Ok(())
}

/// Genesis time from the node, or mainnet genesis when offline or unreachable
async fn genesis(ctx: &Context, offline: bool) -> DateTime<Utc> {
    if offline || ctx.config.offline_genesis {
        info!("Using offline mode with default mainnet genesis time");
        return mainnet_genesis();
    }

    let fetched = match ctx.connect() {
        Ok(client) => client.genesis_time().await.map_err(anyhow::Error::from),
        Err(e) => Err(e),
    };
    fetched.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to get genesis from node, using default mainnet genesis time");
        mainnet_genesis()
    })
}

/// Time zone for displaying converted epochs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DisplayZone {
    Local,
    Utc,
    Fixed(FixedOffset),
}

impl DisplayZone {
    /// `local`, `utc` or a `±HH:MM` / `±HHMM` / `±HH` offset
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "local" | "" => return Ok(Self::Local),
            "utc" | "z" => return Ok(Self::Utc),
            _ => {}
        }

        let raw = raw.trim();
        let (sign, rest) = if let Some(rest) = raw.strip_prefix('+') {
            (1, rest)
        } else if let Some(rest) = raw.strip_prefix('-') {
            (-1, rest)
        } else {
            bail!("unknown timezone {:?}, use local, utc or ±HH:MM", raw);
        };
        let digits: String = rest.chars().filter(|c| *c != ':').collect();
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            bail!("invalid offset {:?}", raw);
        }
        let (hours, minutes) = match digits.len() {
            2 => (&digits[..2], "0"),
            4 => (&digits[..2], &digits[2..]),
            _ => bail!("invalid offset {:?}", raw),
        };
        let hours: i32 = hours.parse().with_context(|| format!("invalid offset {:?}", raw))?;
        let minutes: i32 = minutes.parse().with_context(|| format!("invalid offset {:?}", raw))?;
        if minutes >= 60 {
            bail!("invalid offset {:?}", raw);
        }
        let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .with_context(|| format!("offset out of range {:?}", raw))?;
        Ok(Self::Fixed(offset))
    }

    fn format(&self, time: DateTime<Utc>) -> String {
        match self {
            Self::Local => time.with_timezone(&Local).format(TIME_FORMAT).to_string(),
            Self::Utc => time.format(TIME_FORMAT).to_string(),
            Self::Fixed(offset) => time.with_timezone(offset).format(TIME_FORMAT).to_string(),
        }
    }
}
