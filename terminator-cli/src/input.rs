//! Input file readers for batch, strategy and expiration commands.

use anyhow::{bail, Context as _, Result};
use std::path::Path;
use terminator_types::{ChainEpoch, OperatorId, TerminatorResult};
use tracing::warn;

/// One `minerid,epoch` line of a batch file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRow {
    /// Miner column as written
    pub miner: String,
    pub epoch: ChainEpoch,
    /// A malformed address fails only its own row
    pub operator: TerminatorResult<OperatorId>,
}

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))
}

fn is_miner_header(field: &str) -> bool {
    matches!(field.to_ascii_lowercase().as_str(), "minerid" | "miner")
}

/// Read a `minerid,epoch` CSV; a header row is skipped when present.
pub fn read_batch_file(path: impl AsRef<Path>) -> Result<Vec<BatchRow>> {
    let path = path.as_ref();
    let mut rows = Vec::new();

    for (i, record) in reader(path)?.records().enumerate() {
        let line = i + 1;
        let record = record.with_context(|| format!("line {}: malformed CSV", line))?;
        let miner = record.get(0).unwrap_or_default();
        if i == 0 && is_miner_header(miner) {
            continue;
        }
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() < 2 {
            bail!("line {}: expected 'minerid,epoch', got {} field(s)", line, record.len());
        }
        let epoch: ChainEpoch = record[1]
            .parse()
            .with_context(|| format!("line {}: invalid epoch {:?}", line, &record[1]))?;
        let operator = OperatorId::parse(miner);
        if let Err(e) = &operator {
            warn!(line, error = %e, "Invalid miner in batch input");
        }
        rows.push(BatchRow { miner: miner.to_string(), epoch, operator });
    }

    Ok(rows)
}

/// Operators for the strategy command.
///
/// `input` is either a CSV file (miner taken from a `minerid`/`miner`
/// column, else the first column) or a single miner ID. Only ID-form
/// addresses are kept.
pub fn read_strategy_input(input: &str) -> Result<Vec<OperatorId>> {
    let path = Path::new(input);
    if !path.is_file() {
        let operator = OperatorId::parse(input)?;
        if !operator.is_id_address() {
            bail!("{} is not an ID address (f0...)", operator);
        }
        return Ok(vec![operator]);
    }

    let mut column = 0;
    let mut operators = Vec::new();

    for (i, record) in reader(path)?.into_records().enumerate() {
        let record = record.with_context(|| format!("line {}: malformed CSV", i + 1))?;
        if i == 0 {
            if let Some(idx) = record.iter().position(is_miner_header) {
                column = idx;
                continue;
            }
        }
        let Some(raw) = record.get(column).filter(|s| !s.is_empty()) else {
            continue;
        };
        match OperatorId::parse(raw) {
            Ok(op) if op.is_id_address() => operators.push(op),
            Ok(op) => warn!(operator = %op, "Skipping non-ID address"),
            Err(e) => warn!(error = %e, "Skipping invalid miner"),
        }
    }

    if operators.is_empty() {
        bail!("no valid miner IDs found in {}", input);
    }
    Ok(operators)
}

/// Miner list for the expiration tool: plain text, one per line (blank
/// lines and `#` comments skipped), or CSV with a `minerid`/`miner` column.
pub fn read_miner_list(path: impl AsRef<Path>) -> Result<Vec<OperatorId>> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let raw: Vec<String> = if is_csv {
        let mut records = reader(path)?.into_records();
        let header = records
            .next()
            .transpose()?
            .context("empty CSV file")?;
        let column = header
            .iter()
            .position(is_miner_header)
            .context("CSV file must have a 'minerid' or 'miner' column")?;
        records
            .filter_map(|r| r.ok())
            .filter_map(|r| r.get(column).map(str::to_string))
            .filter(|s| !s.is_empty())
            .collect()
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect()
    };

    raw.iter()
        .map(|m| OperatorId::parse(m).map_err(Into::into))
        .collect()
}

/// Comma-separated miner list
pub fn parse_miner_list(list: &str) -> Result<Vec<OperatorId>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|m| OperatorId::parse(m).map_err(Into::into))
        .collect()
}
