//! Sector selection parsing.
//!
//! Accepts comma separated tokens, each either a sector number or an
//! ascending inclusive range `a-b`. Whitespace around tokens is ignored and
//! empty tokens are skipped. Any bad token fails the whole parse.

use crate::sector::SectorNumber;
use crate::TerminatorError;

/// Parse a selection such as `"1,3-5,7"` into `[1, 3, 4, 5, 7]`.
///
/// Plain tokens keep their input order, ranges expand ascending and
/// duplicates are preserved.
pub fn parse_sector_numbers(input: &str) -> Result<Vec<SectorNumber>, TerminatorError> {
    let mut sectors = Vec::new();

    for token in input.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        if token.starts_with('-') {
            return Err(TerminatorError::invalid_input(format!(
                "sector number cannot be negative: {}",
                token
            )));
        }

        match token.split_once('-') {
            Some((start, end)) => {
                let start = parse_number(start, "start sector number")?;
                let end = parse_number(end, "end sector number")?;
                if start > end {
                    return Err(TerminatorError::invalid_input(format!(
                        "start sector number cannot be greater than end sector number: {} > {}",
                        start, end
                    )));
                }
                sectors.extend(start..=end);
            }
            None => sectors.push(parse_number(token, "sector number")?),
        }
    }

    Ok(sectors)
}

fn parse_number(raw: &str, what: &str) -> Result<SectorNumber, TerminatorError> {
    let raw = raw.trim();
    raw.parse::<SectorNumber>()
        .map_err(|_| TerminatorError::invalid_input(format!("invalid {}: {:?}", what, raw)))
}
