//! Epoch arithmetic.
//!
//! An epoch is a fixed 30 second slot counted from genesis. The mapping is
//! linear in both directions: epoch -> time -> epoch is exact, while
//! time -> epoch truncates to the slot containing the instant.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};

/// Chain height, may be negative in differences
pub type ChainEpoch = i64;

/// Duration of a single epoch in seconds
pub const EPOCH_DURATION_SECS: i64 = 30;

/// 24h / 30s
pub const EPOCHS_IN_DAY: ChainEpoch = 2880;

/// Mainnet genesis: 2020-08-24 22:00:00 UTC
pub const MAINNET_GENESIS_UNIX: i64 = 1_598_306_400;

const EPOCH_DURATION_MS: i64 = EPOCH_DURATION_SECS * 1000;

pub fn mainnet_genesis() -> DateTime<Utc> {
    Utc.timestamp_opt(MAINNET_GENESIS_UNIX, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Wall-clock start of `epoch`; epochs beyond the representable time
/// range are rejected
pub fn epoch_to_time(
    epoch: ChainEpoch,
    genesis: DateTime<Utc>,
) -> Result<DateTime<Utc>, crate::TerminatorError> {
    epoch
        .checked_mul(EPOCH_DURATION_SECS)
        .and_then(TimeDelta::try_seconds)
        .and_then(|offset| genesis.checked_add_signed(offset))
        .ok_or_else(|| {
            crate::TerminatorError::invalid_input(format!("epoch {} is out of range", epoch))
        })
}

/// Epoch containing `time`; any instant before genesis maps to epoch 0.
pub fn time_to_epoch(time: DateTime<Utc>, genesis: DateTime<Utc>) -> ChainEpoch {
    if time < genesis {
        return 0;
    }
    (time - genesis).num_milliseconds() / EPOCH_DURATION_MS
}

pub fn epochs_to_days(epochs: ChainEpoch) -> f64 {
    epochs as f64 / EPOCHS_IN_DAY as f64
}

pub fn days_to_epochs(days: f64) -> ChainEpoch {
    (days * EPOCHS_IN_DAY as f64) as ChainEpoch
}

/// Formats carrying their own zone information
const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S %z",
];

/// Zone-less formats, interpreted in local time
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const LOCAL_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parse a user supplied time string.
///
/// `Z` and numeric offsets are honoured; strings without zone information
/// are read as local time. Bare dates resolve to local midnight.
pub fn parse_time(input: &str) -> Result<DateTime<Utc>, crate::TerminatorError> {
    let input = input.trim();

    for format in ZONED_FORMATS {
        if *format == "%Y-%m-%dT%H:%M:%SZ" {
            if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
                return Ok(Utc.from_utc_datetime(&naive));
            }
        } else if let Ok(dt) = DateTime::parse_from_str(input, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for format in LOCAL_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return local_to_utc(naive, input);
        }
    }

    for format in LOCAL_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(input, format) {
            let naive = date.and_hms_opt(0, 0, 0).ok_or_else(|| unparseable(input))?;
            return local_to_utc(naive, input);
        }
    }

    Err(unparseable(input))
}

fn local_to_utc(naive: NaiveDateTime, input: &str) -> Result<DateTime<Utc>, crate::TerminatorError> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| unparseable(input))
}

fn unparseable(input: &str) -> crate::TerminatorError {
    crate::TerminatorError::invalid_input(format!("unable to parse time: {}", input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_time_round_trip() {
        let genesis = mainnet_genesis();
        for epoch in [0, 1, 2879, 2880, 1_000_000, 4_500_000] {
            let t = epoch_to_time(epoch, genesis).unwrap();
            assert_eq!(time_to_epoch(t, genesis), epoch);
        }
    }

    #[test]
    fn test_time_to_epoch_truncates_within_slot() {
        let genesis = mainnet_genesis();
        let t = genesis + chrono::Duration::milliseconds(29_999);
        assert_eq!(time_to_epoch(t, genesis), 0);

        let t = genesis + chrono::Duration::seconds(95);
        let epoch = time_to_epoch(t, genesis);
        assert_eq!(epoch, 3);
        let back = epoch_to_time(epoch, genesis).unwrap();
        assert!(back <= t);
        assert!(t - back < chrono::Duration::seconds(EPOCH_DURATION_SECS));
    }

    #[test]
    fn test_epoch_out_of_range_is_rejected() {
        let genesis = mainnet_genesis();
        for epoch in [400_000_000_000_000, i64::MAX, i64::MIN] {
            let err = epoch_to_time(epoch, genesis).unwrap_err();
            assert!(matches!(err, crate::TerminatorError::InvalidInput(_)), "{epoch}");
        }
    }

    #[test]
    fn test_time_before_genesis_clamps() {
        let genesis = mainnet_genesis();
        let t = genesis - chrono::Duration::days(3);
        assert_eq!(time_to_epoch(t, genesis), 0);
    }

    #[test]
    fn test_day_conversions() {
        assert_eq!(epochs_to_days(2880), 1.0);
        assert_eq!(epochs_to_days(1440), 0.5);
        assert_eq!(epochs_to_days(-2880), -1.0);
        assert_eq!(days_to_epochs(7.0), 20160);
        assert_eq!(days_to_epochs(0.5), 1440);
    }

    #[test]
    fn test_mainnet_genesis() {
        assert_eq!(mainnet_genesis().to_rfc3339(), "2020-08-24T22:00:00+00:00");
    }

    #[test]
    fn test_parse_time_zoned() {
        let t = parse_time("2024-01-01T12:00:00Z").unwrap();
        assert_eq!(t.timestamp(), 1_704_110_400);

        let t = parse_time("2024-01-01T20:00:00+08:00").unwrap();
        assert_eq!(t.timestamp(), 1_704_110_400);
    }

    #[test]
    fn test_parse_time_local_formats() {
        let a = parse_time("2024-01-01 12:00:00").unwrap();
        let b = parse_time("2024-01-01T12:00:00").unwrap();
        let c = parse_time("01/01/2024 12:00:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);

        let d = parse_time("2024-01-01").unwrap();
        let e = parse_time("01/01/2024").unwrap();
        assert_eq!(d, e);
        assert_eq!(a - d, chrono::Duration::hours(12));
    }

    #[test]
    fn test_parse_time_rejects_garbage() {
        let err = parse_time("yesterday").unwrap_err();
        assert!(matches!(err, crate::TerminatorError::InvalidInput(_)));
    }
}
