//! Core value types for sector termination pricing.
//!
//! Everything here is a plain value object: built once per request or
//! sector, never mutated afterwards, and safe to move across tasks.

// ========== Time & Selection ==========
pub mod epoch;           // Epoch <-> wall clock, day conversions
pub mod sector_range;    // "1,3-5,7" sector selections

// ========== Chain Values ==========
pub mod smoothing;       // Position/velocity smoothed estimates
pub mod token;           // Arbitrary-precision token amounts
pub mod operator;        // Storage operator identifiers
pub mod sector;          // Sector records and snapshot handles

// ========== Requests & Results ==========
pub mod calculation;
pub mod strategy;

pub use epoch::{
    ChainEpoch, EPOCH_DURATION_SECS, EPOCHS_IN_DAY, MAINNET_GENESIS_UNIX,
    days_to_epochs, epoch_to_time, epochs_to_days, mainnet_genesis, parse_time, time_to_epoch,
};
pub use sector_range::parse_sector_numbers;
pub use smoothing::SmoothedEstimate;
pub use token::TokenAmount;
pub use operator::OperatorId;
pub use sector::{
    NetworkVersion, OperatorInfo, Sector, SectorNumber, SnapshotHandle, qa_power_for_weight,
};
pub use calculation::{CalculationRequest, CalculationResult, SectorResult};
pub use strategy::{SectorAction, SectorOmission, SectorStrategy, StrategyResult, StrategyTask};

use serde::{Deserialize, Serialize};

// Error types
pub type TerminatorResult<T> = Result<T, TerminatorError>;

/// Failure taxonomy shared by every layer.
///
/// Errors are stored inside results as data, so the enum is `Clone` and
/// serializable; callers branch on the variant (or [`kind`](Self::kind)),
/// never on the message text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TerminatorError {
    /// Malformed identifier, range, flag or input row
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Finalized state at the requested epoch could not be resolved
    #[error("Snapshot unavailable at epoch {epoch}: {reason}")]
    SnapshotUnavailable { epoch: ChainEpoch, reason: String },

    /// Account or penalty function below the supported protocol version
    #[error("Unsupported version {version} (minimum {minimum})")]
    UnsupportedVersion { version: u32, minimum: u32 },

    /// Any other failure of an external collaborator
    #[error("External call failed: {0}")]
    ExternalCallFailure(String),

    /// A sector that could not be priced and was left out of totals
    #[error("Sector {sector} skipped: {reason}")]
    AggregationSkipped { sector: SectorNumber, reason: String },

    /// The batch was cancelled before this task finished
    #[error("Cancelled")]
    Cancelled,
}

impl TerminatorError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        Self::ExternalCallFailure(msg.into())
    }

    pub fn snapshot_unavailable(epoch: ChainEpoch, reason: impl Into<String>) -> Self {
        Self::SnapshotUnavailable { epoch, reason: reason.into() }
    }

    /// Stable machine-readable tag, used in CSV exports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::SnapshotUnavailable { .. } => "snapshot_unavailable",
            Self::UnsupportedVersion { .. } => "unsupported_version",
            Self::ExternalCallFailure(_) => "external_call_failure",
            Self::AggregationSkipped { .. } => "aggregation_skipped",
            Self::Cancelled => "cancelled",
        }
    }

    /// Check if re-running the same request might succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ExternalCallFailure(_) | Self::Cancelled)
    }
}
