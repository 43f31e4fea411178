//! Sector records and chain snapshot handles.
//!
//! These mirror what the chain-state service returns. They are read-only
//! inputs to pricing; nothing in this workspace mutates them.

use num_bigint::BigInt;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::epoch::ChainEpoch;
use crate::token::{bigint_string, TokenAmount};

pub type SectorNumber = u64;

/// Protocol network version reported for a snapshot
pub type NetworkVersion = u32;

const QUALITY_BASE_MULTIPLIER: u32 = 10;
const DEAL_WEIGHT_MULTIPLIER: u32 = 10;
const VERIFIED_DEAL_WEIGHT_MULTIPLIER: u32 = 100;
const SECTOR_QUALITY_PRECISION: usize = 20;

/// A storage commitment at a given snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub number: SectorNumber,
    pub activation: ChainEpoch,
    pub expiration: ChainEpoch,
    pub initial_pledge: TokenAmount,
    /// Quality-adjusted power in bytes
    #[serde(with = "bigint_string")]
    pub qa_power: BigInt,
}

impl Sector {
    /// Whether the sector has reached natural expiration at `epoch`
    pub fn is_expired_at(&self, epoch: ChainEpoch) -> bool {
        epoch >= self.expiration
    }
}

/// Per-operator constants read from the operator's account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorInfo {
    /// Raw sector size in bytes
    pub sector_size: u64,
    /// Actor code version of the operator's account
    pub actor_version: u32,
}

/// Opaque reference to chain state at one height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHandle {
    pub epoch: ChainEpoch,
    /// Block CIDs making up the tipset key
    pub key: Vec<String>,
}

impl SnapshotHandle {
    pub fn new(epoch: ChainEpoch, key: Vec<String>) -> Self {
        Self { epoch, key }
    }
}

/// Quality-adjusted power of a sector from its deal weights.
///
/// `duration` is the sector's power lifetime in epochs. Weights are in
/// byte-epochs. Unverified and verified deal space get their own
/// multipliers, the remainder is weighted at the base multiplier.
pub fn qa_power_for_weight(
    sector_size: u64,
    duration: ChainEpoch,
    deal_weight: &BigInt,
    verified_deal_weight: &BigInt,
) -> BigInt {
    let size = BigInt::from(sector_size);
    if duration <= 0 {
        return size;
    }
    let space_time = &size * BigInt::from(duration);
    if space_time.is_zero() {
        return size;
    }

    let deal_space_time = deal_weight + verified_deal_weight;
    let base_multiplier = BigInt::from(QUALITY_BASE_MULTIPLIER);
    let weighted_base = (&space_time - &deal_space_time) * &base_multiplier;
    let weighted_deal = deal_weight * BigInt::from(DEAL_WEIGHT_MULTIPLIER);
    let weighted_verified = verified_deal_weight * BigInt::from(VERIFIED_DEAL_WEIGHT_MULTIPLIER);
    let weighted_sum = weighted_base + weighted_deal + weighted_verified;

    let quality = ((weighted_sum << SECTOR_QUALITY_PRECISION) / &space_time) / base_multiplier;
    (size * quality) >> SECTOR_QUALITY_PRECISION
}
