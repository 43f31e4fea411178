//! Lotus JSON shapes.
//!
//! Only the fields pricing needs are decoded; everything else in the
//! node's responses is ignored. Big integers arrive as decimal strings.

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use terminator_types::token::bigint_string;
use terminator_types::{ChainEpoch, SmoothedEstimate, SnapshotHandle, TokenAmount};

/// IPLD link, `{"/": "bafy..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cid {
    #[serde(rename = "/")]
    pub root: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlockHeader {
    pub timestamp: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TipSet {
    pub cids: Vec<Cid>,
    #[serde(default)]
    pub blocks: Vec<BlockHeader>,
    pub height: ChainEpoch,
}

impl TipSet {
    pub fn into_snapshot(self) -> SnapshotHandle {
        SnapshotHandle::new(self.height, self.cids.into_iter().map(|c| c.root).collect())
    }
}

/// Tipset key parameter for a snapshot
pub fn tipset_key(snapshot: &SnapshotHandle) -> Vec<Cid> {
    snapshot
        .key
        .iter()
        .map(|root| Cid { root: root.clone() })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MinerInfo {
    pub sector_size: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Actor {
    pub code: Cid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SectorOnChainInfo {
    pub sector_number: u64,
    pub activation: ChainEpoch,
    pub expiration: ChainEpoch,
    #[serde(with = "bigint_string")]
    pub deal_weight: BigInt,
    #[serde(with = "bigint_string")]
    pub verified_deal_weight: BigInt,
    pub initial_pledge: TokenAmount,
    /// Epoch the sector's power was last recomputed; absent on old nodes
    #[serde(default)]
    pub power_base_epoch: Option<ChainEpoch>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FilterEstimate {
    #[serde(with = "bigint_string")]
    pub position_estimate: BigInt,
    #[serde(with = "bigint_string")]
    pub velocity_estimate: BigInt,
}

impl From<FilterEstimate> for SmoothedEstimate {
    fn from(e: FilterEstimate) -> Self {
        SmoothedEstimate::new(e.position_estimate, e.velocity_estimate)
    }
}

/// `StateReadState` envelope
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActorState<S> {
    pub state: S,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RewardState {
    pub this_epoch_reward_smoothed: FilterEstimate,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PowerState {
    #[serde(rename = "ThisEpochQAPowerSmoothed")]
    pub this_epoch_qa_power_smoothed: FilterEstimate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_tipset() {
        let ts: TipSet = serde_json::from_value(json!({
            "Cids": [{"/": "bafy2a"}, {"/": "bafy2b"}],
            "Blocks": [{"Timestamp": 1598306400, "Height": 0}],
            "Height": 4_500_000
        }))
        .unwrap();
        assert_eq!(ts.blocks[0].timestamp, 1_598_306_400);

        let snapshot = ts.into_snapshot();
        assert_eq!(snapshot.epoch, 4_500_000);
        assert_eq!(tipset_key(&snapshot), vec![
            Cid { root: "bafy2a".into() },
            Cid { root: "bafy2b".into() },
        ]);
        assert_eq!(
            serde_json::to_value(tipset_key(&snapshot)).unwrap(),
            json!([{"/": "bafy2a"}, {"/": "bafy2b"}])
        );
    }

    #[test]
    fn test_decode_sector() {
        let sector: SectorOnChainInfo = serde_json::from_value(json!({
            "SectorNumber": 42,
            "SealProof": 8,
            "SealedCID": {"/": "bagboea"},
            "DealIDs": null,
            "Activation": 100,
            "Expiration": 1_600_000,
            "DealWeight": "0",
            "VerifiedDealWeight": "1234",
            "InitialPledge": "5000000000000000000",
            "PowerBaseEpoch": 100,
            "Flags": 0
        }))
        .unwrap();
        assert_eq!(sector.sector_number, 42);
        assert_eq!(sector.verified_deal_weight, BigInt::from(1234));
        assert_eq!(sector.initial_pledge, TokenAmount::from_whole(5));
        assert_eq!(sector.power_base_epoch, Some(100));
    }

    #[test]
    fn test_decode_power_state() {
        let state: ActorState<PowerState> = serde_json::from_value(json!({
            "Balance": "0",
            "Code": {"/": "bafk"},
            "State": {
                "TotalRawBytePower": "1",
                "ThisEpochQAPowerSmoothed": {
                    "PositionEstimate": "340282366920938463463374607431768211456",
                    "VelocityEstimate": "-5"
                }
            }
        }))
        .unwrap();
        let estimate: SmoothedEstimate = state.state.this_epoch_qa_power_smoothed.into();
        assert_eq!(estimate.position, BigInt::from(1) << 128);
        assert_eq!(estimate.velocity, BigInt::from(-5));
    }
}
