//! [`ChainState`] over a Lotus node.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use terminator_engine::ChainState;
use terminator_types::{
    qa_power_for_weight, ChainEpoch, NetworkVersion, OperatorId, OperatorInfo, Sector,
    SectorNumber, SmoothedEstimate, SnapshotHandle, TerminatorError, TerminatorResult,
};
use tracing::{debug, instrument};

use crate::client::LotusClient;
use crate::types::SectorOnChainInfo;

const MINER_ACTOR_NAME: &str = "storageminer";

/// Builtin-actors version deployed at a network version.
///
/// Versions past the last known upgrade report the last known actors
/// version, which is enough for the minimum-version gate.
pub fn actors_version(nv: NetworkVersion) -> u32 {
    match nv {
        0..=3 => 0,
        4..=9 => 2,
        10..=11 => 3,
        12 => 4,
        13 => 5,
        14 => 6,
        15 => 7,
        16 => 8,
        17 => 9,
        18 => 10,
        19..=20 => 11,
        21 => 12,
        22 => 13,
        23 => 14,
        24 => 15,
        _ => 16,
    }
}

fn to_sector(info: SectorOnChainInfo, sector_size: u64) -> Sector {
    let power_base = info.power_base_epoch.unwrap_or(info.activation);
    let qa_power = qa_power_for_weight(
        sector_size,
        info.expiration - power_base,
        &info.deal_weight,
        &info.verified_deal_weight,
    );
    Sector {
        number: info.sector_number,
        activation: info.activation,
        expiration: info.expiration,
        initial_pledge: info.initial_pledge,
        qa_power,
    }
}

#[async_trait]
impl ChainState for LotusClient {
    async fn chain_head(&self) -> TerminatorResult<SnapshotHandle> {
        Ok(LotusClient::chain_head(self).await?.into_snapshot())
    }

    #[instrument(skip(self))]
    async fn snapshot_at(&self, epoch: ChainEpoch) -> TerminatorResult<SnapshotHandle> {
        match self.chain_get_tipset_by_height(epoch).await {
            Ok(ts) => {
                if ts.height != epoch {
                    debug!(requested = epoch, found = ts.height, "Null round, using parent tipset");
                }
                Ok(ts.into_snapshot())
            }
            Err(e) if e.is_rpc_error() => {
                Err(TerminatorError::snapshot_unavailable(epoch, e.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn network_version(&self, snapshot: &SnapshotHandle) -> TerminatorResult<NetworkVersion> {
        Ok(self.state_network_version(snapshot).await?)
    }

    #[instrument(skip(self, snapshot), fields(epoch = snapshot.epoch))]
    async fn operator_info(
        &self,
        snapshot: &SnapshotHandle,
        operator: &OperatorId,
    ) -> TerminatorResult<OperatorInfo> {
        let nv = self.state_network_version(snapshot).await?;
        let actor = self.state_get_actor(operator.as_str(), snapshot).await?;
        let codes = self.state_actor_code_cids(nv).await?;

        let expected = codes.get(MINER_ACTOR_NAME).ok_or_else(|| {
            TerminatorError::external(format!("no miner actor code for network version {}", nv))
        })?;
        if *expected != actor.code {
            return Err(TerminatorError::external(format!(
                "unsupported miner actor code {} for {}",
                actor.code.root, operator
            )));
        }

        let info = self.state_miner_info(operator.as_str(), snapshot).await?;
        Ok(OperatorInfo {
            sector_size: info.sector_size,
            actor_version: actors_version(nv),
        })
    }

    #[instrument(skip(self, snapshot, filter), fields(epoch = snapshot.epoch))]
    async fn sectors(
        &self,
        snapshot: &SnapshotHandle,
        operator: &OperatorId,
        filter: Option<&[SectorNumber]>,
    ) -> TerminatorResult<Vec<Sector>> {
        let sector_size = self.state_miner_info(operator.as_str(), snapshot).await?.sector_size;

        let infos = match filter {
            None => self.state_miner_sectors(operator.as_str(), snapshot).await?,
            Some(numbers) => {
                let mut infos = Vec::with_capacity(numbers.len());
                for &number in numbers {
                    let info = self
                        .state_sector_get_info(operator.as_str(), number, snapshot)
                        .await?
                        .ok_or_else(|| {
                            TerminatorError::external(format!("sector {} not found", number))
                        })?;
                    infos.push(info);
                }
                infos
            }
        };

        debug!(count = infos.len(), "Loaded sectors");
        Ok(infos.into_iter().map(|info| to_sector(info, sector_size)).collect())
    }

    async fn reward_signal(&self, snapshot: &SnapshotHandle) -> TerminatorResult<SmoothedEstimate> {
        Ok(self.reward_state(snapshot).await?.this_epoch_reward_smoothed.into())
    }

    async fn power_signal(&self, snapshot: &SnapshotHandle) -> TerminatorResult<SmoothedEstimate> {
        Ok(self.power_state(snapshot).await?.this_epoch_qa_power_smoothed.into())
    }

    async fn genesis_time(&self) -> TerminatorResult<DateTime<Utc>> {
        let genesis = self.chain_get_genesis().await?;
        let timestamp = genesis
            .blocks
            .first()
            .map(|b| b.timestamp)
            .ok_or_else(|| TerminatorError::external("genesis tipset has no blocks"))?;
        DateTime::from_timestamp(timestamp as i64, 0)
            .ok_or_else(|| TerminatorError::external(format!("bad genesis timestamp {}", timestamp)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use terminator_types::TokenAmount;

    #[test]
    fn test_actors_version_table() {
        assert_eq!(actors_version(16), 8);
        assert_eq!(actors_version(20), 11);
        assert_eq!(actors_version(24), 15);
        assert_eq!(actors_version(25), 16);
        assert!(actors_version(27) >= 16);
    }

    #[test]
    fn test_to_sector_uses_power_base_epoch() {
        let size: u64 = 32 << 30;
        let duration: i64 = 1_000_000;
        let info = SectorOnChainInfo {
            sector_number: 7,
            activation: 100,
            expiration: 500 + duration,
            deal_weight: BigInt::from(0),
            verified_deal_weight: BigInt::from(size) * BigInt::from(duration),
            initial_pledge: TokenAmount::from_whole(1),
            power_base_epoch: Some(500),
        };
        let sector = to_sector(info, size);
        assert_eq!(sector.number, 7);
        assert_eq!(sector.qa_power, BigInt::from(size) * BigInt::from(10));
    }
}
