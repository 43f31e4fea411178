//! JSON-RPC client for a Lotus full node.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use terminator_types::{ChainEpoch, SectorNumber, SnapshotHandle};
use tracing::{debug, error, instrument};

use crate::endpoint::ApiEndpoint;
use crate::error::{RpcError, RpcResult};
use crate::types::{
    tipset_key, Actor, ActorState, Cid, MinerInfo, PowerState, RewardState, SectorOnChainInfo, TipSet,
};

/// Reward actor
pub const REWARD_ACTOR: &str = "f02";
/// Storage power actor
pub const POWER_ACTOR: &str = "f04";

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: String,
    params: &'a Value,
    id: u64,
}

#[derive(Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Read-only Lotus API client
///
/// # Example
///
/// ```ignore
/// let client = LotusClient::new(ApiEndpoint::parse_api_info(&info)?)?;
/// let head = client.chain_head().await?;
/// ```
#[derive(Debug)]
pub struct LotusClient {
    client: Client,
    url: String,
    token: Option<String>,
    next_id: AtomicU64,
}

impl LotusClient {
    pub fn new(endpoint: ApiEndpoint) -> RpcResult<Self> {
        Self::with_config(endpoint, LotusClientConfig::default())
    }

    pub fn with_config(endpoint: ApiEndpoint, config: LotusClientConfig) -> RpcResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.max_idle_connections)
            .build()
            .map_err(|e| RpcError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            url: endpoint.url.trim_end_matches('/').to_string(),
            token: endpoint.token,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call `Filecoin.<method>`; a null result is `None`
    #[instrument(skip(self, params), fields(url = %self.url))]
    pub async fn call_optional<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> RpcResult<Option<R>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest {
            jsonrpc: "2.0",
            method: format!("Filecoin.{}", method),
            params: &params,
            id,
        };

        debug!(id, "Sending JSON-RPC request");
        let mut request = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Node returned error");
            return Err(RpcError::ServerError {
                code: status.as_u16(),
                message: body,
            });
        }

        let envelope: RpcResponse<R> = response
            .json()
            .await
            .map_err(|e| RpcError::DeserializationError(e.to_string()))?;

        if let Some(err) = envelope.error {
            debug!(code = err.code, message = %err.message, "JSON-RPC error");
            return Err(RpcError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(envelope.result)
    }

    /// Call `Filecoin.<method>`; a null result is an error
    pub async fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> RpcResult<R> {
        self.call_optional(method, params).await?.ok_or_else(|| {
            RpcError::DeserializationError(format!("{} returned no result", method))
        })
    }

    pub async fn chain_head(&self) -> RpcResult<TipSet> {
        self.call("ChainHead", json!([])).await
    }

    pub async fn chain_get_genesis(&self) -> RpcResult<TipSet> {
        self.call("ChainGetGenesis", json!([])).await
    }

    /// Tipset at `height`, or the last one before it on a null round
    pub async fn chain_get_tipset_by_height(&self, height: ChainEpoch) -> RpcResult<TipSet> {
        self.call("ChainGetTipSetByHeight", json!([height, []])).await
    }

    pub async fn state_network_version(&self, at: &SnapshotHandle) -> RpcResult<u32> {
        self.call("StateNetworkVersion", json!([tipset_key(at)])).await
    }

    pub async fn state_get_actor(&self, address: &str, at: &SnapshotHandle) -> RpcResult<Actor> {
        self.call("StateGetActor", json!([address, tipset_key(at)])).await
    }

    /// Builtin actor code CIDs by actor name for a network version
    pub async fn state_actor_code_cids(
        &self,
        version: u32,
    ) -> RpcResult<HashMap<String, Cid>> {
        self.call("StateActorCodeCIDs", json!([version])).await
    }

    pub async fn state_miner_info(&self, address: &str, at: &SnapshotHandle) -> RpcResult<MinerInfo> {
        self.call("StateMinerInfo", json!([address, tipset_key(at)])).await
    }

    pub async fn state_miner_sectors(
        &self,
        address: &str,
        at: &SnapshotHandle,
    ) -> RpcResult<Vec<SectorOnChainInfo>> {
        // null for miners without sectors
        Ok(self
            .call_optional("StateMinerSectors", json!([address, null, tipset_key(at)]))
            .await?
            .unwrap_or_default())
    }

    pub async fn state_sector_get_info(
        &self,
        address: &str,
        sector: SectorNumber,
        at: &SnapshotHandle,
    ) -> RpcResult<Option<SectorOnChainInfo>> {
        self.call_optional("StateSectorGetInfo", json!([address, sector, tipset_key(at)]))
            .await
    }

    pub async fn reward_state(&self, at: &SnapshotHandle) -> RpcResult<RewardState> {
        let state: ActorState<RewardState> = self
            .call("StateReadState", json!([REWARD_ACTOR, tipset_key(at)]))
            .await?;
        Ok(state.state)
    }

    pub async fn power_state(&self, at: &SnapshotHandle) -> RpcResult<PowerState> {
        let state: ActorState<PowerState> = self
            .call("StateReadState", json!([POWER_ACTOR, tipset_key(at)]))
            .await?;
        Ok(state.state)
    }
}

/// Configuration for LotusClient
#[derive(Debug, Clone)]
pub struct LotusClientConfig {
    /// Request timeout; sector listings of large miners are slow
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Maximum idle connections per host
    pub max_idle_connections: usize,
}

impl Default for LotusClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
            max_idle_connections: 32,
        }
    }
}

impl LotusClientConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
