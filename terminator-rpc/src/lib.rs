//! Lotus JSON-RPC chain-state client
//!
//! Implements the engine's [`ChainState`](terminator_engine::ChainState)
//! collaborator over a full node's `Filecoin.*` API.
//!
//! ```ignore
//! use terminator_rpc::{ApiEndpoint, LotusClient};
//!
//! let endpoint = ApiEndpoint::from_env().transpose()?.unwrap_or_default();
//! let chain = Arc::new(LotusClient::new(endpoint)?);
//! let calculator = TerminationCalculator::new(chain, Arc::new(ProtocolPenalties));
//! ```

pub mod error;
pub mod endpoint;
pub mod types;
pub mod client;
pub mod chain;

pub use error::{RpcError, RpcResult};
pub use endpoint::{ApiEndpoint, API_INFO_ENV, DEFAULT_API_URL};
pub use client::{LotusClient, LotusClientConfig};
pub use chain::actors_version;
