//! RPC layer errors

use terminator_types::TerminatorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RpcError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpRequestFailed(String),

    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Non-2xx HTTP status
    #[error("Server error ({code}): {message}")]
    ServerError { code: u16, message: String },

    /// Error object in a JSON-RPC response
    #[error("RPC error ({code}): {message}")]
    Rpc { code: i64, message: String },

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// Unusable endpoint or `FULLNODE_API_INFO` value
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type RpcResult<T> = Result<T, RpcError>;

impl RpcError {
    /// The node answered, but with an error for this call
    pub fn is_rpc_error(&self) -> bool {
        matches!(self, RpcError::Rpc { .. })
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        RpcError::DeserializationError(e.to_string())
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            RpcError::ConnectionRefused(e.to_string())
        } else if e.is_timeout() {
            RpcError::Timeout(e.to_string())
        } else if e.is_decode() {
            RpcError::DeserializationError(e.to_string())
        } else {
            RpcError::HttpRequestFailed(e.to_string())
        }
    }
}

impl From<RpcError> for TerminatorError {
    fn from(e: RpcError) -> Self {
        TerminatorError::ExternalCallFailure(e.to_string())
    }
}
