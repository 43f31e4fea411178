//! Node endpoint resolution.
//!
//! Lotus publishes its API as `TOKEN:/ip4/<host>/tcp/<port>/http` in
//! `FULLNODE_API_INFO`. Plain URLs are accepted too.

use crate::error::{RpcError, RpcResult};

pub const API_INFO_ENV: &str = "FULLNODE_API_INFO";
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:1234/rpc/v1";

const RPC_PATH: &str = "/rpc/v1";

/// JSON-RPC endpoint plus optional bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoint {
    pub url: String,
    pub token: Option<String>,
}

impl Default for ApiEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl ApiEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.is_empty()).then_some(token);
        self
    }

    /// Parse a `FULLNODE_API_INFO` style value
    pub fn parse_api_info(raw: &str) -> RpcResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(RpcError::InvalidEndpoint("empty API info".to_string()));
        }
        if is_url(raw) {
            return Ok(Self::new(raw));
        }

        let (token, addr) = match raw.split_once(':') {
            _ if raw.starts_with('/') => (None, raw),
            Some((token, addr)) if !addr.is_empty() => (Some(token), addr),
            _ => (None, raw),
        };

        let url = if is_url(addr) {
            addr.to_string()
        } else if addr.starts_with('/') {
            multiaddr_to_url(addr)?
        } else {
            return Err(RpcError::InvalidEndpoint(format!("unrecognised API address {:?}", addr)));
        };

        let endpoint = Self::new(url);
        Ok(match token {
            Some(token) => endpoint.with_token(token),
            None => endpoint,
        })
    }

    /// Endpoint from `FULLNODE_API_INFO`, if set
    pub fn from_env() -> Option<RpcResult<Self>> {
        std::env::var(API_INFO_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| Self::parse_api_info(&v))
    }
}

fn is_url(s: &str) -> bool {
    ["http://", "https://", "ws://", "wss://"]
        .iter()
        .any(|scheme| s.starts_with(scheme))
}

/// `/ip4/127.0.0.1/tcp/1234/http` -> `http://127.0.0.1:1234/rpc/v1`
fn multiaddr_to_url(addr: &str) -> RpcResult<String> {
    let invalid = |reason: &str| RpcError::InvalidEndpoint(format!("{:?}: {}", addr, reason));
    let parts: Vec<&str> = addr.trim_matches('/').split('/').collect();

    let mut host = None;
    let mut port = None;
    let mut scheme = "http";
    let mut i = 0;
    while i < parts.len() {
        match parts[i] {
            "ip4" | "dns" | "dns4" | "dns6" => {
                host = Some(parts.get(i + 1).ok_or_else(|| invalid("missing host"))?.to_string());
                i += 2;
            }
            "ip6" => {
                let h = parts.get(i + 1).ok_or_else(|| invalid("missing host"))?;
                host = Some(format!("[{}]", h));
                i += 2;
            }
            "tcp" => {
                let p = parts.get(i + 1).ok_or_else(|| invalid("missing port"))?;
                let p: u16 = p.parse().map_err(|_| invalid("bad port"))?;
                port = Some(p);
                i += 2;
            }
            "http" | "ws" => {
                scheme = "http";
                i += 1;
            }
            "https" | "wss" | "tls" => {
                scheme = "https";
                i += 1;
            }
            other => return Err(invalid(&format!("unsupported component {:?}", other))),
        }
    }

    let host = host.ok_or_else(|| invalid("missing host"))?;
    let port = port.ok_or_else(|| invalid("missing port"))?;
    Ok(format!("{}://{}:{}{}", scheme, host, port, RPC_PATH))
}
