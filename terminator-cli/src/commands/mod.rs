//! Command handlers

pub mod batch;
pub mod calculate;
pub mod config;
pub mod strategy;
pub mod tools;

use anyhow::Result;
use std::sync::Arc;
use terminator_engine::{BatchScheduler, ProtocolPenalties, TerminationCalculator};
use terminator_rpc::LotusClient;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Settings shared by every command
pub struct Context {
    pub config: crate::config::Config,
    pub api_url: Option<String>,
    pub verbose: bool,
}

impl Context {
    /// Client for the configured node
    pub fn connect(&self) -> Result<Arc<LotusClient>> {
        let endpoint = self.config.resolve_endpoint(self.api_url.as_deref())?;
        debug!(url = %endpoint.url, token = endpoint.token.is_some(), "Connecting to node");
        Ok(Arc::new(LotusClient::new(endpoint)?))
    }

    pub fn calculator(&self) -> Result<TerminationCalculator> {
        Ok(TerminationCalculator::new(
            self.connect()?,
            Arc::new(ProtocolPenalties::new()),
        ))
    }

    /// Scheduler whose remaining tasks are cancelled on Ctrl-C
    pub fn scheduler(&self, workers: Option<usize>) -> BatchScheduler {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling remaining tasks");
                on_signal.cancel();
            }
        });
        BatchScheduler::new(workers.unwrap_or(self.config.workers)).with_cancellation(cancel)
    }
}
