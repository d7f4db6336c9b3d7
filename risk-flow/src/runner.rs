//! ConsoleRunner – creates console sessions, persists them, and resolves a
//! session id back to its live [`ConsoleSession`].
//!
//! A web front-end holds one runner for the lifetime of the process and
//! looks sessions up per request:
//! ```rust,ignore
//! let session = state.runner.open(&session_id).await?;
//! let view = session.submit().await?;
//! ```
//! Each browser tab gets its own session and therefore its own shell state;
//! nothing is shared between sessions except the prediction service client.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{
    client::PredictionService,
    config::FlowConfig,
    error::{FlowError, Result},
    session::ConsoleSession,
    storage::SessionStorage,
};

#[derive(Clone)]
pub struct ConsoleRunner {
    service: Arc<dyn PredictionService>,
    storage: Arc<dyn SessionStorage>,
    config: FlowConfig,
}

impl ConsoleRunner {
    pub fn new(
        service: Arc<dyn PredictionService>,
        storage: Arc<dyn SessionStorage>,
        config: FlowConfig,
    ) -> Self {
        Self {
            service,
            storage,
            config,
        }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Create and store a fresh session on the manual tab.
    pub async fn create(&self) -> Result<Arc<ConsoleSession>> {
        let session = ConsoleSession::new(self.service.clone(), &self.config);
        self.storage.save(session.clone()).await?;
        info!(session_id = %session.id(), "Console session created");
        Ok(session)
    }

    /// Look a session up and mark it active.
    pub async fn open(&self, session_id: &str) -> Result<Arc<ConsoleSession>> {
        let session = self
            .storage
            .get(session_id)
            .await?
            .ok_or_else(|| FlowError::SessionNotFound(session_id.to_string()))?;
        session.touch();
        Ok(session)
    }

    /// Drop a session. Unknown ids are reported as not found.
    pub async fn close(&self, session_id: &str) -> Result<()> {
        let session = self.open(session_id).await?;
        session.cancel_alert().await;
        self.storage.delete(session_id).await?;
        info!(session_id = %session_id, "Console session closed");
        Ok(())
    }

    /// Drop every session idle for longer than `max_idle`, cancelling any
    /// alert still being sent. Returns how many were dropped.
    pub async fn evict_idle(&self, max_idle: Duration) -> Result<usize> {
        let evicted = self.storage.evict_idle(max_idle).await?;
        for session in &evicted {
            session.cancel_alert().await;
            info!(session_id = %session.id(), "Idle console session evicted");
        }
        Ok(evicted.len())
    }

    /// Periodically evict idle sessions, per `config.session_idle_ttl`.
    ///
    /// Returns `None` when eviction is disabled. Must be called inside a
    /// tokio runtime.
    pub fn spawn_idle_sweep(&self) -> Option<JoinHandle<()>> {
        let ttl = self.config.session_idle_ttl?;
        let runner = self.clone();
        let period = (ttl / 4).max(Duration::from_secs(1));
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if let Err(err) = runner.evict_idle(ttl).await {
                    warn!("Idle session sweep failed: {}", err);
                }
            }
        }))
    }
}
