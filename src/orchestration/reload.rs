//! Mapping reload from the config file.
//!
//! Only shapes and mappings are picked up. Listeners, logging and the other
//! server sections need a restart.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::{error, info};
use pingora_core::{server::ShutdownWatch, services::background::BackgroundService};
use tokio::{sync::Mutex, time::sleep};

use crate::{
    config::{Config, Reload},
    core::{
        error::{OrchestrationError, OrchestrationResult},
        loader::MappingLoader,
    },
};

use super::LegacyOrchestrator;

/// Background service re-reading the config file and swapping in its mappings
pub struct MappingReloader {
    path: String,
    interval: Duration,
    orchestrator: Arc<LegacyOrchestrator>,
    // content of the last file version seen, valid or not
    last: Mutex<String>,
}

impl MappingReloader {
    pub fn new(path: &str, cfg: &Reload, orchestrator: Arc<LegacyOrchestrator>) -> Self {
        let current = std::fs::read_to_string(path).unwrap_or_default();
        Self {
            path: path.to_string(),
            interval: Duration::from_secs(cfg.interval),
            orchestrator,
            last: Mutex::new(current),
        }
    }

    /// Reload the mappings if the file changed since the last check.
    ///
    /// A file that fails to parse or validate leaves the current mappings in
    /// place and is not retried until it changes again.
    pub async fn check(&self) -> OrchestrationResult<bool> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            OrchestrationError::Configuration(format!("Unable to read {}: {e}", self.path))
        })?;

        let mut last = self.last.lock().await;
        if *last == content {
            return Ok(false);
        }
        *last = content;

        let config = Config::from_yaml(&last)
            .map_err(|e| OrchestrationError::Configuration(e.to_string()))?;
        let mappings = MappingLoader::load(&config)?;
        self.orchestrator.reload(mappings);

        Ok(true)
    }
}

#[async_trait]
impl BackgroundService for MappingReloader {
    async fn start(&self, mut shutdown: ShutdownWatch) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
                _ = sleep(self.interval) => {
                    match self.check().await {
                        Ok(true) => info!("Legacy mappings reloaded from {}", self.path),
                        Ok(false) => {}
                        Err(e) => error!("Keeping current legacy mappings: {e}"),
                    }
                }
            }
        }
    }
}
