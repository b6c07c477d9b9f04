//! Legacy call orchestration
//!
//! Resolves a mapping into an execution plan, executes it through the
//! endpoint pools and aggregates the records into the legacy response.

pub mod aggregator;
pub mod executor;
pub mod reload;
pub mod resolver;


use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;
use log::{error, info};
use uuid::Uuid;

use crate::core::{
    error::{OrchestrationError, OrchestrationResult},
    mapping::LegacyMapping,
    metrics::LEGACY_CALLS,
    registry::PoolRegistry,
    traits::Fetcher,
};

pub use aggregator::{AggregatedLegacyResponse, LegacyEntry, ResponseAggregator};
pub use executor::{ExecutionEngine, ResponseRecord};
pub use reload::MappingReloader;
pub use resolver::{resolve, DependentStep, ExecutionPlan};

type MappingTable = HashMap<String, Arc<LegacyMapping>>;

/// Serves legacy calls from the configured mappings
pub struct LegacyOrchestrator {
    mappings: ArcSwap<MappingTable>,
    engine: ExecutionEngine,
}

impl LegacyOrchestrator {
    pub fn new(
        mappings: Vec<Arc<LegacyMapping>>,
        registry: Arc<PoolRegistry>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            mappings: ArcSwap::from_pointee(Self::table(mappings)),
            engine: ExecutionEngine::new(registry, fetcher),
        }
    }

    fn table(mappings: Vec<Arc<LegacyMapping>>) -> MappingTable {
        mappings
            .into_iter()
            .map(|mapping| (mapping.legacy.clone(), mapping))
            .collect()
    }

    /// Replace every mapping. Endpoint pools are kept as they are.
    pub fn reload(&self, mappings: Vec<Arc<LegacyMapping>>) {
        info!("Reloading {} legacy mappings", mappings.len());
        self.mappings.store(Arc::new(Self::table(mappings)));
    }

    pub fn mapping(&self, legacy_api_id: &str) -> Option<Arc<LegacyMapping>> {
        self.mappings.load().get(legacy_api_id).cloned()
    }

    pub fn registry(&self) -> &Arc<PoolRegistry> {
        self.engine.registry()
    }

    /// Serve one legacy call end to end.
    pub async fn execute_legacy_call(
        &self,
        legacy_api_id: &str,
    ) -> OrchestrationResult<AggregatedLegacyResponse> {
        let call_id = Uuid::new_v4();
        info!("[{call_id}] Legacy call {legacy_api_id}");

        let result = self.run(legacy_api_id).await;

        let outcome = match &result {
            Ok(response) => {
                info!(
                    "[{call_id}] Legacy call {legacy_api_id} produced {} entries",
                    response.entries.len()
                );
                "ok"
            }
            Err(err) => {
                error!("[{call_id}] Legacy call {legacy_api_id} failed: {err}");
                err.kind()
            }
        };
        // unknown paths share one label to bound cardinality
        let legacy_label = match &result {
            Err(OrchestrationError::MappingNotFound(_)) => "unmapped",
            _ => legacy_api_id,
        };
        LEGACY_CALLS
            .with_label_values(&[legacy_label, outcome])
            .inc();

        result
    }

    async fn run(&self, legacy_api_id: &str) -> OrchestrationResult<AggregatedLegacyResponse> {
        let mapping = self
            .mapping(legacy_api_id)
            .ok_or_else(|| OrchestrationError::MappingNotFound(legacy_api_id.to_string()))?;

        let plan = resolve(&mapping)?;
        let records = self.engine.execute(&plan).await?;

        ResponseAggregator::new(&mapping.aggregation).aggregate(&records)
    }
}
