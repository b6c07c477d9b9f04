//! Execution of legacy call plans
//!
//! Independent targets are fetched in parallel. Each dependent target waits
//! for a fresh fetch of its upstream, reads the dependency field from it and
//! then fetches with the extracted value as a request parameter.

use std::{sync::Arc, time::Instant};

use futures::{
    future::BoxFuture,
    stream::{FuturesUnordered, StreamExt},
    FutureExt,
};
use log::{debug, error};
use tokio::task::JoinHandle;

use crate::core::{
    document::Document,
    error::{OrchestrationError, OrchestrationResult},
    mapping::TargetDescriptor,
    metrics::{BACKEND_FETCHES, BACKEND_LATENCY},
    registry::PoolRegistry,
    traits::{FetchRequest, Fetcher},
};

use super::resolver::{DependentStep, ExecutionPlan};

/// A fetched document together with the target that produced it
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    pub target: Arc<TargetDescriptor>,
    pub document: Document,
}

type Pending<'a> = BoxFuture<'a, (usize, OrchestrationResult<ResponseRecord>)>;

/// Runs execution plans against the endpoint pools
pub struct ExecutionEngine {
    registry: Arc<PoolRegistry>,
    fetcher: Arc<dyn Fetcher>,
}

impl ExecutionEngine {
    pub fn new(registry: Arc<PoolRegistry>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { registry, fetcher }
    }

    pub fn registry(&self) -> &Arc<PoolRegistry> {
        &self.registry
    }

    /// Execute `plan` and return one record per independent and dependent target.
    ///
    /// Fails with the first failure observed. Work already started is never
    /// cancelled: every submitted fetch is awaited before returning, later
    /// failures are discarded.
    pub async fn execute(&self, plan: &ExecutionPlan) -> OrchestrationResult<Vec<ResponseRecord>> {
        let pending: FuturesUnordered<Pending<'_>> = FuturesUnordered::new();

        for (index, target) in plan.independent.iter().enumerate() {
            let handle = self.submit_fetch(target, FetchRequest::new(&target.url, target.shape.clone()));
            let target = target.clone();
            pending.push(
                async move {
                    let result = join(handle)
                        .await
                        .map(|document| ResponseRecord { target, document });
                    (index, result)
                }
                .boxed(),
            );
        }

        let offset = plan.independent.len();
        for (index, step) in plan.dependent.iter().enumerate() {
            pending.push(self.dependent_chain(step).map(move |r| (offset + index, r)).boxed());
        }

        let (records, first_error) = drain(pending).await;
        match first_error {
            Some(err) => Err(err),
            None => Ok(records),
        }
    }

    /// Upstream re-fetch, field extraction, then the dependent fetch.
    fn dependent_chain<'a>(
        &'a self,
        step: &DependentStep,
    ) -> BoxFuture<'a, OrchestrationResult<ResponseRecord>> {
        let upstream = step.upstream.clone();
        let target = step.target.clone();
        // the upstream fetch starts now, alongside the independent ones
        let upstream_handle =
            self.submit_fetch(&upstream, FetchRequest::new(&upstream.url, upstream.shape.clone()));

        async move {
            let upstream_document = join(upstream_handle).await?;

            let Some(dependency) = &target.dependency else {
                return Err(OrchestrationError::Internal(format!(
                    "{} has no dependency",
                    target.url
                )));
            };

            let value = upstream
                .shape
                .accessor()
                .read(&upstream_document, &dependency.field)?;
            debug!(
                "Extracted {}={value} from {} for {}",
                dependency.field, upstream.url, target.url
            );

            let request = FetchRequest::new(&target.url, target.shape.clone())
                .with_param(&dependency.param, value);
            let document = join(self.submit_fetch(&target, request)).await?;

            Ok(ResponseRecord { target, document })
        }
        .boxed()
    }

    fn submit_fetch(
        &self,
        target: &TargetDescriptor,
        request: FetchRequest,
    ) -> JoinHandle<OrchestrationResult<Document>> {
        let pool = self.registry.acquire_pool(&target.url, target.max_concurrency);
        let fetcher = self.fetcher.clone();
        pool.submit(async move { observed_fetch(fetcher.as_ref(), &request).await })
    }
}

async fn join(handle: JoinHandle<OrchestrationResult<Document>>) -> OrchestrationResult<Document> {
    handle.await?
}

async fn observed_fetch(fetcher: &dyn Fetcher, request: &FetchRequest) -> OrchestrationResult<Document> {
    debug!("Fetching {} {:?}", request.url, request.params);
    let start = Instant::now();
    let result = fetcher.fetch(request).await;

    let outcome = match &result {
        Ok(_) => "ok",
        Err(err) => err.kind(),
    };
    BACKEND_FETCHES
        .with_label_values(&[request.url.as_str(), outcome])
        .inc();
    BACKEND_LATENCY
        .with_label_values(&[request.url.as_str()])
        .observe(start.elapsed().as_millis() as f64);

    result
}

/// Await every pending future; keep the records in plan order and the first failure.
async fn drain(
    mut pending: FuturesUnordered<Pending<'_>>,
) -> (Vec<ResponseRecord>, Option<OrchestrationError>) {
    let mut records = Vec::with_capacity(pending.len());
    let mut first_error = None;

    while let Some((index, result)) = pending.next().await {
        match result {
            Ok(record) => records.push((index, record)),
            Err(err) if first_error.is_none() => {
                error!("Legacy call failed: {err}");
                first_error = Some(err);
            }
            Err(err) => debug!("Discarding later failure: {err}"),
        }
    }

    records.sort_by_key(|(index, _)| *index);
    (records.into_iter().map(|(_, record)| record).collect(), first_error)
}
