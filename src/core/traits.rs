//! Core traits for pinglegacy components
//!
//! The transport used to reach rationalized targets is a collaborator of the
//! orchestration core, reached only through [`Fetcher`].

use std::sync::Arc;

use async_trait::async_trait;

use super::{document::Document, error::OrchestrationResult, mapping::ResponseShape};

/// A single backend request
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub shape: Arc<ResponseShape>,
    /// Query parameters appended to the url
    pub params: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, shape: Arc<ResponseShape>) -> Self {
        Self {
            url: url.into(),
            shape,
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }
}

/// Fetch capability: `fetch(url, shape) -> document`
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch and decode one document, failing with `Network` or `Decode`.
    async fn fetch(&self, request: &FetchRequest) -> OrchestrationResult<Document>;
}
