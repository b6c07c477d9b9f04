//! HTTP transport for rationalized targets.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use crate::{
    config,
    core::{
        document::Document,
        error::{OrchestrationError, OrchestrationResult},
        mapping::ResponseShape,
        traits::{FetchRequest, Fetcher},
    },
};

/// [`Fetcher`] issuing GET requests with reqwest
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(cfg: &config::Fetch) -> OrchestrationResult<Self> {
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(cfg.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(cfg.pool_idle_timeout));

        if let Some(keepalive) = cfg.tcp_keepalive {
            builder = builder.tcp_keepalive(Duration::from_secs(keepalive));
        }
        if let Some(user_agent) = &cfg.user_agent {
            builder = builder.user_agent(user_agent);
        }

        let client = builder.build().map_err(|e| {
            OrchestrationError::Configuration(format!("Unable to build HTTP client: {e}"))
        })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> OrchestrationResult<Document> {
        let network_error = |e: reqwest::Error| OrchestrationError::Network {
            url: request.url.clone(),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(&request.url)
            .query(&request.params)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(OrchestrationError::Network {
                url: request.url.clone(),
                message: format!("unexpected status {status}"),
            });
        }

        let body = response.bytes().await.map_err(network_error)?;
        debug!("Received {} bytes from {}", body.len(), request.url);

        decode(&request.url, &body, &request.shape)
    }
}

/// Decode a response body and check it against `shape`.
pub fn decode(url: &str, body: &[u8], shape: &ResponseShape) -> OrchestrationResult<Document> {
    let decode_error = |message: String| OrchestrationError::Decode {
        url: url.to_string(),
        message,
    };

    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| decode_error(format!("invalid JSON: {e}")))?;
    let document = Document::from(value);

    if let Some(items) = document.child(&shape.items) {
        if !matches!(items, Document::List(_)) {
            return Err(decode_error(format!(
                "'{}' is a {}, shape {} expects a list",
                shape.items,
                items.type_name(),
                shape.id
            )));
        }
    }

    for (index, item) in document.items(&shape.items).iter().enumerate() {
        for required in &shape.required {
            if !has_path(item, required) {
                return Err(decode_error(format!(
                    "item {index} lacks '{required}' required by shape {}",
                    shape.id
                )));
            }
        }
    }

    Ok(document)
}

fn has_path(item: &Document, path: &str) -> bool {
    let mut current = item;
    for segment in path.split('.') {
        match current.child(segment) {
            Some(next) => current = next,
            None => return false,
        }
    }
    true
}
