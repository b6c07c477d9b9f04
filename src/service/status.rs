use std::sync::Arc;

use async_trait::async_trait;
use http::{Response, StatusCode};
use pingora::{
    apps::http_app::ServeHttp, protocols::http::ServerSession, services::listening::Service,
};
use serde::Serialize;

use crate::{
    config::Status,
    core::{registry::PoolRegistry, status},
    utils::response::ResponseBuilder,
};

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// HTTP application for the status endpoints.
///
/// - `/status/ready`: 200 once the mappings are loaded, 503 before
/// - `/status/pools`: url, size and in-flight count of every endpoint pool
///
/// Kept apart from the legacy listeners so probes never hit the backends.
pub struct StatusHttpApp {
    config: Status,
    registry: Arc<PoolRegistry>,
}

impl StatusHttpApp {
    pub fn new(cfg: &Status, registry: Arc<PoolRegistry>) -> Self {
        Self {
            config: cfg.clone(),
            registry,
        }
    }

    pub fn status_http_service(cfg: &Status, registry: Arc<PoolRegistry>) -> Service<Self> {
        let app = Self::new(cfg, registry);
        let addr = &app.config.address.to_string();
        let mut service = Service::new("Status HTTP".to_string(), app);
        service.add_tcp(addr);
        service
    }

    pub fn handle(&self, path: &str) -> Response<Vec<u8>> {
        match path {
            "/status/ready" => handle_ready_endpoint(),
            "/status/pools" => ResponseBuilder::json(StatusCode::OK, &self.registry.snapshot()),
            _ => ResponseBuilder::not_found(),
        }
    }
}

#[async_trait]
impl ServeHttp for StatusHttpApp {
    async fn response(&self, http_session: &mut ServerSession) -> Response<Vec<u8>> {
        http_session.set_keepalive(None);

        let path = http_session.req_header().uri.path().to_string();
        self.handle(&path)
    }
}

fn handle_ready_endpoint() -> Response<Vec<u8>> {
    if status::is_ready() {
        let response = StatusResponse {
            status: "ok".to_string(),
            error: None,
        };
        ResponseBuilder::json(StatusCode::OK, &response)
    } else {
        let response = StatusResponse {
            status: "error".to_string(),
            error: Some("Legacy mappings not loaded yet".to_string()),
        };
        ResponseBuilder::json(StatusCode::SERVICE_UNAVAILABLE, &response)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use crate::core::status::tests::TEST_LOCK;

    use super::*;

    fn app() -> StatusHttpApp {
        let cfg = Status {
            address: "127.0.0.1:7085".parse().unwrap(),
        };
        StatusHttpApp::new(&cfg, Arc::new(PoolRegistry::new()))
    }

    #[test]
    fn test_ready_endpoint() {
        let _guard = TEST_LOCK.lock().unwrap();
        let app = app();

        status::reset();
        let response = app.handle("/status/ready");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        status::mark_ready(1);
        let response = app.handle("/status/ready");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), br#"{"status":"ok"}"#);
    }

    #[test]
    fn test_pools_endpoint() {
        let app = app();
        app.registry.acquire_pool("http://a.internal/items", 3);

        let response = app.handle("/status/pools");
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(
            body,
            json!([{"url": "http://a.internal/items", "size": 3, "in_flight": 0}])
        );
    }

    #[test]
    fn test_unknown_path() {
        assert_eq!(app().handle("/status/other").status(), StatusCode::NOT_FOUND);
    }
}
