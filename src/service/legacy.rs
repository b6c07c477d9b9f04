use std::sync::Arc;

use async_trait::async_trait;
use http::{Method, Response, StatusCode};
use pingora::{
    apps::http_app::ServeHttp, protocols::http::ServerSession, services::listening::Service,
};
use pingora_core::listeners::tls::TlsSettings;
use pingora_error::{ErrorType::InternalError, OrErr, Result};

use crate::{config::Listener, orchestration::LegacyOrchestrator, utils::response::ResponseBuilder};

/// HTTP application answering legacy API calls.
///
/// The request path is the legacy API identifier. Only GET is served.
pub struct LegacyHttpApp {
    orchestrator: Arc<LegacyOrchestrator>,
}

impl LegacyHttpApp {
    pub fn new(orchestrator: Arc<LegacyOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Build the listening service with one endpoint per configured listener
    pub fn legacy_http_service(
        orchestrator: Arc<LegacyOrchestrator>,
        listeners: &[Listener],
    ) -> Result<Service<Self>> {
        let mut service = Service::new("Legacy HTTP".to_string(), Self::new(orchestrator));

        for listener in listeners {
            let address = listener.address.to_string();
            match &listener.tls {
                Some(tls) => {
                    let mut settings = TlsSettings::intermediate(&tls.cert_path, &tls.key_path)
                        .or_err_with(InternalError, || {
                            format!("Unable to load TLS settings for {address}")
                        })?;
                    if listener.offer_h2 {
                        settings.enable_h2();
                    }
                    service.add_tls_with_settings(&address, None, settings);
                }
                None => service.add_tcp(&address),
            }
        }

        Ok(service)
    }

    pub async fn handle(&self, method: &Method, path: &str) -> Response<Vec<u8>> {
        if method != Method::GET {
            return ResponseBuilder::method_not_allowed();
        }

        match self.orchestrator.execute_legacy_call(path).await {
            Ok(response) => ResponseBuilder::json(StatusCode::OK, &response),
            Err(err) => ResponseBuilder::orchestration_error(&err),
        }
    }
}

#[async_trait]
impl ServeHttp for LegacyHttpApp {
    async fn response(&self, http_session: &mut ServerSession) -> Response<Vec<u8>> {
        let req = http_session.req_header();
        let method = req.method.clone();
        let path = req.uri.path().to_string();

        self.handle(&method, &path).await
    }
}
