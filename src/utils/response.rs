//! Response building shared by the legacy and status HTTP apps.

use http::{header, HeaderValue, Response, StatusCode};
use serde::Serialize;

use crate::core::error::OrchestrationError;

/// Standard content types
pub mod content_type {
    pub const TEXT_PLAIN: &str = "text/plain";
    pub const APPLICATION_JSON: &str = "application/json";
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

pub struct ResponseBuilder;

impl ResponseBuilder {
    /// Build a response with `body` and an optional content type
    pub fn with_body(status: StatusCode, body: Vec<u8>, content_type: Option<&str>) -> Response<Vec<u8>> {
        let mut builder = Response::builder().status(status);

        if let Some(ct) = content_type {
            match HeaderValue::from_str(ct) {
                Ok(header_value) => {
                    builder = builder.header(header::CONTENT_TYPE, header_value);
                }
                Err(e) => {
                    log::error!("Invalid content type '{ct}': {e}");
                }
            }
        }

        builder.body(body).unwrap_or_else(|e| {
            log::error!("Failed to build response: {e}");
            Self::fallback()
        })
    }

    pub fn text(status: StatusCode, message: &str) -> Response<Vec<u8>> {
        Self::with_body(status, message.as_bytes().to_vec(), Some(content_type::TEXT_PLAIN))
    }

    pub fn json<T: Serialize>(status: StatusCode, data: &T) -> Response<Vec<u8>> {
        match serde_json::to_vec(data) {
            Ok(body) => Self::with_body(status, body, Some(content_type::APPLICATION_JSON)),
            Err(e) => {
                log::error!("Failed to serialize JSON response: {e}");
                Self::text(StatusCode::INTERNAL_SERVER_ERROR, "JSON serialization failed")
            }
        }
    }

    /// `{"error": <kind>, "message": <detail>}` with the status of `err`
    pub fn orchestration_error(err: &OrchestrationError) -> Response<Vec<u8>> {
        let body = ErrorBody {
            error: err.kind(),
            message: err.to_string(),
        };
        Self::json(err.status_code(), &body)
    }

    pub fn not_found() -> Response<Vec<u8>> {
        Self::text(StatusCode::NOT_FOUND, "Not Found")
    }

    pub fn method_not_allowed() -> Response<Vec<u8>> {
        let mut response = Self::text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        response
            .headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static("GET"));
        response
    }

    fn fallback() -> Response<Vec<u8>> {
        let mut response = Response::new(b"Internal Server Error".to_vec());
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_text_response() {
        let response = ResponseBuilder::text(StatusCode::OK, "OK");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), b"OK");
        assert_eq!(response.headers()[header::CONTENT_TYPE], content_type::TEXT_PLAIN);
    }

    #[test]
    fn test_json_response() {
        let data = json!({"message": "success", "code": 200});
        let response = ResponseBuilder::json(StatusCode::OK, &data);
        assert_eq!(response.status(), StatusCode::OK);
        let expected = r#"{"code":200,"message":"success"}"#;
        assert_eq!(response.body(), expected.as_bytes());
    }

    #[test]
    fn test_orchestration_error_response() {
        let err = OrchestrationError::MappingNotFound("/legacy/nope".to_string());
        let response = ResponseBuilder::orchestration_error(&err);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["error"], "MappingNotFound");
        assert!(body["message"].as_str().unwrap().contains("/legacy/nope"));
    }

    #[test]
    fn test_method_not_allowed() {
        let response = ResponseBuilder::method_not_allowed();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET");
    }
}
