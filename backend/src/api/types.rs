//! Response types for the HTTP API.
//!
//! Operation results and error messages are plain text; only the health
//! check answers with JSON.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::any::Any;

use crate::error::RequestError;
use crate::transform::Operation;

/// Content type of every plain text response.
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Body sent for every failure that is not the client's fault.
pub const UNEXPECTED_ERROR: &str = "Error: unexpected error";

/// Health check payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    /// One `METHOD /path` entry per route
    pub endpoints: Vec<String>,
}

impl HealthResponse {
    pub fn ok() -> Self {
        let mut endpoints: Vec<String> = Operation::ALL
            .iter()
            .map(|op| format!("POST {}", op.route()))
            .collect();
        endpoints.push("POST /stream/echo".to_string());
        endpoints.push("GET /health".to_string());

        Self {
            status: "ok".to_string(),
            service: "csvmatrix".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            endpoints,
        }
    }
}

/// A successful plain text response.
pub fn text_response(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN))],
        body,
    )
        .into_response()
}

/// An error response: the message on a single line, never sniffed.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN)),
            (
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ),
        ],
        format!("{}\n", message),
    )
        .into_response()
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        match self.client_message() {
            Some(message) => {
                tracing::debug!(err = %self, "rejected upload");
                error_response(StatusCode::BAD_REQUEST, &message)
            }
            None => {
                tracing::error!(err = %self, "request failed");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_ERROR)
            }
        }
    }
}

/// Best effort text of a panic payload, for the logs.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Turns a panic caught by the panic layer into a 500 response.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!(panic = %panic_message(payload.as_ref()), "recovered from panic");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn test_health_lists_every_operation() {
        let health = HealthResponse::ok();
        assert_eq!(health.status, "ok");
        for op in Operation::ALL {
            assert!(health.endpoints.contains(&format!("POST {}", op.route())));
        }
    }

    #[test]
    fn test_error_status_mapping() {
        let client = RequestError::from(ValidationError::NotSquare).into_response();
        assert_eq!(client.status(), StatusCode::BAD_REQUEST);
        assert_eq!(client.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");

        let server = RequestError::Worker("boom".into()).into_response();
        assert_eq!(server.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
