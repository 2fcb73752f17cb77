//! Error types for the gateway crate.
//!
//! Every route family reports upstream failures in its own envelope; the
//! variant chosen by the handler decides which one.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relay_core::{CoreError, ErrorEnvelope};
use relay_upstream::UpstreamError;
use serde_json::json;

/// Detail string for any non-200 answer to a document upload.
pub const UPLOAD_FAILED_DETAIL: &str = "Error from Dify API";

/// Error string for any OCR failure.
pub const OCR_FAILED: &str = "Failed to process image";

/// Errors that can occur during gateway request handling.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// Dataset or document call failed. Answered with the upstream status
    /// and `{"error", "status_code"}`.
    #[error("{message}: {source}")]
    Upstream {
        message: &'static str,
        #[source]
        source: UpstreamError,
    },

    /// Chat, conversation or message call failed. Answered with HTTP 200 and
    /// `{"error", "status_code"}`, plus the raw upstream body when `echo_body`.
    #[error("{message}: {source}")]
    Chat {
        message: &'static str,
        echo_body: bool,
        #[source]
        source: UpstreamError,
    },

    /// File upload failed. Answered with the upstream status and `{"detail"}`.
    #[error("upload failed: {0}")]
    Upload(#[source] UpstreamError),

    /// OCR failed. Always a 500.
    #[error("ocr failed: {0}")]
    Ocr(#[source] UpstreamError),

    /// A path identifier is malformed.
    #[error(transparent)]
    InvalidId(#[from] CoreError),

    /// The multipart body is unreadable.
    #[error(transparent)]
    Multipart(#[from] MultipartError),

    /// The request is missing something the route requires.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// Adapter for `map_err` on dataset and document calls.
    pub fn upstream(message: &'static str) -> impl FnOnce(UpstreamError) -> Self {
        move |source| Self::Upstream { message, source }
    }

    /// Adapter for `map_err` on conversation and message calls.
    pub fn chat(message: &'static str) -> impl FnOnce(UpstreamError) -> Self {
        move |source| Self::Chat { message, echo_body: false, source }
    }

    /// Like [`GatewayError::chat`], but the upstream body is echoed as `message`.
    pub fn chat_echo(message: &'static str) -> impl FnOnce(UpstreamError) -> Self {
        move |source| Self::Chat { message, echo_body: true, source }
    }
}

/// Map an upstream status code onto ours; nonsense codes become 502.
fn relayed_status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY)
}

fn internal(source: &UpstreamError) -> Response {
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    (status, Json(ErrorEnvelope::new(source.to_string(), status.as_u16()))).into_response()
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::Upstream { message, source } => match source {
                UpstreamError::Status { status, .. } => {
                    (relayed_status(status), Json(ErrorEnvelope::new(message, status))).into_response()
                }
                other => internal(&other),
            },
            GatewayError::Chat { message, echo_body, source } => match source {
                UpstreamError::Status { status, body } => {
                    let mut envelope = ErrorEnvelope::new(message, status);
                    if echo_body {
                        envelope = envelope.with_message(body);
                    }
                    (StatusCode::OK, Json(envelope)).into_response()
                }
                other => internal(&other),
            },
            GatewayError::Upload(source) => match source {
                UpstreamError::Status { status, .. } => {
                    (relayed_status(status), Json(json!({"detail": UPLOAD_FAILED_DETAIL}))).into_response()
                }
                other => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"detail": other.to_string()})),
                )
                    .into_response(),
            },
            GatewayError::Ocr(source) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": OCR_FAILED, "details": source.to_string()})),
            )
                .into_response(),
            GatewayError::InvalidId(e) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"detail": e.to_string()}))).into_response()
            }
            GatewayError::Multipart(e) => (e.status(), Json(json!({"detail": e.body_text()}))).into_response(),
            GatewayError::InvalidRequest(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"detail": msg}))).into_response()
            }
        }
    }
}
