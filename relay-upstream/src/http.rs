//! Shared send-and-check step for upstream JSON calls.

use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;

use crate::UpstreamError;

/// Send `request` and return its JSON body if the upstream answered 200.
///
/// Only an exact 200 counts as success. Any other status becomes
/// [`UpstreamError::Status`] carrying the raw body text, so the caller can
/// echo it back.
///
/// # Errors
/// Returns [`UpstreamError::Transport`] if no response arrives,
/// [`UpstreamError::Status`] on a non-200 answer, and
/// [`UpstreamError::Decode`] if a 200 body is not JSON.
pub(crate) async fn relay_json(request: RequestBuilder, operation: &'static str) -> Result<Value, UpstreamError> {
    let resp = request.send().await.map_err(|e| {
        tracing::warn!(operation, error = %e, "upstream request failed");
        UpstreamError::from(e)
    })?;

    let status = resp.status();
    let body = resp.bytes().await?;

    if status != StatusCode::OK {
        let text = String::from_utf8_lossy(&body).into_owned();
        tracing::warn!(operation, status = status.as_u16(), body = %text, "upstream returned an error");
        return Err(UpstreamError::Status { status: status.as_u16(), body: text });
    }

    tracing::debug!(operation, bytes = body.len(), "upstream call succeeded");

    serde_json::from_slice(&body).map_err(|e| UpstreamError::Decode(format!("{operation}: {e}")))
}

/// Build the shared HTTP client used for every upstream call.
///
/// # Errors
/// Returns [`UpstreamError::Transport`] if the TLS backend cannot initialise.
pub(crate) fn build_client(timeout: std::time::Duration) -> Result<reqwest::Client, UpstreamError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("relay-upstream/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| UpstreamError::Transport(format!("failed to build HTTP client: {e}")))
}
