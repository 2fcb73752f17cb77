//! Shared handler state: the upstream clients.
//!
//! Nothing here is mutated per request; the clients carry their own
//! connection pools.

use std::sync::Arc;

use relay_upstream::{DifyClient, KnowledgeBase, TextDetector, UpstreamError, VisionClient};

use crate::config::{GatewayConfig, DEFAULT_MAX_UPLOAD_BYTES};

/// Handles to the upstream services, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub knowledge: Arc<dyn KnowledgeBase>,
    pub ocr: Arc<dyn TextDetector>,
    /// Largest accepted request body, uploads included.
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Build state around arbitrary backends (fakes in tests).
    #[must_use]
    pub fn new(knowledge: Arc<dyn KnowledgeBase>, ocr: Arc<dyn TextDetector>) -> Self {
        Self { knowledge, ocr, max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES }
    }

    #[must_use]
    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Build the real Dify and Vision clients from configuration.
    ///
    /// # Errors
    /// Returns [`UpstreamError::Transport`] if an HTTP client cannot be built.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, UpstreamError> {
        let dify = DifyClient::new(config.dify.clone())?;
        let vision = VisionClient::new(config.vision.clone())?;
        if vision.is_configured() {
            tracing::info!(credentials = ?config.vision.credentials, "OCR enabled");
        } else {
            tracing::warn!("no Vision credentials configured; POST /ocr will fail");
        }
        tracing::info!(dify = ?config.dify, "Dify client ready");

        Ok(Self::new(Arc::new(dify), Arc::new(vision)).with_max_upload_bytes(config.max_upload_bytes))
    }
}
