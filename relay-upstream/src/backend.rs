//! Upstream service abstraction traits.
//!
//! The gateway talks to these traits only, so handlers can be exercised
//! against in-memory fakes without a network.

use async_trait::async_trait;
use relay_core::{
    ChatMessage, ConversationListQuery, CreateDatasetRequest, CreateDocumentByText, DatasetId,
    DatasetListQuery, DocumentId, MessageListQuery, UpdateDocumentByText,
};
use serde_json::Value;

use crate::UpstreamError;

/// A file received from the caller, forwarded as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Knowledge-base and chat operations backed by Dify.
///
/// Every method performs exactly one upstream call. `Ok` carries the
/// upstream JSON body untouched; any non-200 answer is
/// [`UpstreamError::Status`].
///
/// # Cancel Safety
/// All methods are cancel safe. No local state is mutated.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// # Errors
    /// See trait docs.
    async fn create_dataset(&self, request: &CreateDatasetRequest) -> Result<Value, UpstreamError>;

    /// # Errors
    /// See trait docs.
    async fn list_datasets(&self, query: DatasetListQuery) -> Result<Value, UpstreamError>;

    /// # Errors
    /// See trait docs.
    async fn delete_dataset(&self, dataset: &DatasetId) -> Result<Value, UpstreamError>;

    /// # Errors
    /// See trait docs.
    async fn create_document_by_text(
        &self,
        dataset: &DatasetId,
        request: &CreateDocumentByText,
    ) -> Result<Value, UpstreamError>;

    /// # Errors
    /// See trait docs.
    async fn update_document_by_text(
        &self,
        dataset: &DatasetId,
        document: &DocumentId,
        request: &UpdateDocumentByText,
    ) -> Result<Value, UpstreamError>;

    /// # Errors
    /// See trait docs.
    async fn create_document_by_file(
        &self,
        dataset: &DatasetId,
        upload: FileUpload,
    ) -> Result<Value, UpstreamError>;

    /// # Errors
    /// See trait docs.
    async fn update_document_by_file(
        &self,
        dataset: &DatasetId,
        document: &DocumentId,
        upload: FileUpload,
    ) -> Result<Value, UpstreamError>;

    /// # Errors
    /// See trait docs.
    async fn delete_document(&self, dataset: &DatasetId, document: &DocumentId) -> Result<Value, UpstreamError>;

    /// # Errors
    /// See trait docs.
    async fn list_documents(&self, dataset: &DatasetId) -> Result<Value, UpstreamError>;

    /// # Errors
    /// See trait docs.
    async fn send_chat_message(&self, message: ChatMessage) -> Result<Value, UpstreamError>;

    /// # Errors
    /// See trait docs.
    async fn list_conversations(&self, query: &ConversationListQuery) -> Result<Value, UpstreamError>;

    /// # Errors
    /// See trait docs.
    async fn list_messages(&self, query: &MessageListQuery) -> Result<Value, UpstreamError>;
}

/// Optical character recognition over a single image.
#[async_trait]
pub trait TextDetector: Send + Sync {
    /// Return the full text found in `image`, or `None` if there is none.
    ///
    /// # Errors
    /// Returns [`UpstreamError::Credentials`] when OCR is not configured, and
    /// the usual transport/status errors otherwise.
    async fn detect_text(&self, image: Vec<u8>) -> Result<Option<String>, UpstreamError>;
}
