//! Dify knowledge and chat API client.
//!
//! Dataset and document calls authenticate with the knowledge key; chat,
//! conversation and message calls use the app key.

use async_trait::async_trait;
use relay_core::{
    ChatMessage, ChatMessagePayload, ConversationListQuery, CreateDatasetRequest,
    CreateDocumentByText, DatasetId, DatasetListQuery, DocumentId, FileDocumentSettings,
    MessageListQuery, UpdateDocumentByText,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder};
use serde_json::Value;

use crate::backend::{FileUpload, KnowledgeBase};
use crate::http::{build_client, relay_json};
use crate::{DifyConfig, UpstreamError};

/// MIME type Dify receives for every uploaded document.
const UPLOAD_MIME: &str = "text/plain";

/// Which bearer key a call authenticates with.
#[derive(Debug, Clone, Copy)]
enum Key {
    App,
    Dataset,
}

/// HTTP client for the Dify API.
#[derive(Debug, Clone)]
pub struct DifyClient {
    http: reqwest::Client,
    config: DifyConfig,
}

impl DifyClient {
    /// Create a client with its own connection pool.
    ///
    /// # Errors
    /// Returns [`UpstreamError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: DifyConfig) -> Result<Self, UpstreamError> {
        let http = build_client(config.timeout)?;
        Ok(Self { http, config })
    }

    /// Create a client sharing an existing connection pool.
    #[must_use]
    pub fn with_http(http: reqwest::Client, config: DifyConfig) -> Self {
        Self { http, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url)
    }

    fn request(&self, method: Method, path: &str, key: Key) -> RequestBuilder {
        let token = match key {
            Key::App => &self.config.api_key,
            Key::Dataset => &self.config.dataset_api_key,
        };
        self.http.request(method, self.url(path)).bearer_auth(token)
    }

    async fn upload(
        &self,
        path: &str,
        settings: &FileDocumentSettings,
        upload: FileUpload,
        operation: &'static str,
    ) -> Result<Value, UpstreamError> {
        tracing::info!(
            path,
            file_name = %upload.file_name,
            bytes = upload.bytes.len(),
            "forwarding document upload"
        );
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(UPLOAD_MIME)?;
        let form = Form::new().text("data", settings.to_form_value()?).part("file", part);
        relay_json(self.request(Method::POST, path, Key::Dataset).multipart(form), operation).await
    }
}

#[async_trait]
impl KnowledgeBase for DifyClient {
    async fn create_dataset(&self, request: &CreateDatasetRequest) -> Result<Value, UpstreamError> {
        tracing::info!(name = %request.name, "creating dataset");
        let req = self.request(Method::POST, "/datasets", Key::Dataset).json(request);
        relay_json(req, "create_dataset").await
    }

    async fn list_datasets(&self, query: DatasetListQuery) -> Result<Value, UpstreamError> {
        let req = self
            .request(Method::GET, "/datasets", Key::Dataset)
            .query(&[("page", query.page), ("limit", query.limit)]);
        relay_json(req, "list_datasets").await
    }

    async fn delete_dataset(&self, dataset: &DatasetId) -> Result<Value, UpstreamError> {
        tracing::info!(dataset_id = %dataset, "deleting dataset");
        let req = self.request(Method::DELETE, &format!("/datasets/{dataset}"), Key::Dataset);
        relay_json(req, "delete_dataset").await
    }

    async fn create_document_by_text(
        &self,
        dataset: &DatasetId,
        request: &CreateDocumentByText,
    ) -> Result<Value, UpstreamError> {
        tracing::info!(dataset_id = %dataset, name = %request.name, "creating document from text");
        let req = self
            .request(Method::POST, &format!("/datasets/{dataset}/document/create-by-text"), Key::Dataset)
            .json(request);
        relay_json(req, "create_document_by_text").await
    }

    async fn update_document_by_text(
        &self,
        dataset: &DatasetId,
        document: &DocumentId,
        request: &UpdateDocumentByText,
    ) -> Result<Value, UpstreamError> {
        tracing::info!(dataset_id = %dataset, document_id = %document, "updating document from text");
        let req = self
            .request(
                Method::POST,
                &format!("/datasets/{dataset}/documents/{document}/update-by-text"),
                Key::Dataset,
            )
            .json(request);
        relay_json(req, "update_document_by_text").await
    }

    async fn create_document_by_file(
        &self,
        dataset: &DatasetId,
        upload: FileUpload,
    ) -> Result<Value, UpstreamError> {
        self.upload(
            &format!("/datasets/{dataset}/document/create-by-file"),
            &FileDocumentSettings::for_create(),
            upload,
            "create_document_by_file",
        )
        .await
    }

    async fn update_document_by_file(
        &self,
        dataset: &DatasetId,
        document: &DocumentId,
        upload: FileUpload,
    ) -> Result<Value, UpstreamError> {
        self.upload(
            &format!("/datasets/{dataset}/documents/{document}/update-by-file"),
            &FileDocumentSettings::for_update(),
            upload,
            "update_document_by_file",
        )
        .await
    }

    async fn delete_document(&self, dataset: &DatasetId, document: &DocumentId) -> Result<Value, UpstreamError> {
        tracing::info!(dataset_id = %dataset, document_id = %document, "deleting document");
        let req = self.request(
            Method::DELETE,
            &format!("/datasets/{dataset}/documents/{document}"),
            Key::Dataset,
        );
        relay_json(req, "delete_document").await
    }

    async fn list_documents(&self, dataset: &DatasetId) -> Result<Value, UpstreamError> {
        let req = self.request(Method::GET, &format!("/datasets/{dataset}/documents"), Key::Dataset);
        relay_json(req, "list_documents").await
    }

    async fn send_chat_message(&self, message: ChatMessage) -> Result<Value, UpstreamError> {
        let payload = ChatMessagePayload::blocking(message, self.config.user.as_str());
        tracing::debug!(
            url = %self.url("/chat-messages"),
            conversation_id = %payload.conversation_id,
            query = %payload.query,
            "sending chat message"
        );
        let req = self.request(Method::POST, "/chat-messages", Key::App).json(&payload);
        relay_json(req, "send_chat_message").await
    }

    async fn list_conversations(&self, query: &ConversationListQuery) -> Result<Value, UpstreamError> {
        let limit = query.limit.to_string();
        let req = self.request(Method::GET, "/conversations", Key::App).query(&[
            ("user", self.config.user.as_str()),
            ("last_id", query.last_id.as_str()),
            ("limit", limit.as_str()),
        ]);
        relay_json(req, "list_conversations").await
    }

    async fn list_messages(&self, query: &MessageListQuery) -> Result<Value, UpstreamError> {
        let req = self.request(Method::GET, "/messages", Key::App).query(&[
            ("user", self.config.user.as_str()),
            ("conversation_id", query.conversation_id.as_str()),
        ]);
        relay_json(req, "list_messages").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> DifyClient {
        DifyClient::with_http(reqwest::Client::new(), DifyConfig::new("http://dify.test/v1/", "app", "ds"))
    }

    #[test]
    fn url_joins_base_and_path() {
        let c = client();
        assert_eq!(c.url("/datasets"), "http://dify.test/v1/datasets");
    }

    #[test]
    fn request_uses_key_for_route_family() {
        let c = client();
        let chat = match c.request(Method::POST, "/chat-messages", Key::App).build() {
            Ok(r) => r,
            Err(e) => panic!("build failed: {e}"),
        };
        let dataset = match c.request(Method::GET, "/datasets", Key::Dataset).build() {
            Ok(r) => r,
            Err(e) => panic!("build failed: {e}"),
        };
        assert_eq!(
            chat.headers().get("authorization").and_then(|v| v.to_str().ok()),
            Some("Bearer app")
        );
        assert_eq!(
            dataset.headers().get("authorization").and_then(|v| v.to_str().ok()),
            Some("Bearer ds")
        );
    }
}
