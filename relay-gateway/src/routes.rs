//! Axum route handlers for the relay API.
//!
//! Each handler makes one upstream call and either relays the upstream JSON
//! body untouched or converts the failure via [`GatewayError`].

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, Request, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use relay_core::{
    ChatMessage, ConversationListQuery, CreateDatasetRequest, CreateDocumentByText, DatasetId,
    DatasetListQuery, DocumentId, MessageListQuery, OcrText, UpdateDocumentByText,
};
use relay_upstream::FileUpload;
use serde_json::{json, Value};
use tower_http::{
    cors::CorsLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{error::GatewayError, state::AppState, telemetry::UuidRequestId};

type Relayed = Result<Json<Value>, GatewayError>;

// ── Router ────────────────────────────────────────────────────────────────────

/// Build the application router around the given upstream clients.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/datasets", post(create_dataset).get(list_datasets))
        .route("/datasets/{dataset_id}", delete(delete_dataset))
        .route("/datasets/{dataset_id}/document/create-by-text", post(create_document_by_text))
        .route("/datasets/{dataset_id}/document/create-by-file", post(create_document_by_file))
        .route(
            "/datasets/{dataset_id}/documents/{document_id}/update-by-text",
            post(update_document_by_text),
        )
        .route(
            "/datasets/{dataset_id}/documents/{document_id}/update-by-file",
            post(update_document_by_file),
        )
        .route("/datasets/{dataset_id}/documents/{document_id}", delete(delete_document))
        .route("/datasets/{dataset_id}/documents", get(list_documents))
        .route("/chat-message", post(send_chat_message))
        .route("/conversations", get(list_conversations))
        .route("/messages", get(list_messages))
        .route("/ocr", post(ocr_image))
        .route("/health", get(health))
        .route("/test", get(test_endpoint))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request| {
            let request_id = req
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!("request", method = %req.method(), uri = %req.uri(), request_id)
        }))
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
        .layer(CorsLayer::permissive())
}

// ── Health ────────────────────────────────────────────────────────────────────

/// `GET /health` — liveness check.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

/// `GET /test` — smoke endpoint for frontends checking connectivity.
pub async fn test_endpoint() -> impl IntoResponse {
    Json(json!({"message": "Backend is working"}))
}

// ── Datasets ──────────────────────────────────────────────────────────────────

/// `POST /datasets` — create an empty knowledge base.
///
/// # Errors
/// Returns [`GatewayError::Upstream`] if Dify rejects the request.
pub async fn create_dataset(State(state): State<AppState>, Json(body): Json<CreateDatasetRequest>) -> Relayed {
    state
        .knowledge
        .create_dataset(&body)
        .await
        .map(Json)
        .map_err(GatewayError::upstream("Failed to create dataset"))
}

/// `GET /datasets?page&limit` — list knowledge bases.
///
/// # Errors
/// Returns [`GatewayError::Upstream`] if Dify rejects the request.
pub async fn list_datasets(State(state): State<AppState>, Query(query): Query<DatasetListQuery>) -> Relayed {
    state
        .knowledge
        .list_datasets(query)
        .await
        .map(Json)
        .map_err(GatewayError::upstream("Failed to get knowledge base list"))
}

/// `DELETE /datasets/{dataset_id}`.
///
/// # Errors
/// Returns [`GatewayError::InvalidId`] for a malformed id, or
/// [`GatewayError::Upstream`] if Dify rejects the request.
pub async fn delete_dataset(State(state): State<AppState>, Path(dataset_id): Path<String>) -> Relayed {
    let dataset = DatasetId::parse(dataset_id)?;
    state
        .knowledge
        .delete_dataset(&dataset)
        .await
        .map(Json)
        .map_err(GatewayError::upstream("Failed to delete knowledge_base"))
}

// ── Documents ─────────────────────────────────────────────────────────────────

/// `POST /datasets/{dataset_id}/document/create-by-text`.
///
/// # Errors
/// Returns [`GatewayError::InvalidId`] for a malformed id, or
/// [`GatewayError::Upstream`] if Dify rejects the request.
pub async fn create_document_by_text(
    State(state): State<AppState>,
    Path(dataset_id): Path<String>,
    Json(body): Json<CreateDocumentByText>,
) -> Relayed {
    let dataset = DatasetId::parse(dataset_id)?;
    state
        .knowledge
        .create_document_by_text(&dataset, &body)
        .await
        .map(Json)
        .map_err(GatewayError::upstream("Failed to create document"))
}

/// `POST /datasets/{dataset_id}/documents/{document_id}/update-by-text`.
///
/// # Errors
/// Returns [`GatewayError::InvalidId`] for a malformed id, or
/// [`GatewayError::Upstream`] if Dify rejects the request.
pub async fn update_document_by_text(
    State(state): State<AppState>,
    Path((dataset_id, document_id)): Path<(String, String)>,
    Json(body): Json<UpdateDocumentByText>,
) -> Relayed {
    let dataset = DatasetId::parse(dataset_id)?;
    let document = DocumentId::parse(document_id)?;
    state
        .knowledge
        .update_document_by_text(&dataset, &document, &body)
        .await
        .map(Json)
        .map_err(GatewayError::upstream("Failed to update document"))
}

/// `POST /datasets/{dataset_id}/document/create-by-file` — multipart field `file`.
///
/// # Errors
/// Returns [`GatewayError::InvalidRequest`] if no `file` field is present, or
/// [`GatewayError::Upload`] if Dify rejects the upload.
pub async fn create_document_by_file(
    State(state): State<AppState>,
    Path(dataset_id): Path<String>,
    multipart: Multipart,
) -> Relayed {
    let dataset = DatasetId::parse(dataset_id)?;
    let upload = read_file_field(multipart, "file").await?;
    state
        .knowledge
        .create_document_by_file(&dataset, upload)
        .await
        .map(Json)
        .map_err(GatewayError::Upload)
}

/// `POST /datasets/{dataset_id}/documents/{document_id}/update-by-file` — multipart field `file`.
///
/// # Errors
/// Returns [`GatewayError::InvalidRequest`] if no `file` field is present, or
/// [`GatewayError::Upload`] if Dify rejects the upload.
pub async fn update_document_by_file(
    State(state): State<AppState>,
    Path((dataset_id, document_id)): Path<(String, String)>,
    multipart: Multipart,
) -> Relayed {
    let dataset = DatasetId::parse(dataset_id)?;
    let document = DocumentId::parse(document_id)?;
    let upload = read_file_field(multipart, "file").await?;
    state
        .knowledge
        .update_document_by_file(&dataset, &document, upload)
        .await
        .map(Json)
        .map_err(GatewayError::Upload)
}

/// `DELETE /datasets/{dataset_id}/documents/{document_id}`.
///
/// # Errors
/// Returns [`GatewayError::InvalidId`] for a malformed id, or
/// [`GatewayError::Upstream`] if Dify rejects the request.
pub async fn delete_document(
    State(state): State<AppState>,
    Path((dataset_id, document_id)): Path<(String, String)>,
) -> Relayed {
    let dataset = DatasetId::parse(dataset_id)?;
    let document = DocumentId::parse(document_id)?;
    state
        .knowledge
        .delete_document(&dataset, &document)
        .await
        .map(Json)
        .map_err(GatewayError::upstream("Failed to delete document"))
}

/// `GET /datasets/{dataset_id}/documents`.
///
/// # Errors
/// Returns [`GatewayError::InvalidId`] for a malformed id, or
/// [`GatewayError::Upstream`] if Dify rejects the request.
pub async fn list_documents(State(state): State<AppState>, Path(dataset_id): Path<String>) -> Relayed {
    let dataset = DatasetId::parse(dataset_id)?;
    state
        .knowledge
        .list_documents(&dataset)
        .await
        .map(Json)
        .map_err(GatewayError::upstream("Failed to get document list"))
}

// ── Chat ──────────────────────────────────────────────────────────────────────

/// `POST /chat-message` — blocking chat turn.
///
/// Upstream rejections come back as HTTP 200 with an error envelope that
/// includes the raw upstream body.
///
/// # Errors
/// Returns [`GatewayError::Chat`] if Dify rejects the message.
pub async fn send_chat_message(State(state): State<AppState>, Json(body): Json<ChatMessage>) -> Relayed {
    state
        .knowledge
        .send_chat_message(body)
        .await
        .map(Json)
        .map_err(GatewayError::chat_echo("Failed to send the message"))
}

/// `GET /conversations?last_id&limit`.
///
/// # Errors
/// Returns [`GatewayError::Chat`] if Dify rejects the request.
pub async fn list_conversations(
    State(state): State<AppState>,
    Query(query): Query<ConversationListQuery>,
) -> Relayed {
    state
        .knowledge
        .list_conversations(&query)
        .await
        .map(Json)
        .map_err(GatewayError::chat("Failed to fetch conversations"))
}

/// `GET /messages?conversation_id` — history of one conversation.
///
/// # Errors
/// Returns [`GatewayError::Chat`] if Dify rejects the request.
pub async fn list_messages(State(state): State<AppState>, Query(query): Query<MessageListQuery>) -> Relayed {
    state
        .knowledge
        .list_messages(&query)
        .await
        .map(Json)
        .map_err(GatewayError::chat("Failed to fetch messages"))
}

// ── OCR ───────────────────────────────────────────────────────────────────────

/// `POST /ocr` — multipart field `image`; responds `{"text": ...}`.
///
/// # Errors
/// Returns [`GatewayError::InvalidRequest`] if no `image` field is present, or
/// [`GatewayError::Ocr`] if text detection fails.
pub async fn ocr_image(State(state): State<AppState>, multipart: Multipart) -> Result<Json<OcrText>, GatewayError> {
    let image = read_file_field(multipart, "image").await?;
    let detected = state.ocr.detect_text(image.bytes).await.map_err(|e| {
        tracing::error!(error = %e, "OCR processing error");
        GatewayError::Ocr(e)
    })?;
    Ok(Json(OcrText::from_detection(detected)))
}

// ── Multipart helpers ─────────────────────────────────────────────────────────

/// Read the first multipart field named `name`, skipping any others.
async fn read_file_field(mut multipart: Multipart, name: &str) -> Result<FileUpload, GatewayError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(name) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_owned();
        let bytes = field.bytes().await?;
        return Ok(FileUpload { file_name, bytes: bytes.to_vec() });
    }
    Err(GatewayError::InvalidRequest(format!("missing multipart field '{name}'")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use relay_upstream::{KnowledgeBase, TextDetector, UpstreamError};
    use tower::ServiceExt;

    use super::*;

    struct AlwaysUnreachable;

    fn unreachable_err() -> UpstreamError {
        UpstreamError::Transport("connection refused".to_owned())
    }

    #[async_trait]
    impl KnowledgeBase for AlwaysUnreachable {
        async fn create_dataset(&self, _r: &CreateDatasetRequest) -> Result<Value, UpstreamError> {
            Err(unreachable_err())
        }
        async fn list_datasets(&self, _q: DatasetListQuery) -> Result<Value, UpstreamError> {
            Err(unreachable_err())
        }
        async fn delete_dataset(&self, _d: &DatasetId) -> Result<Value, UpstreamError> {
            Err(unreachable_err())
        }
        async fn create_document_by_text(
            &self,
            _d: &DatasetId,
            _r: &CreateDocumentByText,
        ) -> Result<Value, UpstreamError> {
            Err(unreachable_err())
        }
        async fn update_document_by_text(
            &self,
            _d: &DatasetId,
            _doc: &DocumentId,
            _r: &UpdateDocumentByText,
        ) -> Result<Value, UpstreamError> {
            Err(unreachable_err())
        }
        async fn create_document_by_file(&self, _d: &DatasetId, _u: FileUpload) -> Result<Value, UpstreamError> {
            Err(unreachable_err())
        }
        async fn update_document_by_file(
            &self,
            _d: &DatasetId,
            _doc: &DocumentId,
            _u: FileUpload,
        ) -> Result<Value, UpstreamError> {
            Err(unreachable_err())
        }
        async fn delete_document(&self, _d: &DatasetId, _doc: &DocumentId) -> Result<Value, UpstreamError> {
            Err(unreachable_err())
        }
        async fn list_documents(&self, _d: &DatasetId) -> Result<Value, UpstreamError> {
            Err(unreachable_err())
        }
        async fn send_chat_message(&self, _m: ChatMessage) -> Result<Value, UpstreamError> {
            Err(unreachable_err())
        }
        async fn list_conversations(&self, _q: &ConversationListQuery) -> Result<Value, UpstreamError> {
            Err(unreachable_err())
        }
        async fn list_messages(&self, _q: &MessageListQuery) -> Result<Value, UpstreamError> {
            Err(unreachable_err())
        }
    }

    #[async_trait]
    impl TextDetector for AlwaysUnreachable {
        async fn detect_text(&self, _image: Vec<u8>) -> Result<Option<String>, UpstreamError> {
            Err(unreachable_err())
        }
    }

    fn test_state() -> AppState {
        AppState::new(Arc::new(AlwaysUnreachable), Arc::new(AlwaysUnreachable))
    }

    async fn send(req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
        let resp = match create_router(test_state()).oneshot(req).await {
            Ok(r) => r,
            Err(e) => panic!("handler error: {e}"),
        };
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = match axum::body::to_bytes(resp.into_body(), 4096).await {
            Ok(b) => b,
            Err(e) => panic!("failed to read body: {e}"),
        };
        let body = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(e) => panic!("invalid JSON: {e}"),
        };
        (status, headers, body)
    }

    fn get_req(uri: &str) -> Request<Body> {
        match Request::builder().uri(uri).body(Body::empty()) {
            Ok(r) => r,
            Err(e) => panic!("failed to build request: {e}"),
        }
    }

    #[tokio::test]
    async fn health_response_format_returns_ok_with_status_field() {
        let (status, headers, body) = send(get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(headers.contains_key("x-request-id"), "request id must be propagated");
    }

    #[tokio::test]
    async fn test_endpoint_reports_backend_working() {
        let (status, _, body) = send(get_req("/test")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Backend is working");
    }

    #[tokio::test]
    async fn unreachable_dify_is_500_with_error_text() {
        let (status, _, body) = send(get_req("/datasets/ds-1/documents")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "connection refused", "status_code": 500}));
    }

    #[tokio::test]
    async fn encoded_slash_in_id_is_rejected_before_any_upstream_call() {
        let (status, _, body) = send(get_req("/datasets/ds-1%2F..%2Fapps/documents")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().is_some_and(|d| d.contains("dataset")), "got {body}");
    }
}
