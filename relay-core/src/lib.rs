//! Core types for the knowledge-base relay.
//!
//! Defines the request and response shapes exchanged with callers and with
//! the Dify knowledge/chat API, plus the path identifiers that end up inside
//! upstream URLs. Nothing here performs I/O.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod chat;
pub mod dataset;
pub mod envelope;
pub mod error;
pub mod id;

pub use chat::{ChatMessage, ChatMessagePayload, ConversationListQuery, MessageListQuery, ResponseMode};
pub use dataset::{
    CreateDatasetRequest, CreateDocumentByText, DatasetListQuery, DatasetPermission,
    FileDocumentSettings, IndexingTechnique, ProcessMode, ProcessRule, UpdateDocumentByText,
};
pub use envelope::{ErrorEnvelope, OcrText, NO_TEXT_FOUND};
pub use error::CoreError;
pub use id::{ConversationId, DatasetId, DocumentId};
