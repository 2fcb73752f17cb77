//! Outbound clients for the knowledge-base relay.
//!
//! [`DifyClient`] forwards dataset, document and chat calls to Dify;
//! [`VisionClient`] runs OCR through Google Cloud Vision. Both sit behind
//! the [`KnowledgeBase`] and [`TextDetector`] traits.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod config;
pub mod credentials;
pub mod dify;
pub mod error;
mod http;
pub mod vision;

pub use backend::{FileUpload, KnowledgeBase, TextDetector};
pub use config::{DifyConfig, VisionConfig, VisionCredentials};
pub use credentials::ServiceAccountKey;
pub use dify::DifyClient;
pub use error::UpstreamError;
pub use vision::VisionClient;
