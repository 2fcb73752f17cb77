//! HTTP gateway relaying knowledge-base, chat and OCR calls.
//!
//! The front end talks only to this service; it holds the Dify app and
//! dataset keys plus the Cloud Vision credentials, and forwards each call
//! to the matching upstream endpoint. Upstream bodies are passed back
//! unchanged on success and wrapped in an error envelope otherwise.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
