use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Upper bound on identifier length. Dify ids are UUIDs, this leaves headroom.
pub const MAX_ID_LEN: usize = 128;

/// Check that `raw` can be embedded as a single upstream URL path segment.
///
/// # Errors
/// Returns [`CoreError::InvalidId`] for empty, oversized, or segment-breaking input.
pub fn validate_segment(kind: &'static str, raw: &str) -> Result<(), CoreError> {
    if raw.is_empty() {
        return Err(CoreError::InvalidId { kind, reason: "must not be empty".to_owned() });
    }
    if raw.len() > MAX_ID_LEN {
        return Err(CoreError::InvalidId {
            kind,
            reason: format!("longer than {MAX_ID_LEN} bytes"),
        });
    }
    if let Some(c) = raw
        .chars()
        .find(|c| matches!(c, '/' | '?' | '#' | '%' | '\\') || c.is_whitespace() || c.is_control())
    {
        return Err(CoreError::InvalidId {
            kind,
            reason: format!("contains forbidden character {c:?}"),
        });
    }
    if raw == "." || raw == ".." {
        return Err(CoreError::InvalidId { kind, reason: "dot segment".to_owned() });
    }
    Ok(())
}

/// Identifier of a Dify knowledge base (dataset).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DatasetId(String);

impl DatasetId {
    /// Parse a dataset id taken from a request path.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidId`] if the value is not a safe path segment.
    pub fn parse(raw: impl Into<String>) -> Result<Self, CoreError> {
        let raw = raw.into();
        validate_segment("dataset", &raw)?;
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a document inside a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Parse a document id taken from a request path.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidId`] if the value is not a safe path segment.
    pub fn parse(raw: impl Into<String>) -> Result<Self, CoreError> {
        let raw = raw.into();
        validate_segment("document", &raw)?;
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a Dify chat conversation.
///
/// Deserializes through [`ConversationId::parse`], so a query string with a
/// malformed id is rejected before any upstream call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConversationId(String);

impl ConversationId {
    /// Parse a conversation id taken from a query string.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidId`] if the value is not a valid id.
    pub fn parse(raw: impl Into<String>) -> Result<Self, CoreError> {
        let raw = raw.into();
        validate_segment("conversation", &raw)?;
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ConversationId {
    type Error = CoreError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

impl From<ConversationId> for String {
    fn from(id: ConversationId) -> Self {
        id.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
