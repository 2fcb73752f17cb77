//! Knowledge-base (dataset) and document request shapes.
//!
//! Field names follow the Dify knowledge API wire format.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// Who can see a newly created knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetPermission {
    /// Visible to the creating account only.
    OnlyMe,
    /// Visible to every member of the workspace.
    #[default]
    AllTeamMembers,
    /// Visible to an explicit member list.
    PartialMembers,
}

/// Body of `POST /datasets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDatasetRequest {
    pub name: String,
    #[serde(default)]
    pub permission: DatasetPermission,
}

/// How Dify should index document chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexingTechnique {
    #[default]
    HighQuality,
    Economy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessMode {
    Automatic,
    Custom,
}

/// A single cleaning step applied before segmentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreProcessingRule {
    pub id: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segmentation {
    pub separator: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRules {
    pub pre_processing_rules: Vec<PreProcessingRule>,
    pub segmentation: Segmentation,
}

/// Chunking and cleaning rules attached to uploaded files.
///
/// `rules` is only meaningful in [`ProcessMode::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRule {
    pub mode: ProcessMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<ProcessRules>,
}

impl ProcessRule {
    /// Rule set applied to every uploaded file: strip extra whitespace and
    /// URLs/e-mails, split on `###`, at most 500 tokens per chunk.
    #[must_use]
    pub fn custom_upload() -> Self {
        Self {
            mode: ProcessMode::Custom,
            rules: Some(ProcessRules {
                pre_processing_rules: vec![
                    PreProcessingRule { id: "remove_extra_spaces".to_owned(), enabled: true },
                    PreProcessingRule { id: "remove_urls_emails".to_owned(), enabled: true },
                ],
                segmentation: Segmentation { separator: "###".to_owned(), max_tokens: 500 },
            }),
        }
    }
}

/// Body of `POST /datasets/{id}/document/create-by-text`.
///
/// `process_rule` is forwarded verbatim; Dify owns its schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDocumentByText {
    pub name: String,
    pub text: String,
    #[serde(default)]
    pub indexing_technique: IndexingTechnique,
    #[serde(default = "default_process_rule")]
    pub process_rule: Value,
}

fn default_process_rule() -> Value {
    serde_json::json!({ "mode": ProcessMode::Automatic })
}

/// Body of `POST /datasets/{id}/documents/{doc}/update-by-text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDocumentByText {
    pub name: String,
    pub text: String,
}

/// Settings sent alongside an uploaded file in the multipart `data` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDocumentSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub indexing_technique: IndexingTechnique,
    pub process_rule: ProcessRule,
}

impl FileDocumentSettings {
    /// Settings for a fresh upload.
    #[must_use]
    pub fn for_create() -> Self {
        Self {
            name: None,
            indexing_technique: IndexingTechnique::HighQuality,
            process_rule: ProcessRule::custom_upload(),
        }
    }

    /// Settings for replacing an existing document's file.
    #[must_use]
    pub fn for_update() -> Self {
        Self { name: Some("Updated file".to_owned()), ..Self::for_create() }
    }

    /// Encode as the JSON string Dify expects in the `data` form field.
    ///
    /// # Errors
    /// Returns [`CoreError::Encode`] if serialization fails.
    pub fn to_form_value(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Query string of `GET /datasets`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for DatasetListQuery {
    fn default() -> Self {
        Self { page: default_page(), limit: default_limit() }
    }
}

fn default_page() -> u32 {
    1
}

pub(crate) fn default_limit() -> u32 {
    20
}
