//! Upstream endpoint and credential configuration.

use std::time::Duration;

use crate::credentials::ServiceAccountKey;

/// Default Dify API base, used when `DIFY_API_URL` is unset.
pub const DEFAULT_DIFY_API_URL: &str = "https://api.dify.ai/v1";

/// End-user identifier sent to Dify when none is configured.
pub const DEFAULT_DIFY_USER: &str = "abc-123";

pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for the Dify API.
#[derive(Clone)]
#[non_exhaustive]
pub struct DifyConfig {
    /// Base URL without a trailing slash, e.g. `https://api.dify.ai/v1`.
    pub api_url: String,

    /// App key for chat, conversation and message calls.
    pub api_key: String,

    /// Knowledge key for dataset and document calls.
    pub dataset_api_key: String,

    /// End-user identifier attached to chat calls.
    pub user: String,

    pub timeout: Duration,
}

impl DifyConfig {
    /// Create a config with the default user and timeout.
    ///
    /// Any trailing `/` on `api_url` is dropped so paths can be appended verbatim.
    #[must_use]
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, dataset_api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
            dataset_api_key: dataset_api_key.into(),
            user: DEFAULT_DIFY_USER.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// Keys stay out of logs.
impl std::fmt::Debug for DifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DifyConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("dataset_api_key", &"<redacted>")
            .field("user", &self.user)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// How OCR requests authenticate against Cloud Vision.
#[derive(Clone, Default)]
#[non_exhaustive]
pub enum VisionCredentials {
    /// Plain API key, sent as the `key` query parameter.
    ApiKey(String),
    /// Service account; an OAuth access token is minted from the key.
    ServiceAccount(Box<ServiceAccountKey>),
    /// No credentials. OCR requests fail, everything else keeps working.
    #[default]
    Unconfigured,
}

impl std::fmt::Debug for VisionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Self::ServiceAccount(key) => write!(f, "ServiceAccount({})", key.client_email),
            Self::Unconfigured => f.write_str("Unconfigured"),
        }
    }
}

/// Connection settings for Google Cloud Vision.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct VisionConfig {
    /// API origin without a trailing slash.
    pub endpoint: String,
    pub credentials: VisionCredentials,
    pub timeout: Duration,
}

impl VisionConfig {
    #[must_use]
    pub fn new(credentials: VisionCredentials) -> Self {
        Self {
            endpoint: DEFAULT_VISION_ENDPOINT.to_owned(),
            credentials,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_owned();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
