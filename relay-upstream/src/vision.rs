//! Google Cloud Vision text detection over the REST `images:annotate` API.

use async_trait::async_trait;
use base64::Engine as _;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use crate::backend::TextDetector;
use crate::credentials::{AccessToken, ServiceAccountKey};
use crate::http::build_client;
use crate::{UpstreamError, VisionConfig, VisionCredentials};

/// OCR client for Cloud Vision.
///
/// With service-account credentials the current access token is kept and
/// reused until shortly before it expires.
#[derive(Debug)]
pub struct VisionClient {
    http: reqwest::Client,
    config: VisionConfig,
    token: Mutex<Option<AccessToken>>,
}

impl VisionClient {
    /// Create a client with its own connection pool.
    ///
    /// # Errors
    /// Returns [`UpstreamError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: VisionConfig) -> Result<Self, UpstreamError> {
        let http = build_client(config.timeout)?;
        Ok(Self::with_http(http, config))
    }

    #[must_use]
    pub fn with_http(http: reqwest::Client, config: VisionConfig) -> Self {
        Self { http, config, token: Mutex::new(None) }
    }

    /// `true` if OCR requests can be attempted at all.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !matches!(self.config.credentials, VisionCredentials::Unconfigured)
    }

    async fn bearer_token(&self, key: &ServiceAccountKey) -> Result<String, UpstreamError> {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.value.clone());
        }
        let token = key.fetch_token(&self.http).await?;
        tracing::info!(expires_at = %token.expires_at, "obtained vision access token");
        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    #[serde(default)]
    error: Option<ImageError>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ImageError {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// Pull the full-text annotation out of an `images:annotate` response.
///
/// The first annotation holds the whole detected text block; the rest are
/// individual words and are ignored.
fn first_description(resp: AnnotateResponse) -> Result<Option<String>, UpstreamError> {
    let Some(image) = resp.responses.into_iter().next() else {
        return Ok(None);
    };
    if let Some(err) = image.error {
        return Err(UpstreamError::Vision(format!("{} (code {})", err.message, err.code)));
    }
    Ok(image.text_annotations.into_iter().next().map(|a| a.description))
}

#[async_trait]
impl TextDetector for VisionClient {
    async fn detect_text(&self, image: Vec<u8>) -> Result<Option<String>, UpstreamError> {
        let url = format!("{}/v1/images:annotate", self.config.endpoint);
        let body = json!({
            "requests": [{
                "image": { "content": base64::engine::general_purpose::STANDARD.encode(&image) },
                "features": [{ "type": "TEXT_DETECTION" }],
            }]
        });

        let req = match &self.config.credentials {
            VisionCredentials::ApiKey(key) => self.http.post(&url).query(&[("key", key.as_str())]),
            VisionCredentials::ServiceAccount(account) => {
                let token = self.bearer_token(account).await?;
                self.http.post(&url).bearer_auth(token)
            }
            VisionCredentials::Unconfigured => {
                return Err(UpstreamError::Credentials(
                    "set GOOGLE_VISION_API_KEY, PATH_TO_GCV_JSON_FILE or CLIENT_EMAIL/PRIVATE_KEY".to_owned(),
                ))
            }
        };

        tracing::info!(bytes = image.len(), "requesting text detection");

        let resp = req.json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), body = %text, "vision request failed");
            return Err(UpstreamError::Status { status: status.as_u16(), body: text });
        }

        let parsed: AnnotateResponse =
            serde_json::from_str(&text).map_err(|e| UpstreamError::Decode(format!("images:annotate: {e}")))?;
        first_description(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: serde_json::Value) -> AnnotateResponse {
        match serde_json::from_value(raw) {
            Ok(r) => r,
            Err(e) => panic!("invalid fixture: {e}"),
        }
    }

    #[test]
    fn first_annotation_is_the_full_text() {
        let resp = parse(json!({
            "responses": [{
                "textAnnotations": [
                    {"description": "OPEN 9-5\nMon-Fri", "locale": "en"},
                    {"description": "OPEN"},
                ]
            }]
        }));
        match first_description(resp) {
            Ok(Some(text)) => assert_eq!(text, "OPEN 9-5\nMon-Fri"),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn empty_response_means_no_text() {
        assert!(matches!(first_description(parse(json!({"responses": [{}]}))), Ok(None)));
        assert!(matches!(first_description(parse(json!({}))), Ok(None)));
    }

    #[test]
    fn blank_first_annotation_is_still_returned() {
        let resp = parse(json!({"responses": [{"textAnnotations": [{"description": ""}]}]}));
        match first_description(resp) {
            Ok(Some(text)) => assert!(text.is_empty()),
            other => panic!("expected an empty description, got {other:?}"),
        }
    }

    #[test]
    fn per_image_error_is_surfaced() {
        let resp = parse(json!({
            "responses": [{"error": {"code": 3, "message": "Bad image data."}}]
        }));
        match first_description(resp) {
            Err(UpstreamError::Vision(msg)) => assert!(msg.contains("Bad image data.")),
            other => panic!("expected Vision error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unconfigured_client_refuses_ocr() {
        let client = VisionClient::with_http(reqwest::Client::new(), VisionConfig::new(VisionCredentials::Unconfigured));
        assert!(!client.is_configured());
        let res = client.detect_text(b"png".to_vec()).await;
        assert!(matches!(res, Err(UpstreamError::Credentials(_))));
    }
}
