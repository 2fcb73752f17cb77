//! Google service-account keys and OAuth access-token minting.
//!
//! A signed RS256 assertion is exchanged at the key's `token_uri` for a
//! short-lived bearer token scoped to Cloud Vision.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::UpstreamError;

pub const VISION_SCOPE: &str = "https://www.googleapis.com/auth/cloud-vision";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens this close to expiry are treated as already expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The subset of a Google service-account JSON key the relay needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default = "default_key_type")]
    pub key_type: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_key_type() -> String {
    "service_account".to_owned()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_owned()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("key_type", &self.key_type)
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Parse a downloaded JSON key.
    ///
    /// # Errors
    /// Returns [`UpstreamError::Credentials`] if required fields are missing.
    pub fn from_json(raw: &str) -> Result<Self, UpstreamError> {
        serde_json::from_str(raw)
            .map_err(|e| UpstreamError::Credentials(format!("malformed service account key: {e}")))
    }

    /// Read and parse a JSON key file.
    ///
    /// # Errors
    /// Returns [`UpstreamError::Io`] if the file cannot be read, or
    /// [`UpstreamError::Credentials`] if it is not a service-account key.
    pub fn from_file(path: &Path) -> Result<Self, UpstreamError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Assemble a key from individually-set variables (`TYPE`, `PROJECT_ID`,
    /// `PRIVATE_KEY_ID`, `PRIVATE_KEY`, `CLIENT_EMAIL`, `CLIENT_ID`, `TOKEN_URI`).
    ///
    /// Literal `\n` sequences in `PRIVATE_KEY` become newlines, since PEM
    /// blocks rarely survive `.env` files intact. Returns `Ok(None)` when
    /// neither `PRIVATE_KEY` nor `CLIENT_EMAIL` is set.
    ///
    /// # Errors
    /// Returns [`UpstreamError::Credentials`] if only one of the two is set.
    pub fn from_env_fields(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, UpstreamError> {
        let private_key = lookup("PRIVATE_KEY").filter(|v| !v.is_empty());
        let client_email = lookup("CLIENT_EMAIL").filter(|v| !v.is_empty());
        let (private_key, client_email) = match (private_key, client_email) {
            (None, None) => return Ok(None),
            (Some(k), Some(e)) => (k, e),
            (None, Some(_)) => {
                return Err(UpstreamError::Credentials("CLIENT_EMAIL set without PRIVATE_KEY".to_owned()))
            }
            (Some(_), None) => {
                return Err(UpstreamError::Credentials("PRIVATE_KEY set without CLIENT_EMAIL".to_owned()))
            }
        };
        Ok(Some(Self {
            key_type: lookup("TYPE").unwrap_or_else(default_key_type),
            project_id: lookup("PROJECT_ID"),
            private_key_id: lookup("PRIVATE_KEY_ID"),
            private_key: private_key.replace("\\n", "\n"),
            client_email,
            client_id: lookup("CLIENT_ID"),
            token_uri: lookup("TOKEN_URI").unwrap_or_else(default_token_uri),
        }))
    }

    /// Sign the JWT-bearer assertion for a token request issued at `issued_at`.
    ///
    /// # Errors
    /// Returns [`UpstreamError::Credentials`] if the private key is not a valid RSA PEM.
    pub fn assertion(&self, issued_at: DateTime<Utc>) -> Result<String, UpstreamError> {
        let iat = issued_at.timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: VISION_SCOPE,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&self.private_key_id);

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| UpstreamError::Credentials(format!("invalid private key: {e}")))?;
        jsonwebtoken::encode(&header, &claims, &key)
            .map_err(|e| UpstreamError::Credentials(format!("failed to sign assertion: {e}")))
    }

    /// Exchange a fresh assertion for an access token.
    ///
    /// # Errors
    /// Returns [`UpstreamError::Token`] if the token endpoint rejects the
    /// assertion, or [`UpstreamError::Transport`] if it cannot be reached.
    pub async fn fetch_token(&self, http: &reqwest::Client) -> Result<AccessToken, UpstreamError> {
        let now = Utc::now();
        let assertion = self.assertion(now)?;

        tracing::debug!(client_email = %self.client_email, token_uri = %self.token_uri, "requesting vision access token");

        let resp = http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(UpstreamError::Token(format!("HTTP {status}: {body}")));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| UpstreamError::Token(format!("unexpected token response: {e}")))?;

        Ok(AccessToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

/// A bearer token and the instant it stops being accepted.
#[derive(Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// `true` while the token is still safely usable at `now`.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken").field("expires_at", &self.expires_at).finish_non_exhaustive()
    }
}
