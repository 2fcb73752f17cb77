//! Gateway configuration read from the environment.
//!
//! `.env` is loaded by the binary before this runs, so every value here can
//! come from either source. Empty values count as unset.

use std::path::PathBuf;
use std::time::Duration;

use relay_upstream::config::{DEFAULT_DIFY_API_URL, DEFAULT_TIMEOUT};
use relay_upstream::{DifyConfig, ServiceAccountKey, UpstreamError, VisionConfig, VisionCredentials};

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";

/// Dify caps document uploads at 15 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 15 * 1024 * 1024;

/// Errors raised while assembling [`GatewayConfig`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("vision credentials: {0}")]
    Vision(#[from] UpstreamError),
}

/// Everything the gateway needs to start.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct GatewayConfig {
    pub listen_addr: String,
    pub max_upload_bytes: usize,
    pub dify: DifyConfig,
    pub vision: VisionConfig,
}

impl GatewayConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// See [`GatewayConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    /// Returns [`ConfigError::Missing`] if a Dify key is unset,
    /// [`ConfigError::Invalid`] for unparsable numbers, and
    /// [`ConfigError::Vision`] if configured Vision credentials are unusable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let timeout = match get("RELAY_UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("RELAY_UPSTREAM_TIMEOUT_SECS", &raw)?),
            None => DEFAULT_TIMEOUT,
        };
        let max_upload_bytes = match get("RELAY_MAX_UPLOAD_BYTES") {
            Some(raw) => parse_number("RELAY_MAX_UPLOAD_BYTES", &raw)?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let mut dify = DifyConfig::new(
            get("DIFY_API_URL").unwrap_or_else(|| DEFAULT_DIFY_API_URL.to_owned()),
            require("DIFY_API_KEY")?,
            require("DIFY_API_DATASET_KEY")?,
        )
        .with_timeout(timeout);
        if let Some(user) = get("DIFY_USER") {
            dify = dify.with_user(user);
        }

        let mut vision = VisionConfig::new(vision_credentials(&get)?).with_timeout(timeout);
        if let Some(endpoint) = get("VISION_API_ENDPOINT") {
            vision = vision.with_endpoint(endpoint);
        }

        Ok(Self {
            listen_addr: get("RELAY_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_owned()),
            max_upload_bytes,
            dify,
            vision,
        })
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid { var, reason: e.to_string() })
}

/// API key first, then a key file, then a key assembled from individual variables.
fn vision_credentials(get: &impl Fn(&str) -> Option<String>) -> Result<VisionCredentials, ConfigError> {
    if let Some(key) = get("GOOGLE_VISION_API_KEY") {
        return Ok(VisionCredentials::ApiKey(key));
    }
    if let Some(path) = get("PATH_TO_GCV_JSON_FILE").or_else(|| get("GOOGLE_APPLICATION_CREDENTIALS")) {
        let key = ServiceAccountKey::from_file(&PathBuf::from(path))?;
        return Ok(VisionCredentials::ServiceAccount(Box::new(key)));
    }
    match ServiceAccountKey::from_env_fields(get)? {
        Some(key) => Ok(VisionCredentials::ServiceAccount(Box::new(key))),
        None => Ok(VisionCredentials::Unconfigured),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write as _;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        move |k| map.get(k).cloned()
    }

    const DIFY_KEYS: [(&str, &str); 2] = [("DIFY_API_KEY", "app-1"), ("DIFY_API_DATASET_KEY", "dataset-1")];

    #[test]
    fn defaults_apply_when_only_keys_are_set() {
        let cfg = match GatewayConfig::from_lookup(lookup(&DIFY_KEYS)) {
            Ok(c) => c,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(cfg.listen_addr, DEFAULT_LISTEN_ADDR);
        assert_eq!(cfg.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(cfg.dify.api_url, DEFAULT_DIFY_API_URL);
        assert_eq!(cfg.dify.user, "abc-123");
        assert!(matches!(cfg.vision.credentials, VisionCredentials::Unconfigured));
    }

    #[test]
    fn missing_dataset_key_is_reported_by_name() {
        let res = GatewayConfig::from_lookup(lookup(&[("DIFY_API_KEY", "app-1"), ("DIFY_API_DATASET_KEY", "  ")]));
        assert!(matches!(res, Err(ConfigError::Missing("DIFY_API_DATASET_KEY"))), "got {res:?}");
    }

    #[test]
    fn overrides_are_applied() {
        let mut pairs = DIFY_KEYS.to_vec();
        pairs.extend([
            ("DIFY_API_URL", "http://dify.internal/v1/"),
            ("DIFY_USER", "calendar-bot"),
            ("RELAY_LISTEN_ADDR", "127.0.0.1:9000"),
            ("RELAY_MAX_UPLOAD_BYTES", "1024"),
            ("RELAY_UPSTREAM_TIMEOUT_SECS", "5"),
            ("GOOGLE_VISION_API_KEY", "vk"),
            ("VISION_API_ENDPOINT", "http://vision.internal/"),
        ]);
        let cfg = match GatewayConfig::from_lookup(lookup(&pairs)) {
            Ok(c) => c,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(cfg.dify.api_url, "http://dify.internal/v1");
        assert_eq!(cfg.dify.user, "calendar-bot");
        assert_eq!(cfg.dify.timeout, Duration::from_secs(5));
        assert_eq!(cfg.listen_addr, "127.0.0.1:9000");
        assert_eq!(cfg.max_upload_bytes, 1024);
        assert_eq!(cfg.vision.endpoint, "http://vision.internal");
        assert!(matches!(cfg.vision.credentials, VisionCredentials::ApiKey(ref k) if k == "vk"));
    }

    #[test]
    fn bad_number_is_invalid() {
        let mut pairs = DIFY_KEYS.to_vec();
        pairs.push(("RELAY_MAX_UPLOAD_BYTES", "lots"));
        let res = GatewayConfig::from_lookup(lookup(&pairs));
        assert!(
            matches!(res, Err(ConfigError::Invalid { var: "RELAY_MAX_UPLOAD_BYTES", .. })),
            "got {res:?}"
        );
    }

    #[test]
    fn key_file_is_loaded() {
        let path = std::env::temp_dir().join(format!("relay-gcv-{}.json", std::process::id()));
        {
            let mut f = match std::fs::File::create(&path) {
                Ok(f) => f,
                Err(e) => panic!("cannot create temp key: {e}"),
            };
            let written = f.write_all(
                br#"{"type":"service_account","private_key":"pem","client_email":"ocr@p.iam.gserviceaccount.com"}"#,
            );
            assert!(written.is_ok());
        }
        let path_str = path.display().to_string();
        let mut pairs: Vec<(&str, &str)> = DIFY_KEYS.to_vec();
        pairs.push(("PATH_TO_GCV_JSON_FILE", path_str.as_str()));
        let res = GatewayConfig::from_lookup(lookup(&pairs));
        let _ = std::fs::remove_file(&path);

        match res {
            Ok(cfg) => match cfg.vision.credentials {
                VisionCredentials::ServiceAccount(key) => {
                    assert_eq!(key.client_email, "ocr@p.iam.gserviceaccount.com");
                }
                other => panic!("expected service account, got {other:?}"),
            },
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn unreadable_key_file_fails_startup() {
        let mut pairs = DIFY_KEYS.to_vec();
        pairs.push(("GOOGLE_APPLICATION_CREDENTIALS", "/nonexistent/relay-key.json"));
        let res = GatewayConfig::from_lookup(lookup(&pairs));
        assert!(matches!(res, Err(ConfigError::Vision(UpstreamError::Io(_)))), "got {res:?}");
    }

    #[test]
    fn individual_variables_build_a_service_account() {
        let mut pairs = DIFY_KEYS.to_vec();
        pairs.extend([("CLIENT_EMAIL", "ocr@p.iam.gserviceaccount.com"), ("PRIVATE_KEY", "a\\nb")]);
        let cfg = match GatewayConfig::from_lookup(lookup(&pairs)) {
            Ok(c) => c,
            Err(e) => panic!("unexpected error: {e}"),
        };
        match cfg.vision.credentials {
            VisionCredentials::ServiceAccount(key) => assert_eq!(key.private_key, "a\nb"),
            other => panic!("expected service account, got {other:?}"),
        }
    }
}
