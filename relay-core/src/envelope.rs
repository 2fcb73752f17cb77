//! Response bodies synthesized by the relay itself rather than relayed.

use serde::{Deserialize, Serialize};

/// Placeholder returned when OCR finds no text in an image.
pub const NO_TEXT_FOUND: &str = "No text found";

/// Generic failure payload: `{"error": ..., "status_code": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub status_code: u16,
    /// Raw upstream body, only attached on chat failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorEnvelope {
    #[must_use]
    pub fn new(error: impl Into<String>, status_code: u16) -> Self {
        Self { error: error.into(), status_code, message: None }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Result of `POST /ocr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrText {
    pub text: String,
}

impl OcrText {
    /// Wrap detected text, falling back to [`NO_TEXT_FOUND`].
    #[must_use]
    pub fn from_detection(detected: Option<String>) -> Self {
        Self { text: detected.unwrap_or_else(|| NO_TEXT_FOUND.to_owned()) }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_omits_message_unless_set() {
        let plain = ErrorEnvelope::new("Failed to delete document", 404);
        assert_eq!(
            serde_json::to_value(&plain).ok(),
            Some(json!({"error": "Failed to delete document", "status_code": 404}))
        );

        let chat = ErrorEnvelope::new("Failed to send the message", 400).with_message("bad query");
        assert_eq!(
            serde_json::to_value(&chat).ok(),
            Some(json!({
                "error": "Failed to send the message",
                "status_code": 400,
                "message": "bad query",
            }))
        );
    }

    #[test]
    fn ocr_text_falls_back_when_nothing_detected() {
        assert_eq!(OcrText::from_detection(None).text, NO_TEXT_FOUND);
        assert_eq!(OcrText::from_detection(Some("MENU".to_owned())).text, "MENU");
    }
}
