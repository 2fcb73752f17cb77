//! Fuzz target: dataset, document and conversation id validation.
//!
//! Any id that parses is interpolated into an upstream URL, so it must
//! stay a single path segment.

#![no_main]

use libfuzzer_sys::fuzz_target;
use relay_core::{ConversationId, DatasetId, DocumentId};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else { return };

    if let Ok(id) = DatasetId::parse(raw) {
        let s = id.as_str();
        assert!(!s.is_empty());
        assert!(!s.contains(['/', '?', '#', '%', '\\']), "{s:?} escapes its segment");
        assert!(s != "." && s != "..");
    }
    let _ = DocumentId::parse(raw);
    let _ = ConversationId::parse(raw);
});
