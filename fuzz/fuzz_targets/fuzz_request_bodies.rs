//! Fuzz target: JSON deserialization of caller request bodies.
//!
//! Arbitrary bytes fed to the body types must never panic, and anything
//! that parses must serialize again.

#![no_main]

use libfuzzer_sys::fuzz_target;
use relay_core::{ChatMessage, CreateDatasetRequest, CreateDocumentByText, UpdateDocumentByText};

fuzz_target!(|data: &[u8]| {
    if let Ok(req) = serde_json::from_slice::<CreateDatasetRequest>(data) {
        serde_json::to_vec(&req).expect("parsed dataset request must serialize");
    }
    if let Ok(doc) = serde_json::from_slice::<CreateDocumentByText>(data) {
        serde_json::to_vec(&doc).expect("parsed document must serialize");
    }
    let _ = serde_json::from_slice::<UpdateDocumentByText>(data);
    let _ = serde_json::from_slice::<ChatMessage>(data);
});
