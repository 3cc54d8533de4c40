pub mod classify_use_case;
pub mod ingest_use_case;
pub mod ports;
pub mod report_use_case;

use serde::Serialize;
use std::fmt::Display;

/// A record-level failure that was logged and skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFailure {
    pub key: String,
    pub message: String,
}

impl RecordFailure {
    pub fn new(key: impl Into<String>, error: &impl Display) -> Self {
        Self {
            key: key.into(),
            message: error.to_string(),
        }
    }
}
