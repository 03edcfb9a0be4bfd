//! Batch item results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of one operation inside a batch request.
///
/// Items correlate by position with the operations that produced them.
/// A failed item does not fail the batch call itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchItem {
    /// Per-item status code; 200 means the operation succeeded
    pub code: i64,

    /// Success payload (e.g. stat metadata) or `{"error": "..."}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl BatchItem {
    pub fn is_success(&self) -> bool {
        self.code == 200
    }

    /// Error message of a failed item.
    pub fn error(&self) -> Option<&str> {
        if self.is_success() {
            return None;
        }
        self.data
            .as_ref()
            .and_then(|d| d.get("error"))
            .and_then(Value::as_str)
    }
}
