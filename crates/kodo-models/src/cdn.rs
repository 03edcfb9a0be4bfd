//! CDN refresh / prefetch job responses.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status code the CDN provider reports for an accepted job.
pub const CDN_SUCCESS_CODE: i64 = 200;

/// Response of a refresh or prefetch submission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CdnResponse {
    /// Provider status code, independent of the HTTP status
    pub code: i64,

    /// Provider message ("success" on acceptance)
    #[serde(default)]
    pub error: String,

    /// Job identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_urls: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_dirs: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_quota_day: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_surplus_day: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir_quota_day: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir_surplus_day: Option<i64>,

    /// Prefetch quota
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_day: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surplus_day: Option<i64>,
}

impl CdnResponse {
    pub fn is_success(&self) -> bool {
        self.code == CDN_SUCCESS_CODE
    }
}
