//! Object metadata and listing models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::choice::InvalidChoice;

// ============================================================================
// Enumerations
// ============================================================================

const TIER_EXPECTED: &str = "0 (standard), 1 (infrequent)";
const STATUS_EXPECTED: &str = "0 (enabled), 1 (disabled)";

/// Storage tier of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageTier {
    /// Standard storage
    #[default]
    Standard,
    /// Infrequent access storage
    Infrequent,
}

impl StorageTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageTier::Standard => "standard",
            StorageTier::Infrequent => "infrequent",
        }
    }

    /// Numeric value used in `chtype` requests and the `type` field.
    pub fn code(&self) -> u8 {
        match self {
            StorageTier::Standard => 0,
            StorageTier::Infrequent => 1,
        }
    }
}

impl fmt::Display for StorageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<u8> for StorageTier {
    type Error = InvalidChoice;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(StorageTier::Standard),
            1 => Ok(StorageTier::Infrequent),
            other => Err(InvalidChoice::new("storage tier", other, TIER_EXPECTED)),
        }
    }
}

impl FromStr for StorageTier {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "0" | "standard" => Ok(StorageTier::Standard),
            "1" | "infrequent" | "ia" => Ok(StorageTier::Infrequent),
            _ => Err(InvalidChoice::new("storage tier", s, TIER_EXPECTED)),
        }
    }
}

impl TryFrom<&str> for StorageTier {
    type Error = InvalidChoice;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Whether an object can be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStatus {
    #[default]
    Enabled,
    Disabled,
}

impl ObjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectStatus::Enabled => "enabled",
            ObjectStatus::Disabled => "disabled",
        }
    }

    /// Numeric value used in `chstatus` requests and the `status` field.
    pub fn code(&self) -> u8 {
        match self {
            ObjectStatus::Enabled => 0,
            ObjectStatus::Disabled => 1,
        }
    }
}

impl fmt::Display for ObjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<u8> for ObjectStatus {
    type Error = InvalidChoice;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ObjectStatus::Enabled),
            1 => Ok(ObjectStatus::Disabled),
            other => Err(InvalidChoice::new("object status", other, STATUS_EXPECTED)),
        }
    }
}

impl FromStr for ObjectStatus {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "0" | "enabled" => Ok(ObjectStatus::Enabled),
            "1" | "disabled" => Ok(ObjectStatus::Disabled),
            _ => Err(InvalidChoice::new("object status", s, STATUS_EXPECTED)),
        }
    }
}

impl TryFrom<&str> for ObjectStatus {
    type Error = InvalidChoice;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// Opaque listing continuation token.
///
/// Empty means "start of listing" when sent and "no further pages" when
/// received. A marker must be sent back exactly as it was received.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Marker(String);

impl Marker {
    /// Marker for the first page.
    pub fn start() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when this marker ends a listing.
    pub fn is_end(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Marker {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Marker {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ============================================================================
// Object Metadata
// ============================================================================

/// Read-only snapshot of an object's metadata.
///
/// Returned by `stat` (without `key`) and inside listing pages (with `key`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    /// Object key (absent in stat responses)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,

    /// Size in bytes
    pub fsize: u64,

    /// Content hash (etag)
    pub hash: String,

    /// MIME type
    #[serde(default)]
    pub mime_type: String,

    /// Upload time in 100-nanosecond ticks since the Unix epoch
    #[serde(default)]
    pub put_time: i64,

    /// Raw storage tier; the service also reports tiers this crate does not manage
    #[serde(rename = "type", default)]
    pub file_type: u8,

    /// Raw status flag
    #[serde(default)]
    pub status: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_user: Option<String>,
}

impl ObjectMetadata {
    /// Storage tier, if it is one this crate manages.
    pub fn tier(&self) -> Option<StorageTier> {
        StorageTier::try_from(self.file_type).ok()
    }

    pub fn object_status(&self) -> Option<ObjectStatus> {
        ObjectStatus::try_from(self.status).ok()
    }

    /// Upload time as a timestamp.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        let secs = self.put_time.div_euclid(10_000_000);
        let nanos = (self.put_time.rem_euclid(10_000_000) * 100) as u32;
        DateTime::from_timestamp(secs, nanos)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    /// Marker for the next page; empty when the listing is exhausted
    #[serde(default)]
    pub marker: Marker,

    #[serde(default)]
    pub items: Vec<ObjectMetadata>,

    /// Grouped prefixes when a delimiter was requested
    #[serde(default)]
    pub common_prefixes: Vec<String>,
}

/// A listing followed to exhaustion.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub items: Vec<ObjectMetadata>,
    pub common_prefixes: Vec<String>,
}

/// Result of counting the objects of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectCount {
    pub amount: u64,
}

// ============================================================================
// Upload / Fetch Results
// ============================================================================

/// Response of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PutResult {
    /// Key the object was stored under
    pub key: String,
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fsize: Option<u64>,
}

/// Body of a 2xx upload response.
///
/// The service answers with `{key, hash, fsize}` unless the token's put
/// policy sets `returnBody`, in which case the caller-defined body comes back
/// as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum UploadResult {
    Stored(PutResult),
    Custom(serde_json::Value),
}

impl UploadResult {
    /// Parse a successful upload body. Never fails: a body that is not JSON
    /// is kept as a string, an empty one becomes `null`.
    pub fn from_body(body: &[u8]) -> Self {
        if body.is_empty() {
            return Self::Custom(serde_json::Value::Null);
        }
        serde_json::from_slice(body).unwrap_or_else(|_| {
            Self::Custom(serde_json::Value::String(
                String::from_utf8_lossy(body).into_owned(),
            ))
        })
    }

    /// The stored object, when the service returned the default body.
    pub fn stored(&self) -> Option<&PutResult> {
        match self {
            Self::Stored(put) => Some(put),
            Self::Custom(_) => None,
        }
    }
}

/// Response of a fetch from a remote URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchResult {
    pub key: String,
    pub hash: String,
    pub fsize: u64,
    #[serde(default)]
    pub mime_type: String,
}
