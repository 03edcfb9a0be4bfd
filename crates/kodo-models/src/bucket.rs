//! Bucket models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::choice::InvalidChoice;

const EXPECTED: &str = "0 (public), 1 (private)";

/// Who may read objects of a bucket without a signed URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Anyone can read
    #[default]
    Public,
    /// Reads require a signed URL
    Private,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Public => "public",
            AccessMode::Private => "private",
        }
    }

    /// Value of the `private` form field.
    pub fn flag(&self) -> u8 {
        match self {
            AccessMode::Public => 0,
            AccessMode::Private => 1,
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<u8> for AccessMode {
    type Error = InvalidChoice;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AccessMode::Public),
            1 => Ok(AccessMode::Private),
            other => Err(InvalidChoice::new("access mode", other, EXPECTED)),
        }
    }
}

impl FromStr for AccessMode {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "0" | "public" => Ok(AccessMode::Public),
            "1" | "private" => Ok(AccessMode::Private),
            _ => Err(InvalidChoice::new("access mode", s, EXPECTED)),
        }
    }
}

impl TryFrom<&str> for AccessMode {
    type Error = InvalidChoice;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A bucket together with the domains bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BucketInfo {
    /// Bucket name
    pub name: String,
    /// CDN / origin domains bound to the bucket
    pub domains: Vec<String>,
}
