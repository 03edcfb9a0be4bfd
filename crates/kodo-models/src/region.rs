//! Storage regions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::choice::InvalidChoice;

const EXPECTED: &str = "z0, z1, z2, na0, as0, cn-east-2";

/// Region a bucket lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum Region {
    /// East China
    #[default]
    #[serde(rename = "z0")]
    Z0,
    /// North China
    #[serde(rename = "z1")]
    Z1,
    /// South China
    #[serde(rename = "z2")]
    Z2,
    /// North America
    #[serde(rename = "na0")]
    Na0,
    /// Southeast Asia
    #[serde(rename = "as0")]
    As0,
    /// East China (Zhejiang 2)
    #[serde(rename = "cn-east-2")]
    CnEast2,
}

impl Region {
    /// All supported regions.
    pub const ALL: &'static [Region] = &[
        Region::Z0,
        Region::Z1,
        Region::Z2,
        Region::Na0,
        Region::As0,
        Region::CnEast2,
    ];

    /// Region identifier as used in request paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Z0 => "z0",
            Region::Z1 => "z1",
            Region::Z2 => "z2",
            Region::Na0 => "na0",
            Region::As0 => "as0",
            Region::CnEast2 => "cn-east-2",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Region {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| InvalidChoice::new("region", s, EXPECTED))
    }
}

impl TryFrom<&str> for Region {
    type Error = InvalidChoice;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}
