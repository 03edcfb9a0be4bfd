//! Validation error for enumerated arguments.

use thiserror::Error;

/// A value outside the allowed set of an enumerated argument.
///
/// Raised while converting raw input (numbers or strings) into one of the
/// enumerations in this crate, before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} `{value}`, expected one of: {expected}")]
pub struct InvalidChoice {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

impl InvalidChoice {
    pub fn new(kind: &'static str, value: impl ToString, expected: &'static str) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected,
        }
    }

    /// Name of the argument that failed validation.
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}
