//! Uniform result envelope.
//!
//! Every facade operation answers with an [`Envelope`]: `{ok, message, code, data}`.
//! The fields are private so the two invariants hold by construction:
//! - a failed envelope never carries data
//! - a successful envelope never carries an error code

use schemars::JsonSchema;
use serde::Serialize;

/// Message attached to every successful envelope.
pub const SUCCESS_MESSAGE: &str = "operation succeeded";

/// Outcome of one facade call.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct Envelope<T> {
    ok: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T> Envelope<T> {
    /// Successful call with a payload.
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            message: SUCCESS_MESSAGE.to_string(),
            code: None,
            data: Some(data),
        }
    }

    /// Successful call without a payload.
    pub fn done() -> Self {
        Self {
            ok: true,
            message: SUCCESS_MESSAGE.to_string(),
            code: None,
            data: None,
        }
    }

    /// Failed call. `code` is the service's code, or `-1` for local failures.
    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            code: Some(code),
            data: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<i64> {
        self.code
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_has_no_code() {
        let env = Envelope::success(vec!["a", "b"]);
        assert!(env.is_ok());
        assert_eq!(env.code(), None);
        assert_eq!(env.message(), SUCCESS_MESSAGE);
        assert_eq!(env.data(), Some(&vec!["a", "b"]));
    }

    #[test]
    fn test_failure_has_no_data() {
        let env: Envelope<u64> = Envelope::failure(612, "no such file or directory");
        assert!(!env.is_ok());
        assert_eq!(env.code(), Some(612));
        assert_eq!(env.message(), "no such file or directory");
        assert!(env.into_data().is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let ok = serde_json::to_value(Envelope::success(json!({"amount": 3}))).unwrap();
        assert_eq!(
            ok,
            json!({"ok": true, "message": "operation succeeded", "data": {"amount": 3}})
        );

        let done = serde_json::to_value(Envelope::<()>::done()).unwrap();
        assert_eq!(done, json!({"ok": true, "message": "operation succeeded"}));

        let failed = serde_json::to_value(Envelope::<()>::failure(-1, "bad tier")).unwrap();
        assert_eq!(failed, json!({"ok": false, "message": "bad tier", "code": -1}));
    }
}
