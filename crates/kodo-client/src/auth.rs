//! Request signing and upload tokens.
//!
//! Both use HMAC-SHA1 over the secret key, encoded with URL-safe base64
//! (padding kept):
//! - management requests: `Authorization: QBox <ak>:<sign(path?query\n[form body])>`
//! - upload tokens: `<ak>:<sign(encoded)>:<encoded>` where `encoded` is the
//!   URL-safe base64 of the JSON put policy

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE, Engine};
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha1::Sha1;

use crate::error::{KodoError, KodoResult};

type HmacSha1 = Hmac<Sha1>;

/// Content type whose body is part of the signed data.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Default upload token lifetime in seconds.
pub const DEFAULT_UPLOAD_TOKEN_EXPIRY_SECS: u64 = 3600;

/// Put-policy fields kept when a token is issued with `strict = true`.
pub const PUT_POLICY_FIELDS: &[&str] = &[
    "callbackUrl",
    "callbackBody",
    "callbackHost",
    "callbackBodyType",
    "callbackFetchKey",
    "returnUrl",
    "returnBody",
    "endUser",
    "saveKey",
    "forceSaveKey",
    "insertOnly",
    "detectMime",
    "mimeLimit",
    "fsizeMin",
    "fsizeLimit",
    "persistentOps",
    "persistentNotifyUrl",
    "persistentPipeline",
    "persistentType",
    "deleteAfterDays",
    "fileType",
    "isPrefixalScope",
];

/// URL-safe base64 with padding, as the service expects in paths and tokens.
pub fn urlsafe_base64(data: impl AsRef<[u8]>) -> String {
    URL_SAFE.encode(data)
}

/// Encoded `bucket:key` (or bare `bucket`) entry used in operation paths.
pub fn encoded_entry(bucket: &str, key: Option<&str>) -> String {
    match key {
        Some(key) => urlsafe_base64(format!("{}:{}", bucket, key)),
        None => urlsafe_base64(bucket),
    }
}

/// Upload deadline in Unix seconds.
pub fn upload_deadline(now: i64, expires_secs: u64) -> i64 {
    now.saturating_add(i64::try_from(expires_secs).unwrap_or(i64::MAX))
}

// =============================================================================
// Credentials
// =============================================================================

/// Immutable access/secret key pair.
#[derive(Clone)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    fn digest(&self, data: &[u8]) -> KodoResult<String> {
        let mut mac = HmacSha1::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| KodoError::config(format!("Invalid HMAC key: {}", e)))?;
        mac.update(data);
        Ok(urlsafe_base64(mac.finalize().into_bytes()))
    }

    /// `<ak>:<sign(data)>`
    pub fn sign(&self, data: &[u8]) -> KodoResult<String> {
        Ok(format!("{}:{}", self.access_key, self.digest(data)?))
    }

    /// `<ak>:<sign(encoded)>:<encoded>` with `encoded = base64(data)`.
    pub fn sign_with_data(&self, data: &[u8]) -> KodoResult<String> {
        let encoded = urlsafe_base64(data);
        let sign = self.digest(encoded.as_bytes())?;
        Ok(format!("{}:{}:{}", self.access_key, sign, encoded))
    }

    /// Value of the `Authorization` header for a management request.
    ///
    /// The body is signed only for form-encoded requests.
    pub fn authorization(
        &self,
        url: &str,
        body: Option<&[u8]>,
        content_type: Option<&str>,
    ) -> KodoResult<String> {
        let parsed = url::Url::parse(url)
            .map_err(|e| KodoError::invalid_argument(format!("invalid url {}: {}", url, e)))?;

        let mut data = parsed.path().as_bytes().to_vec();
        if let Some(query) = parsed.query() {
            data.push(b'?');
            data.extend_from_slice(query.as_bytes());
        }
        data.push(b'\n');
        if let (Some(body), Some(FORM_CONTENT_TYPE)) = (body, content_type) {
            data.extend_from_slice(body);
        }

        Ok(format!("QBox {}", self.sign(&data)?))
    }

    /// Issue an upload token valid for `expires_secs` from now.
    pub fn upload_token(
        &self,
        bucket: &str,
        key: Option<&str>,
        expires_secs: u64,
        policy: Option<&Map<String, Value>>,
        strict: bool,
    ) -> KodoResult<String> {
        let now = chrono::Utc::now().timestamp();
        self.upload_token_at(bucket, key, expires_secs, policy, strict, now)
    }

    /// Issue an upload token against an explicit clock reading (Unix seconds).
    ///
    /// Identical arguments always yield the identical token.
    pub fn upload_token_at(
        &self,
        bucket: &str,
        key: Option<&str>,
        expires_secs: u64,
        policy: Option<&Map<String, Value>>,
        strict: bool,
        now: i64,
    ) -> KodoResult<String> {
        if bucket.is_empty() {
            return Err(KodoError::invalid_argument("bucket cannot be empty"));
        }

        let mut args = Map::new();
        if let Some(policy) = policy {
            for (field, value) in policy {
                if !strict || PUT_POLICY_FIELDS.contains(&field.as_str()) {
                    args.insert(field.clone(), value.clone());
                }
            }
        }

        let scope = match key {
            Some(key) => format!("{}:{}", bucket, key),
            None => bucket.to_string(),
        };
        args.insert("scope".to_string(), Value::String(scope));
        args.insert(
            "deadline".to_string(),
            Value::from(upload_deadline(now, expires_secs)),
        );

        let json = serde_json::to_vec(&Value::Object(args))?;
        self.sign_with_data(&json)
    }
}

// =============================================================================
// Tests
// =============================================================================
