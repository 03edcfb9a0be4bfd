//! Signed request execution.
//!
//! [`KodoClient`] turns a method, URL and optional body into a signed
//! [`HttpRequest`], sends it through the configured [`Transport`] inside a
//! tracing span, records metrics, and maps non-2xx responses to
//! [`KodoError::Service`].

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info_span, warn, Instrument};

use crate::auth::{Credentials, FORM_CONTENT_TYPE};
use crate::config::Hosts;
use crate::error::{KodoError, KodoResult};
use crate::metrics::record_request;
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};

/// Signed access to the management, listing and CDN endpoints.
#[derive(Clone)]
pub struct KodoClient {
    transport: Arc<dyn Transport>,
    credentials: Arc<Credentials>,
    hosts: Arc<Hosts>,
}

impl KodoClient {
    pub fn new(transport: Arc<dyn Transport>, credentials: Credentials, hosts: Hosts) -> Self {
        Self {
            transport,
            credentials: Arc::new(credentials),
            hosts: Arc::new(hosts),
        }
    }

    pub fn hosts(&self) -> &Hosts {
        &self.hosts
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    // =========================================================================
    // Request Helpers
    // =========================================================================

    /// Signed POST with an optional form body. Returns the body of a 2xx response.
    pub async fn post_form(
        &self,
        operation: &str,
        url: String,
        form: Option<String>,
    ) -> KodoResult<Vec<u8>> {
        let body = form.map(String::into_bytes);
        let authorization =
            self.credentials
                .authorization(&url, body.as_deref(), Some(FORM_CONTENT_TYPE))?;

        let request = HttpRequest {
            method: Method::Post,
            url,
            headers: vec![
                ("Authorization".to_string(), authorization),
                ("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()),
            ],
            body,
        };

        let response = self.execute(operation, request).await?;
        Self::expect_success(response)
    }

    /// Signed GET. Returns the body of a 2xx response.
    pub async fn get(&self, operation: &str, url: String) -> KodoResult<Vec<u8>> {
        let authorization = self.credentials.authorization(&url, None, None)?;
        let request = HttpRequest {
            method: Method::Get,
            url,
            headers: vec![("Authorization".to_string(), authorization)],
            body: None,
        };

        let response = self.execute(operation, request).await?;
        Self::expect_success(response)
    }

    /// Signed POST with a JSON body. The response is returned whatever its status.
    pub async fn post_json<B: Serialize>(
        &self,
        operation: &str,
        url: String,
        body: &B,
    ) -> KodoResult<HttpResponse> {
        let body = serde_json::to_vec(body)?;
        let authorization = self
            .credentials
            .authorization(&url, Some(&body), Some("application/json"))?;

        let request = HttpRequest {
            method: Method::Post,
            url,
            headers: vec![
                ("Authorization".to_string(), authorization),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body: Some(body),
        };

        self.execute(operation, request).await
    }

    /// Decode a JSON response body.
    pub fn decode<T: DeserializeOwned>(operation: &str, body: &[u8]) -> KodoResult<T> {
        serde_json::from_slice(body).map_err(|e| {
            let text = String::from_utf8_lossy(body);
            KodoError::invalid_response(format!(
                "{}: cannot parse response: {} (body prefix: {})",
                operation,
                e,
                text.chars().take(200).collect::<String>()
            ))
        })
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    /// Send a request with tracing and metrics.
    async fn execute(&self, operation: &str, request: HttpRequest) -> KodoResult<HttpResponse> {
        let span = info_span!("kodo_request", operation = %operation, url = %request.url);

        let start = Instant::now();
        let result = async {
            debug!("sending {:?} request", request.method);
            self.transport.send(request).await
        }
        .instrument(span)
        .await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(response) => i64::from(response.status),
            Err(e) => e.code(),
        };
        record_request(operation, status, latency_ms);

        if let Err(e) = &result {
            warn!(operation = %operation, "request did not complete: {}", e);
        }

        result
    }

    fn expect_success(response: HttpResponse) -> KodoResult<Vec<u8>> {
        if response.is_success() {
            Ok(response.body)
        } else {
            let err = KodoError::from_response(response.status, &response.body);
            warn!(code = err.code(), "service rejected request: {}", err.message());
            Err(err)
        }
    }
}
