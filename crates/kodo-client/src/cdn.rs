//! CDN cache refresh and prefetch.
//!
//! The provider reports its own `code` inside the JSON body, independent of
//! the HTTP status; only `code == 200` counts as accepted.

use kodo_models::CdnResponse;
use serde::Serialize;
use tracing::info;

use crate::client::KodoClient;
use crate::error::{KodoError, KodoResult};

/// Which lists a refresh job submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTarget {
    UrlsAndDirs,
    UrlsOnly,
    DirsOnly,
}

impl RefreshTarget {
    /// Pick the job shape from the non-empty inputs.
    pub fn select(urls: &[String], dirs: &[String]) -> KodoResult<Self> {
        match (urls.is_empty(), dirs.is_empty()) {
            (false, false) => Ok(Self::UrlsAndDirs),
            (false, true) => Ok(Self::UrlsOnly),
            (true, false) => Ok(Self::DirsOnly),
            (true, true) => Err(KodoError::invalid_argument(
                "refresh needs at least one url or directory",
            )),
        }
    }
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    urls: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dirs: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
struct PrefetchRequest<'a> {
    urls: &'a [String],
}

/// Submits refresh and prefetch jobs to the fusion endpoint.
#[derive(Clone)]
pub struct CdnDispatcher {
    client: KodoClient,
}

impl CdnDispatcher {
    pub fn new(client: KodoClient) -> Self {
        Self { client }
    }

    /// Invalidate cached copies of `urls` and everything under `dirs`.
    pub async fn refresh(&self, urls: &[String], dirs: &[String]) -> KodoResult<CdnResponse> {
        let request = match RefreshTarget::select(urls, dirs)? {
            RefreshTarget::UrlsAndDirs => RefreshRequest {
                urls: Some(urls),
                dirs: Some(dirs),
            },
            RefreshTarget::UrlsOnly => RefreshRequest {
                urls: Some(urls),
                dirs: None,
            },
            RefreshTarget::DirsOnly => RefreshRequest {
                urls: None,
                dirs: Some(dirs),
            },
        };

        self.submit("cdn_refresh", "/v2/tune/refresh", &request)
            .await
    }

    /// Warm the CDN cache for `urls`.
    pub async fn prefetch(&self, urls: &[String]) -> KodoResult<CdnResponse> {
        self.submit("cdn_prefetch", "/v2/tune/prefetch", &PrefetchRequest { urls })
            .await
    }

    async fn submit<B: Serialize>(
        &self,
        operation: &str,
        path: &str,
        body: &B,
    ) -> KodoResult<CdnResponse> {
        let url = format!("{}{}", self.client.hosts().fusion, path);
        let response = self.client.post_json(operation, url, body).await?;

        match KodoClient::decode::<CdnResponse>(operation, &response.body) {
            Ok(job) if job.is_success() => {
                info!(
                    operation = %operation,
                    request_id = job.request_id.as_deref().unwrap_or(""),
                    "CDN job accepted"
                );
                Ok(job)
            }
            Ok(job) => Err(KodoError::Service {
                code: job.code,
                message: job.error,
            }),
            Err(_) if !response.is_success() => {
                Err(KodoError::from_response(response.status, &response.body))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_client, ScriptedTransport};
    use serde_json::{json, Value};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn accepted() -> Value {
        json!({"code": 200, "error": "success", "requestId": "job-1"})
    }

    #[test]
    fn test_select_target() {
        let some = strings(&["https://cdn.example.com/a.png"]);
        let none: Vec<String> = vec![];
        assert_eq!(RefreshTarget::select(&some, &some).unwrap(), RefreshTarget::UrlsAndDirs);
        assert_eq!(RefreshTarget::select(&some, &none).unwrap(), RefreshTarget::UrlsOnly);
        assert_eq!(RefreshTarget::select(&none, &some).unwrap(), RefreshTarget::DirsOnly);
        assert!(RefreshTarget::select(&none, &none).unwrap_err().is_local());
    }

    #[tokio::test]
    async fn test_refresh_urls_only_body() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, accepted());

        let cdn = CdnDispatcher::new(test_client(transport.clone()));
        let job = cdn
            .refresh(&strings(&["https://cdn.example.com/a.png"]), &[])
            .await
            .unwrap();
        assert_eq!(job.request_id.as_deref(), Some("job-1"));

        let request = &transport.requests()[0];
        assert_eq!(request.url, "https://fusion.qiniuapi.com/v2/tune/refresh");
        let body: Value = serde_json::from_slice(request.body.as_ref().unwrap()).unwrap();
        assert_eq!(body, json!({"urls": ["https://cdn.example.com/a.png"]}));
    }

    #[tokio::test]
    async fn test_refresh_dirs_only_body() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, accepted());

        let cdn = CdnDispatcher::new(test_client(transport.clone()));
        cdn.refresh(&[], &strings(&["https://cdn.example.com/img/"]))
            .await
            .unwrap();

        let request = &transport.requests()[0];
        let body: Value = serde_json::from_slice(request.body.as_ref().unwrap()).unwrap();
        assert_eq!(body, json!({"dirs": ["https://cdn.example.com/img/"]}));
    }

    #[tokio::test]
    async fn test_refresh_empty_makes_no_call() {
        let transport = ScriptedTransport::new();
        let cdn = CdnDispatcher::new(test_client(transport.clone()));
        let err = cdn.refresh(&[], &[]).await.unwrap_err();
        assert_eq!(err.code(), -1);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_code_is_surfaced() {
        let transport = ScriptedTransport::new();
        transport.push_json(
            400,
            json!({"code": 400031, "error": "invalid url", "invalidUrls": ["ftp://x"]}),
        );

        let cdn = CdnDispatcher::new(test_client(transport));
        let err = cdn.prefetch(&strings(&["ftp://x"])).await.unwrap_err();
        assert_eq!(err.code(), 400031);
        assert_eq!(err.message(), "invalid url");
    }

    #[tokio::test]
    async fn test_unparseable_error_body_uses_http_status() {
        let transport = ScriptedTransport::new();
        transport.push_empty(502);

        let cdn = CdnDispatcher::new(test_client(transport));
        let err = cdn.prefetch(&strings(&["https://a"])).await.unwrap_err();
        assert_eq!(err.code(), 502);
    }

    #[tokio::test]
    async fn test_prefetch_body() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, json!({"code": 200, "error": "success", "quotaDay": 100, "surplusDay": 99}));

        let cdn = CdnDispatcher::new(test_client(transport.clone()));
        let job = cdn.prefetch(&strings(&["https://a", "https://b"])).await.unwrap();
        assert_eq!(job.surplus_day, Some(99));

        let request = &transport.requests()[0];
        assert_eq!(request.url, "https://fusion.qiniuapi.com/v2/tune/prefetch");
        assert_eq!(request.header("content-type"), Some("application/json"));
    }
}
