//! Scripted collaborators for unit tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kodo_models::{PutResult, UploadResult};
use serde_json::Value;

use crate::auth::Credentials;
use crate::client::KodoClient;
use crate::config::KodoConfig;
use crate::error::{KodoError, KodoResult};
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::upload::Uploader;

/// Transport that replays queued responses and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<KodoResult<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.push(Ok(HttpResponse {
            status,
            body: serde_json::to_vec(&body).unwrap(),
        }));
    }

    pub fn push_empty(&self, status: u16) {
        self.push(Ok(HttpResponse { status, body: Vec::new() }));
    }

    /// Queue a transport-level failure (no HTTP exchange).
    pub fn push_disconnect(&self) {
        self.push(Err(KodoError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        ))));
    }

    fn push(&self, response: KodoResult<HttpResponse>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> KodoResult<HttpResponse> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(KodoError::invalid_response("no scripted response left")))
    }
}

/// Uploader that records calls and answers with a fixed result.
#[derive(Default)]
pub struct ScriptedUploader {
    calls: Mutex<Vec<(String, Option<String>, PathBuf)>>,
}

impl ScriptedUploader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<(String, Option<String>, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Uploader for ScriptedUploader {
    async fn put_file(&self, token: &str, key: Option<&str>, path: &Path) -> KodoResult<UploadResult> {
        self.calls.lock().unwrap().push((
            token.to_string(),
            key.map(str::to_string),
            path.to_path_buf(),
        ));
        Ok(UploadResult::Stored(PutResult {
            key: key.unwrap_or("Fh-generated").to_string(),
            hash: "FhHash".to_string(),
            fsize: Some(3),
        }))
    }
}

pub fn test_config() -> KodoConfig {
    KodoConfig::new("ak", "sk")
}

pub fn test_client(transport: Arc<ScriptedTransport>) -> KodoClient {
    KodoClient::new(
        transport,
        Credentials::new("ak", "sk"),
        test_config().resolve_hosts(),
    )
}
