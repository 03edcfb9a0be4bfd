//! Upload transfer seam.
//!
//! The facade issues the token; an [`Uploader`] moves the bytes. The default
//! [`FormUploader`] performs a single multipart form upload to the region's
//! up host.

use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use kodo_models::UploadResult;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, info_span, Instrument};

use crate::error::{KodoError, KodoResult};
use crate::metrics::record_request;

/// Transfers a local file under an upload token.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload `path`. Without a key, the service derives one from the content.
    ///
    /// Any 2xx answer is a success, whatever its body.
    async fn put_file(&self, token: &str, key: Option<&str>, path: &Path) -> KodoResult<UploadResult>;
}

/// Multipart form uploader.
#[derive(Clone)]
pub struct FormUploader {
    http: Client,
    up_host: String,
}

impl FormUploader {
    pub fn new(http: Client, up_host: impl Into<String>) -> Self {
        Self {
            http,
            up_host: up_host.into(),
        }
    }

    async fn send_form(&self, form: Form) -> KodoResult<UploadResult> {
        let response = self.http.post(&self.up_host).multipart(form).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        if !(200..300).contains(&status) {
            return Err(KodoError::from_response(status, &body));
        }
        Ok(UploadResult::from_body(&body))
    }
}

#[async_trait]
impl Uploader for FormUploader {
    async fn put_file(&self, token: &str, key: Option<&str>, path: &Path) -> KodoResult<UploadResult> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            KodoError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to read '{}': {}", path.display(), e),
            ))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());

        let mut form = Form::new().text("token", token.to_string());
        if let Some(key) = key {
            form = form.text("key", key.to_string());
        }
        form = form.part("file", Part::bytes(data).file_name(file_name));

        let span = info_span!("kodo_upload", host = %self.up_host, key = key.unwrap_or(""));
        let start = Instant::now();
        let result = async {
            debug!(path = %path.display(), "uploading file");
            self.send_form(form).await
        }
        .instrument(span)
        .await;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.code(),
        };
        record_request("upload", status, start.elapsed().as_millis() as f64);

        result
    }
}
