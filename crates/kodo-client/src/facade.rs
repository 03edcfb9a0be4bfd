//! Storage management facade.
//!
//! [`StorageFacade`] exposes one async method per management operation. Each
//! method validates its enumerated arguments before any I/O, issues its
//! remote requests one after another, and answers with an [`Envelope`].
//! Errors never escape as `Err`; they become failed envelopes carrying the
//! service code, or `-1` for local failures.

use std::path::Path;
use std::sync::Arc;

use kodo_models::{
    AccessMode, BatchItem, BucketInfo, CdnResponse, Envelope, FetchResult, ListPage, Listing,
    ObjectCount, ObjectMetadata, ObjectStatus, Region, StorageTier, UploadResult,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::auth::{encoded_entry, urlsafe_base64, Credentials, DEFAULT_UPLOAD_TOKEN_EXPIRY_SECS};
use crate::batch::{self, BatchExecutor, BatchOp};
use crate::cdn::CdnDispatcher;
use crate::client::KodoClient;
use crate::config::KodoConfig;
use crate::error::{KodoError, KodoResult};
use crate::listing::{ListQuery, Lister};
use crate::transport::{HttpTransport, Transport};
use crate::upload::{FormUploader, Uploader};

/// Management facade over one account.
#[derive(Clone)]
pub struct StorageFacade {
    config: Arc<KodoConfig>,
    client: KodoClient,
    batch: BatchExecutor,
    lister: Lister,
    cdn: CdnDispatcher,
    uploader: Arc<dyn Uploader>,
}

impl StorageFacade {
    /// Build a facade with the reqwest-backed transport and form uploader.
    pub fn new(config: KodoConfig) -> KodoResult<Self> {
        config.validate()?;

        let transport = HttpTransport::new(config.timeout, config.connect_timeout)?;
        let uploader = FormUploader::new(transport.client().clone(), config.resolve_hosts().up);

        Ok(Self::with_adapters(
            config,
            Arc::new(transport),
            Arc::new(uploader),
        ))
    }

    /// Build a facade from `KODO_*` environment variables.
    pub fn from_env() -> KodoResult<Self> {
        Self::new(KodoConfig::from_env()?)
    }

    /// Build a facade over caller-provided adapters.
    pub fn with_adapters(
        config: KodoConfig,
        transport: Arc<dyn Transport>,
        uploader: Arc<dyn Uploader>,
    ) -> Self {
        let credentials = Credentials::new(config.access_key.clone(), config.secret_key.clone());
        let client = KodoClient::new(transport, credentials, config.resolve_hosts());

        Self {
            batch: BatchExecutor::new(client.clone(), config.batch_limit),
            lister: Lister::new(client.clone(), config.list_page_size),
            cdn: CdnDispatcher::new(client.clone()),
            config: Arc::new(config),
            client,
            uploader,
        }
    }

    pub fn config(&self) -> &KodoConfig {
        &self.config
    }

    // =========================================================================
    // Buckets
    // =========================================================================

    /// Create a bucket in `region`.
    pub async fn create_bucket<R>(&self, bucket: &str, region: R) -> Envelope<()>
    where
        R: TryInto<Region>,
        KodoError: From<R::Error>,
    {
        let result = match region.try_into() {
            Ok(region) => {
                let url = format!(
                    "{}/mkbucketv2/{}/region/{}",
                    self.client.hosts().rs,
                    urlsafe_base64(bucket),
                    region
                );
                self.client.post_form("create_bucket", url, None).await
            }
            Err(e) => Err(KodoError::from(e)),
        };
        finish("create_bucket", result)
    }

    pub async fn drop_bucket(&self, bucket: &str) -> Envelope<()> {
        let url = format!("{}/drop/{}", self.client.hosts().rs, bucket);
        let result = self.client.post_form("drop_bucket", url, None).await;
        finish("drop_bucket", result)
    }

    /// Make a bucket public or private.
    pub async fn set_bucket_access<A>(&self, bucket: &str, mode: A) -> Envelope<()>
    where
        A: TryInto<AccessMode>,
        KodoError: From<A::Error>,
    {
        let result = match mode.try_into() {
            Ok(mode) => {
                let url = format!("{}/private", self.client.hosts().uc);
                let form = format!("bucket={}&private={}", bucket, mode.flag());
                self.client
                    .post_form("set_bucket_access", url, Some(form))
                    .await
            }
            Err(e) => Err(KodoError::from(e)),
        };
        finish("set_bucket_access", result)
    }

    /// Every bucket of the account with its bound domains.
    pub async fn buckets(&self) -> Envelope<Vec<BucketInfo>> {
        respond("buckets", self.fetch_buckets().await)
    }

    /// Domains bound to `bucket`.
    pub async fn domains(&self, bucket: &str) -> Envelope<Vec<String>> {
        respond("domains", self.fetch_domains(bucket).await)
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// One raw listing page.
    pub async fn list(&self, bucket: &str, query: &ListQuery) -> Envelope<ListPage> {
        respond("list", self.lister.list_page(bucket, query).await)
    }

    /// Every page from `query.marker` on, concatenated.
    pub async fn list_all(&self, bucket: &str, query: ListQuery) -> Envelope<Listing> {
        respond("list_all", self.lister.list_all(bucket, query).await)
    }

    /// Number of objects matching `query` from `query.marker` on.
    pub async fn count(&self, bucket: &str, query: ListQuery) -> Envelope<ObjectCount> {
        let result = self
            .lister
            .count(bucket, query)
            .await
            .map(|amount| ObjectCount { amount });
        respond("count", result)
    }

    // =========================================================================
    // Single Objects
    // =========================================================================

    pub async fn stat(&self, bucket: &str, key: &str) -> Envelope<ObjectMetadata> {
        let op = BatchOp::Stat {
            bucket: bucket.to_string(),
            key: key.to_string(),
        };
        let result = match self.single(&op).await {
            Ok(body) => KodoClient::decode("stat", &body),
            Err(e) => Err(e),
        };
        respond("stat", result)
    }

    /// Move an object. `force` overwrites an existing destination.
    pub async fn move_object(
        &self,
        bucket: &str,
        key: &str,
        dest_bucket: &str,
        dest_key: &str,
        force: bool,
    ) -> Envelope<()> {
        let op = BatchOp::Move {
            bucket: bucket.to_string(),
            key: key.to_string(),
            dest_bucket: dest_bucket.to_string(),
            dest_key: dest_key.to_string(),
            force,
        };
        finish("move", self.single(&op).await)
    }

    /// Copy an object. `force` overwrites an existing destination.
    pub async fn copy_object(
        &self,
        bucket: &str,
        key: &str,
        dest_bucket: &str,
        dest_key: &str,
        force: bool,
    ) -> Envelope<()> {
        let op = BatchOp::Copy {
            bucket: bucket.to_string(),
            key: key.to_string(),
            dest_bucket: dest_bucket.to_string(),
            dest_key: dest_key.to_string(),
            force,
        };
        finish("copy", self.single(&op).await)
    }

    pub async fn change_type<T>(&self, bucket: &str, key: &str, tier: T) -> Envelope<()>
    where
        T: TryInto<StorageTier>,
        KodoError: From<T::Error>,
    {
        let result = match tier.try_into() {
            Ok(tier) => {
                let op = BatchOp::ChangeType {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    tier,
                };
                self.single(&op).await
            }
            Err(e) => Err(KodoError::from(e)),
        };
        finish("change_type", result)
    }

    pub async fn change_status<S>(&self, bucket: &str, key: &str, status: S) -> Envelope<()>
    where
        S: TryInto<ObjectStatus>,
        KodoError: From<S::Error>,
    {
        let result = match status.try_into() {
            Ok(status) => {
                let op = BatchOp::ChangeStatus {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    status,
                };
                self.single(&op).await
            }
            Err(e) => Err(KodoError::from(e)),
        };
        finish("change_status", result)
    }

    pub async fn change_mime(&self, bucket: &str, key: &str, mime: &str) -> Envelope<()> {
        let op = BatchOp::ChangeMime {
            bucket: bucket.to_string(),
            key: key.to_string(),
            mime: mime.to_string(),
        };
        finish("change_mime", self.single(&op).await)
    }

    pub async fn delete(&self, bucket: &str, key: &str) -> Envelope<()> {
        let op = BatchOp::Delete {
            bucket: bucket.to_string(),
            key: key.to_string(),
        };
        finish("delete", self.single(&op).await)
    }

    /// Schedule deletion after `days`; zero cancels a schedule.
    pub async fn delete_after_days(&self, bucket: &str, key: &str, days: u32) -> Envelope<()> {
        let op = BatchOp::DeleteAfterDays {
            bucket: bucket.to_string(),
            key: key.to_string(),
            days,
        };
        finish("delete_after_days", self.single(&op).await)
    }

    /// Have the service download `url` into the bucket. Without a key the
    /// service derives one from the content.
    pub async fn fetch(&self, bucket: &str, url: &str, key: Option<&str>) -> Envelope<FetchResult> {
        let target = format!(
            "{}/fetch/{}/to/{}",
            self.client.hosts().io,
            urlsafe_base64(url),
            encoded_entry(bucket, key)
        );
        let result = match self.client.post_form("fetch", target, None).await {
            Ok(body) => KodoClient::decode("fetch", &body),
            Err(e) => Err(e),
        };
        respond("fetch", result)
    }

    /// Refresh a mirrored object from its origin.
    pub async fn prefetch(&self, bucket: &str, key: &str) -> Envelope<()> {
        let url = format!(
            "{}/prefetch/{}",
            self.client.hosts().io,
            encoded_entry(bucket, Some(key))
        );
        let result = self.client.post_form("prefetch", url, None).await;
        finish("prefetch", result)
    }

    // =========================================================================
    // Batches
    // =========================================================================

    pub async fn batch_stat<I, K>(&self, bucket: &str, keys: I) -> Envelope<Vec<BatchItem>>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.run_batch("batch_stat", batch::build_stat(bucket, keys))
            .await
    }

    /// `pairs` maps source key to destination key.
    pub async fn batch_move<I, K, V>(
        &self,
        bucket: &str,
        pairs: I,
        dest_bucket: &str,
        force: bool,
    ) -> Envelope<Vec<BatchItem>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.run_batch(
            "batch_move",
            batch::build_move(bucket, pairs, dest_bucket, force),
        )
        .await
    }

    /// `pairs` maps source key to destination key.
    pub async fn batch_copy<I, K, V>(
        &self,
        bucket: &str,
        pairs: I,
        dest_bucket: &str,
        force: bool,
    ) -> Envelope<Vec<BatchItem>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.run_batch(
            "batch_copy",
            batch::build_copy(bucket, pairs, dest_bucket, force),
        )
        .await
    }

    pub async fn batch_delete<I, K>(&self, bucket: &str, keys: I) -> Envelope<Vec<BatchItem>>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.run_batch("batch_delete", batch::build_delete(bucket, keys))
            .await
    }

    /// Apply the same tier to every key.
    pub async fn batch_change_type<I, K, T>(
        &self,
        bucket: &str,
        keys: I,
        tier: T,
    ) -> Envelope<Vec<BatchItem>>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
        T: TryInto<StorageTier>,
        KodoError: From<T::Error>,
    {
        let tier: StorageTier = match tier.try_into() {
            Ok(tier) => tier,
            Err(e) => return respond("batch_change_type", Err(KodoError::from(e))),
        };
        let pairs = keys.into_iter().map(|key| (key, tier));
        self.run_batch(
            "batch_change_type",
            batch::build_change_type(bucket, pairs),
        )
        .await
    }

    /// Apply the same status to every key.
    pub async fn batch_change_status<I, K, S>(
        &self,
        bucket: &str,
        keys: I,
        status: S,
    ) -> Envelope<Vec<BatchItem>>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
        S: TryInto<ObjectStatus>,
        KodoError: From<S::Error>,
    {
        let status: ObjectStatus = match status.try_into() {
            Ok(status) => status,
            Err(e) => return respond("batch_change_status", Err(KodoError::from(e))),
        };
        let pairs = keys.into_iter().map(|key| (key, status));
        self.run_batch(
            "batch_change_status",
            batch::build_change_status(bucket, pairs),
        )
        .await
    }

    /// `pairs` maps key to its new MIME type.
    pub async fn batch_change_mime<I, K, V>(&self, bucket: &str, pairs: I) -> Envelope<Vec<BatchItem>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.run_batch("batch_change_mime", batch::build_change_mime(bucket, pairs))
            .await
    }

    /// `pairs` maps key to its day count.
    pub async fn batch_delete_after_days<I, K>(
        &self,
        bucket: &str,
        pairs: I,
    ) -> Envelope<Vec<BatchItem>>
    where
        I: IntoIterator<Item = (K, u32)>,
        K: Into<String>,
    {
        self.run_batch(
            "batch_delete_after_days",
            batch::build_delete_after_days(bucket, pairs),
        )
        .await
    }

    // =========================================================================
    // Upload
    // =========================================================================

    /// Issue an upload token scoped to `bucket` or `bucket:key`.
    ///
    /// In strict mode, policy fields outside the known put-policy set are
    /// dropped. `scope` and `deadline` are always computed here.
    pub fn upload_token(
        &self,
        bucket: &str,
        key: Option<&str>,
        expires_secs: u64,
        policy: Option<&Map<String, Value>>,
        strict: bool,
    ) -> Envelope<String> {
        let result = self
            .client
            .credentials()
            .upload_token(bucket, key, expires_secs, policy, strict);
        respond("upload_token", result)
    }

    /// Issue a default one-hour token and upload `path` with it.
    pub async fn upload(&self, bucket: &str, path: &Path, key: Option<&str>) -> Envelope<UploadResult> {
        let token = match self.client.credentials().upload_token(
            bucket,
            key,
            DEFAULT_UPLOAD_TOKEN_EXPIRY_SECS,
            None,
            true,
        ) {
            Ok(token) => token,
            Err(e) => return respond("upload", Err(e)),
        };
        self.upload_with_token(&token, path, key).await
    }

    /// Upload `path` under a token issued earlier.
    pub async fn upload_with_token(
        &self,
        token: &str,
        path: &Path,
        key: Option<&str>,
    ) -> Envelope<UploadResult> {
        let result = if token.is_empty() {
            Err(KodoError::invalid_argument("upload token must not be empty"))
        } else {
            self.uploader.put_file(token, key, path).await
        };
        respond("upload", result)
    }

    // =========================================================================
    // CDN
    // =========================================================================

    /// Refresh cached URLs and/or directories. At least one list must be non-empty.
    pub async fn refresh(&self, urls: &[String], dirs: &[String]) -> Envelope<CdnResponse> {
        respond("cdn_refresh", self.cdn.refresh(urls, dirs).await)
    }

    /// Warm the CDN cache for `urls`.
    pub async fn prefetch_urls(&self, urls: &[String]) -> Envelope<CdnResponse> {
        respond("cdn_prefetch", self.cdn.prefetch(urls).await)
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    async fn single(&self, op: &BatchOp) -> KodoResult<Vec<u8>> {
        let url = format!("{}{}", self.client.hosts().rs, op.path());
        self.client.post_form(op.name(), url, None).await
    }

    async fn run_batch(&self, operation: &str, ops: Vec<BatchOp>) -> Envelope<Vec<BatchItem>> {
        debug!(operation = %operation, ops = ops.len(), "running batch");
        respond(operation, self.batch.execute(&ops).await)
    }

    async fn fetch_domains(&self, bucket: &str) -> KodoResult<Vec<String>> {
        let url = format!(
            "{}/v6/domain/list?tbl={}",
            self.client.hosts().api,
            urlencoding::encode(bucket)
        );
        let body = self.client.get("domains", url).await?;
        KodoClient::decode("domains", &body)
    }

    async fn fetch_buckets(&self) -> KodoResult<Vec<BucketInfo>> {
        let url = format!("{}/buckets?shared=true", self.client.hosts().rs);
        let body = self.client.get("buckets", url).await?;
        let names: Vec<String> = KodoClient::decode("buckets", &body)?;

        let mut buckets = Vec::with_capacity(names.len());
        for name in names {
            let domains = self.fetch_domains(&name).await?;
            buckets.push(BucketInfo { name, domains });
        }
        Ok(buckets)
    }
}

/// Wrap an operation result in an envelope and log the outcome.
fn respond<T>(operation: &str, result: KodoResult<T>) -> Envelope<T> {
    match result {
        Ok(data) => {
            debug!(operation = %operation, "operation succeeded");
            Envelope::success(data)
        }
        Err(e) => {
            warn!(operation = %operation, code = e.code(), "operation failed: {}", e.message());
            Envelope::failure(e.code(), e.message())
        }
    }
}

/// Like [`respond`], for operations without a payload.
fn finish<T>(operation: &str, result: KodoResult<T>) -> Envelope<()> {
    match result {
        Ok(_) => {
            debug!(operation = %operation, "operation succeeded");
            Envelope::done()
        }
        Err(e) => respond(operation, Err(e)),
    }
}
