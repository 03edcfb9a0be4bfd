//! Client configuration and service host resolution.

use std::fmt;
use std::time::Duration;

use kodo_models::Region;

use crate::error::{KodoError, KodoResult};

/// Management host (bucket and object operations).
pub const DEFAULT_RS_HOST: &str = "rs.qiniu.com";
/// Listing host.
pub const DEFAULT_RSF_HOST: &str = "rsf.qiniu.com";
/// Bucket settings host.
pub const DEFAULT_UC_HOST: &str = "uc.qbox.me";
/// Domain query host.
pub const DEFAULT_API_HOST: &str = "api.qiniu.com";
/// CDN job host.
pub const DEFAULT_FUSION_HOST: &str = "fusion.qiniuapi.com";

/// Default per-request operation ceiling of the batch endpoint.
///
/// This is a service policy; override it with `KODO_BATCH_LIMIT` when the
/// service documents a different cap.
pub const DEFAULT_BATCH_LIMIT: usize = 1000;

/// Default (and maximum accepted by the service) listing page size.
pub const DEFAULT_LIST_PAGE_SIZE: u32 = 1000;

// =============================================================================
// Configuration
// =============================================================================

/// Explicit host overrides. A value may be a bare host (`rs.example.com`)
/// or a full base URL (`http://127.0.0.1:9000`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostOverrides {
    pub rs: Option<String>,
    pub rsf: Option<String>,
    pub uc: Option<String>,
    pub api: Option<String>,
    pub io: Option<String>,
    pub up: Option<String>,
    pub fusion: Option<String>,
}

impl HostOverrides {
    /// Point every service at one base URL (used against a local mock server).
    pub fn all(base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        Self {
            rs: Some(base.clone()),
            rsf: Some(base.clone()),
            uc: Some(base.clone()),
            api: Some(base.clone()),
            io: Some(base.clone()),
            up: Some(base.clone()),
            fusion: Some(base),
        }
    }
}

/// Kodo client configuration.
#[derive(Clone)]
pub struct KodoConfig {
    /// Access key
    pub access_key: String,
    /// Secret key
    pub secret_key: String,
    /// Use https for every host
    pub use_https: bool,
    /// Region used for upload and io hosts
    pub region: Region,
    /// Host overrides
    pub hosts: HostOverrides,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Maximum operations per batch request
    pub batch_limit: usize,
    /// Items requested per listing page
    pub list_page_size: u32,
}

impl fmt::Debug for KodoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KodoConfig")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("use_https", &self.use_https)
            .field("region", &self.region)
            .field("hosts", &self.hosts)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("batch_limit", &self.batch_limit)
            .field("list_page_size", &self.list_page_size)
            .finish()
    }
}

impl KodoConfig {
    /// Create a config with default hosts and limits.
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            use_https: true,
            region: Region::default(),
            hosts: HostOverrides::default(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            batch_limit: DEFAULT_BATCH_LIMIT,
            list_page_size: DEFAULT_LIST_PAGE_SIZE,
        }
    }

    pub fn with_https(mut self, use_https: bool) -> Self {
        self.use_https = use_https;
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn with_hosts(mut self, hosts: HostOverrides) -> Self {
        self.hosts = hosts;
        self
    }

    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = limit;
        self
    }

    pub fn with_list_page_size(mut self, size: u32) -> Self {
        self.list_page_size = size;
        self
    }

    /// Create config from environment variables.
    pub fn from_env() -> KodoResult<Self> {
        let access_key = std::env::var("KODO_ACCESS_KEY")
            .map_err(|_| KodoError::config("KODO_ACCESS_KEY must be set"))?;
        let secret_key = std::env::var("KODO_SECRET_KEY")
            .map_err(|_| KodoError::config("KODO_SECRET_KEY must be set"))?;

        let region = match std::env::var("KODO_REGION") {
            Ok(raw) if !raw.is_empty() => raw.parse::<Region>()?,
            _ => Region::default(),
        };

        let use_https = std::env::var("KODO_USE_HTTPS")
            .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0" | "no"))
            .unwrap_or(true);

        let timeout_secs: u64 = env_number("KODO_TIMEOUT_SECS").unwrap_or(30);
        let connect_timeout_secs: u64 = env_number("KODO_CONNECT_TIMEOUT_SECS").unwrap_or(5);

        let config = Self {
            access_key,
            secret_key,
            use_https,
            region,
            hosts: HostOverrides {
                rs: env_host("KODO_RS_HOST"),
                rsf: env_host("KODO_RSF_HOST"),
                uc: env_host("KODO_UC_HOST"),
                api: env_host("KODO_API_HOST"),
                io: env_host("KODO_IO_HOST"),
                up: env_host("KODO_UP_HOST"),
                fusion: env_host("KODO_FUSION_HOST"),
            },
            timeout: Duration::from_secs(timeout_secs),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            batch_limit: env_number("KODO_BATCH_LIMIT").unwrap_or(DEFAULT_BATCH_LIMIT),
            list_page_size: env_number("KODO_LIST_PAGE_SIZE").unwrap_or(DEFAULT_LIST_PAGE_SIZE),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no request could succeed with.
    pub fn validate(&self) -> KodoResult<()> {
        if self.access_key.is_empty() || self.secret_key.is_empty() {
            return Err(KodoError::config("access key and secret key cannot be empty"));
        }
        if self.batch_limit == 0 {
            return Err(KodoError::config("batch limit must be at least 1"));
        }
        if self.list_page_size == 0 {
            return Err(KodoError::config("list page size must be at least 1"));
        }
        Ok(())
    }

    /// Resolve base URLs for every service.
    pub fn resolve_hosts(&self) -> Hosts {
        let scheme = if self.use_https { "https" } else { "http" };
        let pick = |over: &Option<String>, default: &str| -> String {
            match over {
                Some(host) if host.contains("://") => host.trim_end_matches('/').to_string(),
                Some(host) => format!("{}://{}", scheme, host.trim_end_matches('/')),
                None => format!("{}://{}", scheme, default),
            }
        };

        Hosts {
            rs: pick(&self.hosts.rs, DEFAULT_RS_HOST),
            rsf: pick(&self.hosts.rsf, DEFAULT_RSF_HOST),
            uc: pick(&self.hosts.uc, DEFAULT_UC_HOST),
            api: pick(&self.hosts.api, DEFAULT_API_HOST),
            io: pick(&self.hosts.io, io_host(self.region)),
            up: pick(&self.hosts.up, up_host(self.region)),
            fusion: pick(&self.hosts.fusion, DEFAULT_FUSION_HOST),
        }
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn env_host(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

// =============================================================================
// Hosts
// =============================================================================

/// Resolved base URLs (scheme + host, no trailing slash).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hosts {
    pub rs: String,
    pub rsf: String,
    pub uc: String,
    pub api: String,
    pub io: String,
    pub up: String,
    pub fusion: String,
}

/// Source-fetch host of a region.
pub fn io_host(region: Region) -> &'static str {
    match region {
        Region::Z0 => "iovip.qbox.me",
        Region::Z1 => "iovip-z1.qbox.me",
        Region::Z2 => "iovip-z2.qbox.me",
        Region::Na0 => "iovip-na0.qbox.me",
        Region::As0 => "iovip-as0.qbox.me",
        Region::CnEast2 => "iovip-cn-east-2.qiniuio.com",
    }
}

/// Upload host of a region.
pub fn up_host(region: Region) -> &'static str {
    match region {
        Region::Z0 => "up.qiniup.com",
        Region::Z1 => "up-z1.qiniup.com",
        Region::Z2 => "up-z2.qiniup.com",
        Region::Na0 => "up-na0.qiniup.com",
        Region::As0 => "up-as0.qiniup.com",
        Region::CnEast2 => "up-cn-east-2.qiniup.com",
    }
}

// =============================================================================
// Tests
// =============================================================================
