//! Kodo object storage management client.
//!
//! This crate provides:
//! - QBox request signing and upload-token issuance
//! - A pluggable HTTP transport (reqwest by default)
//! - Chunked batch submission and marker-following listings
//! - CDN refresh / prefetch dispatch
//! - [`StorageFacade`], which answers every operation with an
//!   [`Envelope`](kodo_models::Envelope)

pub mod auth;
pub mod batch;
pub mod cdn;
pub mod client;
pub mod config;
pub mod error;
pub mod facade;
pub mod listing;
pub mod metrics;
pub mod transport;
pub mod upload;

#[cfg(test)]
mod testing;

pub use auth::Credentials;
pub use batch::{BatchExecutor, BatchOp};
pub use cdn::{CdnDispatcher, RefreshTarget};
pub use client::KodoClient;
pub use config::{HostOverrides, Hosts, KodoConfig};
pub use error::{KodoError, KodoResult};
pub use facade::StorageFacade;
pub use listing::{ListQuery, Lister};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, Transport};
pub use upload::{FormUploader, Uploader};
