//! Shared data models for the Kodo management facade.
//!
//! This crate provides Serde-serializable types for:
//! - The uniform result envelope returned by every facade call
//! - Regions, bucket access modes, storage tiers and object status
//! - Object metadata, listing pages and pagination markers
//! - Batch item results and CDN job responses

pub mod batch;
pub mod bucket;
pub mod cdn;
pub mod choice;
pub mod envelope;
pub mod object;
pub mod region;

// Re-export common types
pub use batch::BatchItem;
pub use bucket::{AccessMode, BucketInfo};
pub use cdn::CdnResponse;
pub use choice::InvalidChoice;
pub use envelope::{Envelope, SUCCESS_MESSAGE};
pub use object::{
    FetchResult, Listing, ListPage, Marker, ObjectCount, ObjectMetadata, ObjectStatus, PutResult,
    StorageTier, UploadResult,
};
pub use region::Region;
