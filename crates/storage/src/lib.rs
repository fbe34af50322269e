//! Storage abstractions for the preprocessing stages.
//!
//! Provides:
//! - Object storage (S3/MinIO, GCS, local, memory) behind the [`BlobStore`] trait
//! - Scoped local scratch directories

pub mod object_store;
pub mod scratch;

pub use self::object_store::{BlobStore, ObjectStorage, ObjectStorageConfig};
pub use scratch::ScratchDir;
