//! Storage backend abstraction layer
//!
//! Defines the minimal capability set the upload core consumes: multipart
//! session calls (initiate, upload part, complete, abort) plus the simple
//! object operations (put, get, delete, list). Implementations delegate to
//! a concrete backend SDK; the multipart state machine never talks to a
//! backend directly.

mod aws;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::Config;
use crate::errors::{StorageError, UploadError};

pub use aws::AwsClient;

/// Server-side handle for an open multipart session.
///
/// Owned exclusively by one `MultipartSession` for its lifetime; the store
/// tracks all part state under `upload_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    /// Store-assigned upload identifier
    pub upload_id: String,
    /// Object key the session will finalize into
    pub key: String,
}

/// Opaque per-part identifier returned by the store (e.g. an ETag),
/// required for finalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartTag(pub String);

impl std::fmt::Display for PartTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One finalized part, as submitted to `complete_multipart`.
///
/// The store requires these in strictly ascending, gap-free part order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPartRecord {
    /// 1-based part number
    pub part_number: i32,
    /// Store-assigned tag from the successful upload
    pub tag: PartTag,
}

/// Metadata for a stored object, as returned by listing
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    /// Object key
    pub key: String,
    /// Object size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub last_modified: Option<DateTime<Utc>>,
    /// ETag (backend-specific)
    pub etag: Option<String>,
}

/// Storage client trait for object store operations
///
/// All store calls flow through this trait. Each call is expected to carry
/// its own network-level timeout inside the implementation; none of the
/// methods block indefinitely.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Open a multipart session for `key` with an expiry hint
    async fn initiate_multipart(
        &self,
        key: &str,
        expiry: DateTime<Utc>,
    ) -> Result<SessionHandle, StorageError>;

    /// Upload one part; `part_number` is 1-based
    async fn upload_part(
        &self,
        handle: &SessionHandle,
        part_number: i32,
        data: Bytes,
    ) -> Result<PartTag, StorageError>;

    /// Finalize the session from completed parts in ascending part order
    async fn complete_multipart(
        &self,
        handle: &SessionHandle,
        parts: &[CompletedPartRecord],
    ) -> Result<(), StorageError>;

    /// Release all server-side resources of an incomplete session
    async fn abort_multipart(&self, handle: &SessionHandle) -> Result<(), StorageError>;

    /// Put a small object directly, bypassing multipart
    async fn put_object(&self, key: &str, data: Bytes) -> Result<(), StorageError>;

    /// Get an object by key
    async fn get_object(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Delete an object by key
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;

    /// List objects with the given prefix
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StorageError>;
}

/// Create a storage client from configuration
///
/// Credentials come from the config when static keys are set, otherwise
/// from the default AWS credential provider chain.
pub async fn create_client(config: &Config) -> Result<Arc<dyn StorageClient>, UploadError> {
    let client = AwsClient::new(&config.storage).await?;
    Ok(Arc::new(client))
}
