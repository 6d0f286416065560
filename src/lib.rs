//! s3upload - Multipart object uploads for S3-compatible stores
//!
//! Splits large byte payloads into bounded-size parts, uploads each part
//! with a fixed retry budget, and either finalizes the whole object
//! atomically or aborts the server-side session on irrecoverable failure.
//! Small payloads bypass multipart with a direct put.
//!
//! # Usage
//! ```no_run
//! use bytes::Bytes;
//! use s3upload::{Config, ObjectUploader};
//!
//! #[tokio::main]
//! async fn main() -> s3upload::Result<()> {
//!     let config = Config::from_env()?;
//!     let client = s3upload::storage::create_client(&config).await?;
//!     let uploader = ObjectUploader::new(client, config);
//!
//!     uploader
//!         .upload_object("images/banner.png", Bytes::from_static(b"..."))
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod metrics;
pub mod multipart;
pub mod storage;
pub mod uploader;

pub use config::{Config, StorageConfig, UploadConfig};
pub use errors::{Result, StorageError, UploadError};
pub use multipart::{MultipartSession, PartResult, PartStatus, PartUploader, SessionState};
pub use storage::{
    create_client, CompletedPartRecord, ObjectSummary, PartTag, SessionHandle, StorageClient,
};
pub use uploader::ObjectUploader;
