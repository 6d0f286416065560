//! Public upload facade
//!
//! `ObjectUploader` is the surface callers use: it picks the direct-put
//! fast path for small payloads and drives a `MultipartSession` for
//! everything larger than one part.

use bytes::Bytes;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::Config;
use crate::errors::Result;
use crate::metrics;
use crate::multipart::MultipartSession;
use crate::storage::{ObjectSummary, StorageClient};

/// Object store client with multipart-aware uploads
pub struct ObjectUploader {
    client: Arc<dyn StorageClient>,
    config: Config,
}

impl ObjectUploader {
    /// Create an uploader over an already-constructed storage client
    pub fn new(client: Arc<dyn StorageClient>, config: Config) -> Self {
        Self { client, config }
    }

    /// Upload an object, choosing the transfer strategy by size.
    ///
    /// Payloads larger than one part (`upload.part_size_bytes`) go through
    /// a multipart session; everything else, including empty payloads, is
    /// a single direct put.
    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn upload_object(&self, key: &str, data: Bytes) -> Result<()> {
        if data.len() > self.config.upload.part_size_bytes {
            let mut session = MultipartSession::new(self.client.clone(), &self.config.upload, key);
            session.run(data).await
        } else {
            let size = data.len() as u64;
            self.client.put_object(key, data).await?;
            metrics::UPLOADED_BYTES.inc_by(size);
            info!(key, size, "object uploaded via direct put");
            Ok(())
        }
    }

    /// Get an object by key
    #[instrument(skip(self))]
    pub async fn get_object(&self, key: &str) -> Result<Bytes> {
        Ok(self.client.get_object(key).await?)
    }

    /// Delete an object by key
    #[instrument(skip(self))]
    pub async fn delete_object(&self, key: &str) -> Result<()> {
        Ok(self.client.delete_object(key).await?)
    }

    /// List objects under a key prefix
    #[instrument(skip(self))]
    pub async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectSummary>> {
        Ok(self.client.list_objects(prefix).await?)
    }

    /// Public URL for an object, when a public base URL is configured.
    ///
    /// Falls back to the bucket's virtual-hosted S3 URL otherwise.
    pub fn object_url(&self, key: &str) -> String {
        match &self.config.storage.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.config.storage.bucket, self.config.storage.region, key
            ),
        }
    }
}
