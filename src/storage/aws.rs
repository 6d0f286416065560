//! AWS S3 storage client implementation
//!
//! Uses aws-sdk-s3 with support for:
//! - Static credentials (access key ID and secret access key)
//! - Default AWS credential chain (environment, instance metadata, IRSA)
//! - Custom endpoints and path-style addressing for S3-compatible services
//!   like MinIO

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, ObjectCannedAcl};
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::config::StorageConfig;
use crate::errors::{StorageError, UploadError};
use crate::storage::{CompletedPartRecord, ObjectSummary, PartTag, SessionHandle, StorageClient};

/// AWS S3 storage client
pub struct AwsClient {
    client: Client,
    bucket: String,
    acl: ObjectCannedAcl,
}

impl AwsClient {
    /// Create a new AWS S3 client from storage configuration
    ///
    /// When `access_key_id`/`secret_access_key` are set they are used as
    /// static credentials; otherwise the default provider chain applies.
    pub async fn new(config: &StorageConfig) -> Result<Self, UploadError> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id.clone(),
                secret_access_key.clone(),
                None,
                None,
                "s3upload-static",
            ));
        }

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            acl: ObjectCannedAcl::from(config.acl.as_str()),
        })
    }

    fn storage_err(operation: &'static str, e: impl std::error::Error) -> StorageError {
        StorageError::new(operation, DisplayErrorContext(e))
    }
}

#[async_trait]
impl StorageClient for AwsClient {
    async fn initiate_multipart(
        &self,
        key: &str,
        expiry: DateTime<Utc>,
    ) -> Result<SessionHandle, StorageError> {
        let resp = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .acl(self.acl.clone())
            .expires(aws_sdk_s3::primitives::DateTime::from_secs(
                expiry.timestamp(),
            ))
            .send()
            .await
            .map_err(|e| Self::storage_err("CreateMultipartUpload", e))?;

        let upload_id = resp
            .upload_id()
            .ok_or_else(|| StorageError::new("CreateMultipartUpload", "missing upload ID"))?;

        Ok(SessionHandle {
            upload_id: upload_id.to_string(),
            key: key.to_string(),
        })
    }

    async fn upload_part(
        &self,
        handle: &SessionHandle,
        part_number: i32,
        data: Bytes,
    ) -> Result<PartTag, StorageError> {
        let content_length = data.len() as i64;
        let resp = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(&handle.key)
            .upload_id(&handle.upload_id)
            .part_number(part_number)
            .content_length(content_length)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| Self::storage_err("UploadPart", e))?;

        let etag = resp
            .e_tag()
            .ok_or_else(|| StorageError::new("UploadPart", "missing part ETag"))?;

        Ok(PartTag(etag.to_string()))
    }

    async fn complete_multipart(
        &self,
        handle: &SessionHandle,
        parts: &[CompletedPartRecord],
    ) -> Result<(), StorageError> {
        let completed_parts: Vec<CompletedPart> = parts
            .iter()
            .map(|p| {
                CompletedPart::builder()
                    .part_number(p.part_number)
                    .e_tag(p.tag.0.clone())
                    .build()
            })
            .collect();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(&handle.key)
            .upload_id(&handle.upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed_parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| Self::storage_err("CompleteMultipartUpload", e))?;

        Ok(())
    }

    async fn abort_multipart(&self, handle: &SessionHandle) -> Result<(), StorageError> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(&handle.key)
            .upload_id(&handle.upload_id)
            .send()
            .await
            .map_err(|e| Self::storage_err("AbortMultipartUpload", e))?;

        Ok(())
    }

    async fn put_object(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .acl(self.acl.clone())
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| Self::storage_err("PutObject", e))?;

        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, StorageError> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::storage_err("GetObject", e))?;

        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| StorageError::new("GetObject", e))?;

        Ok(body.into_bytes())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::storage_err("DeleteObject", e))?;

        Ok(())
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StorageError> {
        let mut summaries = vec![];
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| Self::storage_err("ListObjectsV2", e))?;
            for obj in page.contents() {
                let key = obj
                    .key()
                    .ok_or_else(|| StorageError::new("ListObjectsV2", "object without key"))?;
                summaries.push(ObjectSummary {
                    key: key.to_string(),
                    size: obj.size().unwrap_or(0) as u64,
                    last_modified: obj
                        .last_modified()
                        .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
                    etag: obj.e_tag().map(str::to_string),
                });
            }
        }

        Ok(summaries)
    }
}
