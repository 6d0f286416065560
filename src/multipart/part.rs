//! Single-part upload with bounded retry
//!
//! `PartUploader` masks transient store failures behind a fixed retry
//! budget. Retries are entirely local to this module; the session only ever
//! sees a final `PartResult` or an exhausted `PartUploadFailed`.

use bytes::Bytes;
use std::sync::Arc;
use tracing::warn;

use crate::errors::{StorageError, UploadError};
use crate::metrics;
use crate::storage::{PartTag, SessionHandle, StorageClient};

/// Upload status of one part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartStatus {
    /// Planned but not yet attempted
    Pending,
    /// Store accepted the part and returned a tag
    Uploaded,
    /// Retry budget exhausted
    Failed,
}

/// Bookkeeping record for one part of a session
#[derive(Debug, Clone)]
pub struct PartResult {
    /// 1-based part number, contiguous within the session
    pub part_number: i32,
    /// Store-assigned tag; present only once Uploaded
    pub tag: Option<PartTag>,
    /// Current status
    pub status: PartStatus,
}

impl PartResult {
    /// A planned part that has not been attempted yet
    pub fn pending(part_number: i32) -> Self {
        Self {
            part_number,
            tag: None,
            status: PartStatus::Pending,
        }
    }

    fn uploaded(part_number: i32, tag: PartTag) -> Self {
        Self {
            part_number,
            tag: Some(tag),
            status: PartStatus::Uploaded,
        }
    }
}

/// Uploads exactly one contiguous byte range as part N of an open session,
/// retrying transient failures up to a fixed budget.
pub struct PartUploader {
    client: Arc<dyn StorageClient>,
    retry_budget: u32,
}

impl PartUploader {
    /// Create an uploader allowing `retry_budget` retries after the first
    /// failed attempt (so `retry_budget + 1` total attempts per part)
    pub fn new(client: Arc<dyn StorageClient>, retry_budget: u32) -> Self {
        Self {
            client,
            retry_budget,
        }
    }

    /// Upload one part, resending the full `data` on every attempt.
    ///
    /// No backoff between attempts. Success is the only path that marks a
    /// part Uploaded. On exhaustion the caller owns server-side cleanup;
    /// this method touches nothing beyond its own part.
    pub async fn upload_with_retry(
        &self,
        handle: &SessionHandle,
        part_number: i32,
        data: Bytes,
    ) -> Result<PartResult, UploadError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let timer = metrics::PART_UPLOAD_DURATION.start_timer();
            let result = self
                .client
                .upload_part(handle, part_number, data.clone())
                .await;
            timer.observe_duration();

            match result {
                Ok(tag) => {
                    metrics::PART_ATTEMPTS.with_label_values(&["ok"]).inc();
                    metrics::UPLOADED_BYTES.inc_by(data.len() as u64);
                    return Ok(PartResult::uploaded(part_number, tag));
                }
                Err(e) if attempt <= self.retry_budget => {
                    metrics::PART_ATTEMPTS.with_label_values(&["error"]).inc();
                    metrics::PART_RETRIES.inc();
                    warn!(
                        part_number,
                        attempt,
                        error = %e,
                        "part upload failed, retrying"
                    );
                }
                Err(e) => {
                    metrics::PART_ATTEMPTS.with_label_values(&["error"]).inc();
                    return Err(Self::exhausted(part_number, attempt, e));
                }
            }
        }
    }

    fn exhausted(part_number: i32, attempts: u32, source: StorageError) -> UploadError {
        UploadError::PartUploadFailed {
            part_number,
            attempts,
            source,
            abort_error: None,
        }
    }
}
