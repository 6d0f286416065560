//! Multipart session lifecycle
//!
//! Owns one multipart upload end to end: initiation, part planning,
//! sequential part upload, finalization, and abort-on-failure rollback.
//! Parts are uploaded strictly one at a time in ascending order; a single
//! part failure aborts the whole session.

mod part;

use bytes::Bytes;
use chrono::{Duration, Utc};
use std::ops::Range;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::UploadConfig;
use crate::errors::UploadError;
use crate::metrics;
use crate::storage::{CompletedPartRecord, SessionHandle, StorageClient};

pub use part::{PartResult, PartStatus, PartUploader};

/// Highest part number the multipart wire protocol accepts
pub const MAX_PARTS: usize = 10_000;

/// Lifecycle state of a multipart session
///
/// `Completed` and `Aborted` are mutually exclusive terminal states; no
/// part operation is permitted once either is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitiated,
    Initiated,
    InProgress,
    Completed,
    Aborted,
}

/// Compute the ordered byte ranges covering `total` bytes in `part_size`
/// chunks. Range i spans [i*part_size, min((i+1)*part_size, total)); only
/// the final range may be shorter than `part_size`.
pub fn part_ranges(total: usize, part_size: usize) -> Vec<Range<usize>> {
    let mut ranges = Vec::with_capacity(total.div_ceil(part_size));
    let mut start = 0;
    while start < total {
        let end = usize::min(start + part_size, total);
        ranges.push(start..end);
        start = end;
    }
    ranges
}

/// One multipart upload transaction against the store.
///
/// The session and its part list are owned exclusively by the single
/// `run` invocation; `&mut self` enforces the single-owner discipline at
/// compile time. A session that reaches a terminal state cannot be reused;
/// retrying the whole object requires a fresh session.
pub struct MultipartSession {
    client: Arc<dyn StorageClient>,
    uploader: PartUploader,
    key: String,
    part_size: usize,
    expiry_hours: i64,
    handle: Option<SessionHandle>,
    parts: Vec<PartResult>,
    state: SessionState,
}

impl MultipartSession {
    /// Create a fresh, uninitiated session for `key`
    pub fn new(client: Arc<dyn StorageClient>, config: &UploadConfig, key: &str) -> Self {
        Self {
            uploader: PartUploader::new(client.clone(), config.retry_budget),
            client,
            key: key.to_string(),
            part_size: config.part_size_bytes,
            expiry_hours: config.session_expiry_hours,
            handle: None,
            parts: Vec::new(),
            state: SessionState::Uninitiated,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Per-part bookkeeping, in ascending part order
    pub fn parts(&self) -> &[PartResult] {
        &self.parts
    }

    /// Ask the store to open the multipart session.
    ///
    /// Store rejection is fatal for the whole operation; there is no retry
    /// at this layer.
    pub async fn initiate(&mut self) -> Result<(), UploadError> {
        if self.state != SessionState::Uninitiated {
            return Err(UploadError::InvalidState { state: self.state });
        }

        let expiry = Utc::now() + Duration::hours(self.expiry_hours);
        let handle = self
            .client
            .initiate_multipart(&self.key, expiry)
            .await
            .map_err(|source| UploadError::Initiation {
                key: self.key.clone(),
                source,
            })?;

        info!(key = %self.key, upload_id = %handle.upload_id, "multipart session initiated");
        self.handle = Some(handle);
        self.state = SessionState::Initiated;
        Ok(())
    }

    /// Upload the whole payload and finalize the object.
    ///
    /// Initiates first if the session is still Uninitiated. Uploads parts
    /// sequentially in ascending part order; the first part to exhaust its
    /// retry budget aborts the server-side session (abort is attempted
    /// once, its failure reported as a secondary diagnostic) and surfaces
    /// the originating error. Calling this on a terminal session fails
    /// fast without contacting the store.
    pub async fn run(&mut self, payload: Bytes) -> Result<(), UploadError> {
        match self.state {
            SessionState::Uninitiated | SessionState::Initiated => {}
            // terminal or mid-flight reuse is a caller bug
            _ => return Err(UploadError::InvalidState { state: self.state }),
        }

        // validate before any store call so an invalid payload never opens
        // a server-side session that would linger until expiry
        if payload.is_empty() {
            return Err(UploadError::InvalidRequest(
                "multipart payload must not be empty".to_string(),
            ));
        }

        let ranges = part_ranges(payload.len(), self.part_size);
        if ranges.len() > MAX_PARTS {
            return Err(UploadError::InvalidRequest(format!(
                "payload requires {} parts, exceeding the {} part limit",
                ranges.len(),
                MAX_PARTS
            )));
        }

        if self.state == SessionState::Uninitiated {
            self.initiate().await?;
        }

        // handle is always present once Initiated
        let handle = match self.handle.clone() {
            Some(handle) => handle,
            None => return Err(UploadError::InvalidState { state: self.state }),
        };

        self.state = SessionState::InProgress;
        self.parts = (1..=ranges.len() as i32).map(PartResult::pending).collect();

        for (idx, range) in ranges.into_iter().enumerate() {
            let part_number = idx as i32 + 1;
            let data = payload.slice(range);

            match self
                .uploader
                .upload_with_retry(&handle, part_number, data)
                .await
            {
                Ok(result) => {
                    info!(key = %self.key, part_number, "part uploaded");
                    self.parts[idx] = result;
                }
                Err(err) => {
                    self.parts[idx].status = PartStatus::Failed;
                    return Err(self.abort_on_failure(&handle, err).await);
                }
            }
        }

        let completed: Vec<CompletedPartRecord> = self
            .parts
            .iter()
            .filter_map(|p| {
                p.tag.clone().map(|tag| CompletedPartRecord {
                    part_number: p.part_number,
                    tag,
                })
            })
            .collect();

        if let Err(source) = self.client.complete_multipart(&handle, &completed).await {
            // finalization rejection is fatal and not retried; the session
            // is unusable either way
            self.state = SessionState::Aborted;
            metrics::SESSIONS.with_label_values(&["aborted"]).inc();
            error!(key = %self.key, error = %source, "multipart completion rejected");
            return Err(UploadError::Completion(source));
        }

        self.state = SessionState::Completed;
        metrics::SESSIONS.with_label_values(&["completed"]).inc();
        info!(key = %self.key, parts = self.parts.len(), "multipart upload completed");
        Ok(())
    }

    /// Abort an open session on caller request, releasing all server-side
    /// state. Valid only before a terminal state is reached.
    pub async fn abort(&mut self) -> Result<(), UploadError> {
        let handle = match (&self.state, &self.handle) {
            (SessionState::Initiated | SessionState::InProgress, Some(handle)) => handle.clone(),
            _ => return Err(UploadError::InvalidState { state: self.state }),
        };

        self.state = SessionState::Aborted;
        metrics::SESSIONS.with_label_values(&["aborted"]).inc();
        self.client
            .abort_multipart(&handle)
            .await
            .map_err(UploadError::Abort)?;
        info!(key = %self.key, upload_id = %handle.upload_id, "multipart session aborted");
        Ok(())
    }

    /// Roll back the server-side session after a part failure.
    ///
    /// Abort is attempted exactly once; if it also fails, that error is
    /// logged and attached to the originating error without replacing it.
    async fn abort_on_failure(&mut self, handle: &SessionHandle, original: UploadError) -> UploadError {
        self.state = SessionState::Aborted;
        metrics::SESSIONS.with_label_values(&["aborted"]).inc();

        match self.client.abort_multipart(handle).await {
            Ok(()) => {
                info!(key = %self.key, upload_id = %handle.upload_id, "multipart session aborted");
                original
            }
            Err(abort_err) => {
                error!(key = %self.key, error = %abort_err, "multipart abort failed");
                match original {
                    UploadError::PartUploadFailed {
                        part_number,
                        attempts,
                        source,
                        ..
                    } => UploadError::PartUploadFailed {
                        part_number,
                        attempts,
                        source,
                        abort_error: Some(abort_err),
                    },
                    other => other,
                }
            }
        }
    }
}
