//! Prometheus metrics for s3upload
//!
//! Defines metrics for:
//! - Part upload attempts by status
//! - Part retries
//! - Session outcomes (completed/aborted)
//! - Bytes uploaded
//! - Part upload duration

use lazy_static::lazy_static;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Registry for all metrics
    pub static ref REGISTRY: Registry = Registry::new();

    /// Part upload attempt counter by status (ok/error)
    pub static ref PART_ATTEMPTS: IntCounterVec = IntCounterVec::new(
        Opts::new("s3upload_part_attempts_total", "Total part upload attempts"),
        &["status"]
    )
    .expect("Failed to create PART_ATTEMPTS metric");

    /// Retries consumed across all parts
    pub static ref PART_RETRIES: IntCounter = IntCounter::new(
        "s3upload_part_retries_total",
        "Total part upload retries"
    )
    .expect("Failed to create PART_RETRIES metric");

    /// Session outcome counter (completed/aborted)
    pub static ref SESSIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("s3upload_sessions_total", "Multipart sessions by outcome"),
        &["outcome"]
    )
    .expect("Failed to create SESSIONS metric");

    /// Bytes successfully uploaded (parts and direct puts)
    pub static ref UPLOADED_BYTES: IntCounter = IntCounter::new(
        "s3upload_uploaded_bytes_total",
        "Total bytes successfully uploaded"
    )
    .expect("Failed to create UPLOADED_BYTES metric");

    /// Part upload duration histogram
    pub static ref PART_UPLOAD_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "s3upload_part_upload_duration_seconds",
            "Part upload duration in seconds"
        )
        .buckets(vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0])
    )
    .expect("Failed to create PART_UPLOAD_DURATION metric");
}

/// Initialize metrics and register with the global registry
pub fn init_metrics() {
    REGISTRY.register(Box::new(PART_ATTEMPTS.clone())).unwrap();
    REGISTRY.register(Box::new(PART_RETRIES.clone())).unwrap();
    REGISTRY.register(Box::new(SESSIONS.clone())).unwrap();
    REGISTRY.register(Box::new(UPLOADED_BYTES.clone())).unwrap();
    REGISTRY.register(Box::new(PART_UPLOAD_DURATION.clone())).unwrap();
}
