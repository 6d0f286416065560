//! Configuration management for s3upload
//!
//! Supports configuration via:
//! - Environment variables (primary)
//! - Optional TOML config file (secondary)
//!
//! Environment variables take precedence over config file values. All
//! settings are carried in explicit structs injected at construction time;
//! nothing is read from ambient global state after loading.

use serde::{Deserialize, Serialize};

use crate::errors::UploadError;

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bucket name
    pub bucket: String,

    /// AWS region (defaults to us-east-1)
    #[serde(default = "default_region")]
    pub region: String,

    /// Endpoint URL (for S3-compatible services like MinIO)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Static access key ID; when unset the default credential chain is used
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// Static secret access key
    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Canned ACL applied to uploaded objects (default: private)
    #[serde(default = "default_acl")]
    pub acl: String,

    /// Use path-style addressing (required by most S3-compatible services)
    #[serde(default)]
    pub force_path_style: bool,

    /// Public base URL for `object_url` (e.g. a CDN origin)
    #[serde(default)]
    pub public_base_url: Option<String>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_acl() -> String {
    "private".to_string()
}

/// Upload behavior configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Part size in bytes (default: 5 MiB); also the multipart threshold
    #[serde(default = "default_part_size")]
    pub part_size_bytes: usize,

    /// Additional attempts allowed per part after the first failure
    /// (default: 2, i.e. 3 total attempts)
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,

    /// Expiry hint passed to the store when opening a session (default: 24h)
    #[serde(default = "default_session_expiry_hours")]
    pub session_expiry_hours: i64,
}

fn default_part_size() -> usize {
    5 * 1024 * 1024 // 5 MiB
}

fn default_retry_budget() -> u32 {
    2
}

fn default_session_expiry_hours() -> i64 {
    24
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            part_size_bytes: default_part_size(),
            retry_budget: default_retry_budget(),
            session_expiry_hours: default_session_expiry_hours(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Storage backend configuration
    pub storage: StorageConfig,

    /// Upload behavior configuration
    #[serde(default)]
    pub upload: UploadConfig,

    /// Log level (default: info)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - S3UPLOAD_BUCKET: bucket name
    /// - S3UPLOAD_REGION: AWS region (default: us-east-1)
    /// - S3UPLOAD_ENDPOINT: custom endpoint URL (optional)
    /// - S3UPLOAD_ACCESS_KEY_ID: static access key (optional)
    /// - S3UPLOAD_SECRET_ACCESS_KEY: static secret key (optional)
    /// - S3UPLOAD_ACL: canned ACL (default: private)
    /// - S3UPLOAD_FORCE_PATH_STYLE: "true" for path-style addressing
    /// - S3UPLOAD_PUBLIC_BASE_URL: base URL for object_url (optional)
    /// - S3UPLOAD_PART_SIZE_BYTES: part size (default: 5 MiB)
    /// - S3UPLOAD_RETRY_BUDGET: retries per part (default: 2)
    /// - S3UPLOAD_SESSION_EXPIRY_HOURS: session expiry hint (default: 24)
    /// - S3UPLOAD_LOG_LEVEL: log level (default: info)
    /// - S3UPLOAD_CONFIG_FILE: optional path to TOML config file
    pub fn from_env() -> Result<Self, UploadError> {
        // Try to load from config file first if specified
        let config_file = std::env::var("S3UPLOAD_CONFIG_FILE").ok();
        let mut config = if let Some(path) = &config_file {
            Self::from_file(path)?
        } else {
            Self::default()
        };

        // Override with environment variables
        if let Ok(bucket) = std::env::var("S3UPLOAD_BUCKET") {
            config.storage.bucket = bucket;
        }

        if let Ok(region) = std::env::var("S3UPLOAD_REGION") {
            config.storage.region = region;
        }

        if let Ok(endpoint) = std::env::var("S3UPLOAD_ENDPOINT") {
            config.storage.endpoint = Some(endpoint);
        }

        if let Ok(access_key_id) = std::env::var("S3UPLOAD_ACCESS_KEY_ID") {
            config.storage.access_key_id = Some(access_key_id);
        }

        if let Ok(secret_access_key) = std::env::var("S3UPLOAD_SECRET_ACCESS_KEY") {
            config.storage.secret_access_key = Some(secret_access_key);
        }

        if let Ok(acl) = std::env::var("S3UPLOAD_ACL") {
            config.storage.acl = acl;
        }

        if let Ok(path_style) = std::env::var("S3UPLOAD_FORCE_PATH_STYLE") {
            config.storage.force_path_style = path_style
                .parse()
                .map_err(|_| UploadError::Config(format!("invalid bool: {}", path_style)))?;
        }

        if let Ok(base_url) = std::env::var("S3UPLOAD_PUBLIC_BASE_URL") {
            config.storage.public_base_url = Some(base_url);
        }

        if let Ok(size) = std::env::var("S3UPLOAD_PART_SIZE_BYTES") {
            config.upload.part_size_bytes = size
                .parse()
                .map_err(|_| UploadError::Config(format!("invalid part size: {}", size)))?;
        }

        if let Ok(budget) = std::env::var("S3UPLOAD_RETRY_BUDGET") {
            config.upload.retry_budget = budget
                .parse()
                .map_err(|_| UploadError::Config(format!("invalid retry budget: {}", budget)))?;
        }

        if let Ok(hours) = std::env::var("S3UPLOAD_SESSION_EXPIRY_HOURS") {
            config.upload.session_expiry_hours = hours
                .parse()
                .map_err(|_| UploadError::Config(format!("invalid expiry hours: {}", hours)))?;
        }

        if let Ok(level) = std::env::var("S3UPLOAD_LOG_LEVEL") {
            config.log_level = level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, UploadError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| UploadError::Config(format!("failed to read {}: {}", path, e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| UploadError::Config(format!("failed to parse {}: {}", path, e)))?;
        Ok(config)
    }

    /// Check invariants the upload core relies on
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.storage.bucket.is_empty() {
            return Err(UploadError::Config("bucket must not be empty".to_string()));
        }
        if self.upload.part_size_bytes == 0 {
            return Err(UploadError::Config(
                "part_size_bytes must be greater than zero".to_string(),
            ));
        }
        if self.upload.session_expiry_hours <= 0 {
            return Err(UploadError::Config(
                "session_expiry_hours must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the default configuration
    pub fn default() -> Self {
        Self {
            storage: StorageConfig {
                bucket: "default-bucket".to_string(),
                region: default_region(),
                endpoint: None,
                access_key_id: None,
                secret_access_key: None,
                acl: default_acl(),
                force_path_style: false,
                public_base_url: None,
            },
            upload: UploadConfig::default(),
            log_level: default_log_level(),
        }
    }
}
