// Error handling framework

use std::path::PathBuf;
use thiserror::Error;

/// Talk catalog loading errors
///
/// These are per-file failures: the catalog records them and keeps loading
/// the remaining files.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing front matter header in {0}")]
    MissingFrontMatter(PathBuf),

    #[error("Invalid front matter in {path}: {reason}")]
    InvalidFrontMatter { path: PathBuf, reason: String },

    #[error("Missing required field '{field}' in {path}")]
    MissingField { field: &'static str, path: PathBuf },

    #[error("Invalid timestamp in {path}: {source}")]
    InvalidTimestamp {
        path: PathBuf,
        #[source]
        source: TimestampError,
    },
}

/// Timestamp parse failure (talk front matter or artifact header)
#[derive(Error, Debug)]
#[error("Unrecognized timestamp '{value}'")]
pub struct TimestampError {
    pub value: String,
}

/// Webhook delivery errors
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(String),

    #[error("Webhook request failed: {0}")]
    RequestFailed(String),

    #[error("Webhook responded with status {status}")]
    UnexpectedStatus { status: u16 },
}

impl DeliveryError {
    /// Whether another attempt could plausibly succeed
    pub fn is_transient(&self) -> bool {
        !matches!(self, DeliveryError::ClientBuild(_))
    }
}

/// Task queue errors
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Broker connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Failed to enqueue task: {0}")]
    PublishFailed(String),

    #[error("Failed to claim due tasks: {0}")]
    ClaimFailed(String),

    #[error("Failed to serialize task: {0}")]
    SerializationFailed(String),
}

/// Folder pipeline errors
#[derive(Error, Debug)]
pub enum FolderError {
    /// Fatal: reported before any scan work begins
    #[error("Required folder '{0}' does not exist")]
    MissingFolder(PathBuf),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid artifact {path}: {reason}")]
    InvalidArtifact { path: PathBuf, reason: String },

    #[error("Delivery of {path} failed: {source}")]
    Delivery {
        path: PathBuf,
        #[source]
        source: DeliveryError,
    },
}

/// Draft generation errors
#[derive(Error, Debug)]
pub enum DraftsError {
    #[error("Template loading failed: {0}")]
    TemplateLoad(String),

    #[error("Rendering '{template}' failed: {reason}")]
    Render { template: String, reason: String },

    #[error("Failed to write draft {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
