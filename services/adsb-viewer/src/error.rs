//! Error types shared across the viewer engine

use std::path::PathBuf;

use thiserror::Error;

/// Problems decoding a receiver snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot timestamp {0} is not a finite number")]
    InvalidTimestamp(f64),

    #[error("invalid aircraft address {0:?}")]
    InvalidAddress(String),
}

/// Transient failures fetching snapshots, history chunks or receiver info
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed receiver info: {0}")]
    ReceiverInfo(serde_json::Error),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Metadata database failures
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The database directory cannot be opened; metadata-driven features are off
    #[error("metadata database unavailable at {path}: {reason}")]
    DatabaseUnavailable { path: PathBuf, reason: String },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed metadata file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode metadata overrides: {0}")]
    Encode(serde_json::Error),
}

/// Filter validation and persistence failures
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("filter operand is empty")]
    EmptyOperand,

    #[error("filter operand is not a finite number")]
    NotFinite,

    #[error("filter code {0:?} is not valid for this filter")]
    InvalidCode(char),

    #[error("no filter at index {0}")]
    NoSuchFilter(usize),

    #[error("failed to persist filters to {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed filter state: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The tracker task has exited and no longer answers commands
#[derive(Debug, Error)]
#[error("tracker service has stopped")]
pub struct ServiceStopped;
