//! Service error types.
//!
//! Every fallible installer or snapshot operation returns [`ServiceError`].
//! Each variant maps onto one HTTP status through
//! [`ServiceError::status_code`], which the API layer and the CLI both use.

use fogvault_types::FogvaultError;
use thiserror::Error;

/// Errors produced by services in this crate.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The request is missing fields or carries unusable values.
    #[error("{0}")]
    InvalidRequest(String),

    /// The downloaded artifact does not match the declared checksum.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Checksum supplied by the caller.
        expected: String,
        /// Checksum of the downloaded bytes.
        actual: String,
    },

    /// The archive contains neither interpreted sources nor shared objects,
    /// or its layout cannot be interpreted as a plugin directory.
    #[error("invalid plugin structure: {0}")]
    InvalidPluginStructure(String),

    /// A versioned shared object is missing its bare `.so` symlink.
    #[error("missing symlink: {0}")]
    MissingSymlink(String),

    /// The named resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The artifact could not be downloaded.
    #[error("failed to fetch {url}: {reason}")]
    FetchFailed {
        /// Requested URL.
        url: String,
        /// What went wrong.
        reason: String,
    },

    /// The artifact download exceeded its time budget.
    #[error("timed out fetching {url}")]
    FetchTimeout {
        /// Requested URL.
        url: String,
    },

    /// Writing a snapshot archive failed.
    #[error("snapshot build failed: {0}")]
    BuildFailed(String),

    /// Unpacking a snapshot archive failed.
    #[error("snapshot restore failed: {0}")]
    RestoreFailed(String),

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    /// The HTTP client could not be built.
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl ServiceError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_)
            | Self::ChecksumMismatch { .. }
            | Self::InvalidPluginStructure(_)
            | Self::MissingSymlink(_) => 400,
            Self::NotFound(_) => 404,
            Self::FetchFailed { .. } => 502,
            Self::FetchTimeout { .. } => 504,
            Self::BuildFailed(_)
            | Self::RestoreFailed(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::TaskJoin(_)
            | Self::HttpClient(_) => 500,
        }
    }
}

impl From<FogvaultError> for ServiceError {
    fn from(err: FogvaultError) -> Self {
        match err {
            FogvaultError::Io(e) => Self::Io(e),
            FogvaultError::Json(e) => Self::Json(e),
            other => Self::InvalidRequest(other.to_string()),
        }
    }
}

/// Convenience alias for results in this crate.
pub type Result<T> = std::result::Result<T, ServiceError>;
