//! Error types for the shard mirror resolver

use thiserror::Error;

/// Result type alias for mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Operational errors: configuration, file IO, HTTP client setup and image decoding.
///
/// Resolution failures (an unrecognised URL, an exhausted candidate list) are
/// not errors and never show up here.
#[derive(Error, Debug, Clone)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Image decode error: {0}")]
    DecodeError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for MirrorError {
    fn from(err: std::io::Error) -> Self {
        MirrorError::IoError(err.to_string())
    }
}

impl From<reqwest::Error> for MirrorError {
    fn from(err: reqwest::Error) -> Self {
        MirrorError::HttpError(err.to_string())
    }
}

impl From<image::ImageError> for MirrorError {
    fn from(err: image::ImageError) -> Self {
        MirrorError::DecodeError(err.to_string())
    }
}

/// Why a single probe did not confirm a working mirror
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeFailure {
    /// The image loaded but is a placeholder (width at or below the threshold)
    #[error("empty")]
    Empty,

    /// Network, HTTP status or decoding failure
    #[error("error")]
    Error,

    /// Nothing settled before the probe timeout elapsed
    #[error("timeout")]
    Timeout,
}

impl ProbeFailure {
    /// Short label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeFailure::Empty => "empty",
            ProbeFailure::Error => "error",
            ProbeFailure::Timeout => "timeout",
        }
    }
}
