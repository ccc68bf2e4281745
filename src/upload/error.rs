// ABOUTME: Error types for artifact upload.
// ABOUTME: Keeps size, transport, status and decode failures distinguishable.

use std::time::Duration;

use reqwest::StatusCode;

/// Errors from uploading an artifact to the platform.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Rejected locally before any request was made.
    #[error("file size ({size}) is greater than ({max})")]
    TooLarge { size: u64, max: u64 },

    /// Upload endpoint could not be parsed.
    #[error("invalid upload endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// Local failure reading the artifact.
    #[error("unable to read tarball: {0}")]
    Read(#[source] std::io::Error),

    /// HTTP client could not be built.
    #[error("unable to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request never produced a response.
    #[error("upload request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The request did not finish within the configured timeout.
    #[error("upload timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    /// The platform answered with a status other than 200 or 204.
    #[error("upload failed with status: {status}{}", tx_suffix(.tx_id))]
    Status {
        status: StatusCode,
        tx_id: Option<String>,
    },

    /// The success response body was not the expected JSON.
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadErrorKind {
    TooLarge,
    InvalidRequest,
    Transport,
    Timeout,
    Status,
    Decode,
}

impl UploadError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> UploadErrorKind {
        match self {
            UploadError::TooLarge { .. } => UploadErrorKind::TooLarge,
            UploadError::InvalidEndpoint { .. }
            | UploadError::Read(_)
            | UploadError::Client(_) => UploadErrorKind::InvalidRequest,
            UploadError::Transport(_) => UploadErrorKind::Transport,
            UploadError::Timeout(_) => UploadErrorKind::Timeout,
            UploadError::Status { .. } => UploadErrorKind::Status,
            UploadError::Decode(_) => UploadErrorKind::Decode,
        }
    }

    /// The platform transaction ID, when the failure response carried one.
    pub fn tx_id(&self) -> Option<&str> {
        match self {
            UploadError::Status { tx_id, .. } => tx_id.as_deref(),
            _ => None,
        }
    }
}

fn tx_suffix(tx_id: &Option<String>) -> String {
    tx_id
        .as_ref()
        .map(|id| format!(" and transaction ID {id}"))
        .unwrap_or_default()
}
