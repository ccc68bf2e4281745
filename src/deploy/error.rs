// ABOUTME: Error types for the deploy pipeline.
// ABOUTME: One variant per stage, plus a Copy kind for exhaustive matching.

use crate::package::PackageError;
use crate::platform::PlatformError;
use crate::repo::{RepoError, RepoErrorKind};
use crate::upload::{UploadError, UploadErrorKind};

use super::validate::ValidationError;

/// Errors that abort a deployment.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The directory does not look like a deployable app.
    #[error("not a valid Node.js app:\n\n{}", bullet_list(.0))]
    InvalidApp(Vec<ValidationError>),

    /// Bad input before any work started.
    #[error("{0}")]
    InvalidInput(String),

    /// Walking or packing the source tree failed.
    #[error("failed to pack files: {0}")]
    Package(#[from] PackageError),

    /// The packed archive is over the upload ceiling.
    #[error("failed to upload tarball: file size ({size}) is greater than ({max})")]
    ArtifactTooLarge { size: u64, max: u64 },

    #[error("failed to upload tarball: {0}")]
    Upload(UploadError),

    #[error("failed to look up application: {0}")]
    ApplicationLookup(#[from] PlatformError),

    #[error("failed to trigger app update: {0}")]
    Repo(#[from] RepoError),

    /// A background task panicked or the artifact could not be handled.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<UploadError> for DeployError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::TooLarge { size, max } => DeployError::ArtifactTooLarge { size, max },
            other => DeployError::Upload(other),
        }
    }
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    InvalidInput,
    ArchiveError,
    ArtifactTooLarge,
    UploadFailed,
    UploadTimeout,
    ApplicationLookupFailed,
    RepoCloneFailed,
    /// The app has no deploy descriptor in its config repo.
    DescriptorMissing,
    /// The descriptor exists but is not valid JSON.
    DescriptorInvalid,
    CommitFailed,
    PushRejected,
    PushFailed,
    RepoTimeout,
    Cancelled,
}

impl DeployError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::InvalidApp(_) | DeployError::InvalidInput(_) => {
                DeployErrorKind::InvalidInput
            }
            DeployError::Package(PackageError::NotADirectory { .. }) => {
                DeployErrorKind::InvalidInput
            }
            DeployError::Package(_) | DeployError::Internal(_) => DeployErrorKind::ArchiveError,
            DeployError::ArtifactTooLarge { .. } => DeployErrorKind::ArtifactTooLarge,
            DeployError::Upload(e) => match e.kind() {
                UploadErrorKind::Timeout => DeployErrorKind::UploadTimeout,
                UploadErrorKind::TooLarge => DeployErrorKind::ArtifactTooLarge,
                UploadErrorKind::InvalidRequest
                | UploadErrorKind::Transport
                | UploadErrorKind::Status
                | UploadErrorKind::Decode => DeployErrorKind::UploadFailed,
            },
            DeployError::ApplicationLookup(_) => DeployErrorKind::ApplicationLookupFailed,
            DeployError::Repo(e) => match e.kind() {
                RepoErrorKind::CloneFailed | RepoErrorKind::Internal => {
                    DeployErrorKind::RepoCloneFailed
                }
                RepoErrorKind::DescriptorMissing => DeployErrorKind::DescriptorMissing,
                RepoErrorKind::DescriptorInvalid => DeployErrorKind::DescriptorInvalid,
                RepoErrorKind::CommitFailed => DeployErrorKind::CommitFailed,
                RepoErrorKind::PushRejected => DeployErrorKind::PushRejected,
                RepoErrorKind::PushFailed => DeployErrorKind::PushFailed,
                RepoErrorKind::Timeout => DeployErrorKind::RepoTimeout,
                RepoErrorKind::Cancelled => DeployErrorKind::Cancelled,
            },
        }
    }

    /// Platform transaction ID for support escalation, when one was returned.
    pub fn tx_id(&self) -> Option<&str> {
        match self {
            DeployError::Upload(e) => e.tx_id(),
            DeployError::ApplicationLookup(e) => e.tx_id(),
            _ => None,
        }
    }
}

fn bullet_list(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("- {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}
