// ABOUTME: Error types for updating the application's config repository.
// ABOUTME: Separates clone, descriptor, commit and push failures, and push rejections from races.

use std::path::PathBuf;
use std::time::Duration;

/// Errors from cloning, mutating and pushing the config repository.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Cloning the remote failed (auth, network, or missing branch).
    #[error("failed to clone {url}: {source}")]
    Clone {
        url: String,
        #[source]
        source: git2::Error,
    },

    /// The fresh checkout could not be inspected.
    #[error("failed to {operation} in cloned repository: {source}")]
    Checkout {
        operation: &'static str,
        #[source]
        source: git2::Error,
    },

    /// The application was not scaffolded for this deployment mechanism.
    #[error("{path} not found in the HEAD commit; was the app created for sectionctl deploys?")]
    DescriptorMissing { path: String },

    /// The descriptor exists but is not a JSON object.
    #[error("failed to parse {path}: {source}")]
    DescriptorInvalid {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Writing into the working tree failed.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Staging or committing failed.
    #[error("failed to make a commit on the temporary repository: {source}")]
    Commit {
        #[source]
        source: git2::Error,
    },

    /// The remote refused the update because the branch moved on.
    #[error(
        "push to {branch} was rejected ({reason}); another deployment updated the branch first, re-run the deploy"
    )]
    PushRejected { branch: String, reason: String },

    /// Any other push failure.
    #[error("failed to push git changes to {url}: {source}")]
    Push {
        url: String,
        #[source]
        source: git2::Error,
    },

    /// Clone and push did not finish within the git timeout.
    #[error("git operation timed out after {} seconds; check repository access", .0.as_secs())]
    Timeout(Duration),

    /// The deployment was abandoned while git was talking to the remote.
    #[error("git operation cancelled")]
    Cancelled,

    /// The temporary checkout directory could not be created.
    #[error("failed to create checkout directory: {0}")]
    TempDir(#[source] std::io::Error),

    /// The background git task panicked or was aborted.
    #[error("git task failed: {0}")]
    Task(String),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoErrorKind {
    CloneFailed,
    DescriptorMissing,
    DescriptorInvalid,
    CommitFailed,
    PushRejected,
    PushFailed,
    Timeout,
    Cancelled,
    Internal,
}

impl RepoError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> RepoErrorKind {
        match self {
            RepoError::Clone { .. } | RepoError::Checkout { .. } | RepoError::TempDir(_) => {
                RepoErrorKind::CloneFailed
            }
            RepoError::DescriptorMissing { .. } => RepoErrorKind::DescriptorMissing,
            RepoError::DescriptorInvalid { .. } => RepoErrorKind::DescriptorInvalid,
            RepoError::Write { .. } | RepoError::Commit { .. } => RepoErrorKind::CommitFailed,
            RepoError::PushRejected { .. } => RepoErrorKind::PushRejected,
            RepoError::Push { .. } => RepoErrorKind::PushFailed,
            RepoError::Timeout(_) => RepoErrorKind::Timeout,
            RepoError::Cancelled => RepoErrorKind::Cancelled,
            RepoError::Task(_) => RepoErrorKind::Internal,
        }
    }
}
