// ABOUTME: Error types for collecting and archiving the application tree.
// ABOUTME: Every variant names the path that failed, using SNAFU context selectors.

use snafu::Snafu;
use std::path::PathBuf;

/// Errors raised while turning a directory into an archive.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PackageError {
    #[snafu(display("specified path is not a directory: {}", path.display()))]
    NotADirectory { path: PathBuf },

    #[snafu(display("failed to walk {}: {source}", path.display()))]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[snafu(display("could not get stat for file '{}': {source}", path.display()))]
    Metadata {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("could not read link target of '{}': {source}", path.display()))]
    ReadLink {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("could not open file '{}': {source}", path.display()))]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("could not add '{}' to the archive: {source}", path.display()))]
    WriteEntry {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("'{}' lies outside the package root {}", path.display(), root.display()))]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[snafu(display("could not finish the archive: {source}"))]
    Finish { source: std::io::Error },

    #[snafu(display("couldn't create a temp file: {source}"))]
    CreateTemp { source: std::io::Error },
}

impl PackageError {
    /// The path the failure relates to, when there is one.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            PackageError::NotADirectory { path }
            | PackageError::Walk { path, .. }
            | PackageError::Metadata { path, .. }
            | PackageError::ReadLink { path, .. }
            | PackageError::Open { path, .. }
            | PackageError::WriteEntry { path, .. }
            | PackageError::OutsideRoot { path, .. } => Some(path),
            PackageError::Finish { .. } | PackageError::CreateTemp { .. } => None,
        }
    }
}
