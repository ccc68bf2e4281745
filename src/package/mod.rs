// ABOUTME: Packaging of an application directory into a gzip-compressed tarball.
// ABOUTME: Collects files deterministically, then archives them relative to the package root.

mod archive;
mod artifact;
mod collect;
mod error;

pub use artifact::Artifact;
pub use archive::{EXECUTABLE_SCRIPTS_DIR, build, entry_name};
pub use collect::{ExcludePatterns, FileManifest, collect};
pub use error::PackageError;
