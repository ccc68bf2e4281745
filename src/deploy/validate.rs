// ABOUTME: Pre-flight check that a directory looks like a deployable Node.js app.
// ABOUTME: Reports every missing precondition, not just the first.

use std::fmt;
use std::path::{Path, PathBuf};

/// File every app must carry at its root.
pub const MANIFEST_FILE: &str = "package.json";

/// Installed dependencies, shipped with the app.
pub const DEPENDENCY_DIR: &str = "node_modules";

/// One reason a directory cannot be deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingFile(PathBuf),
    NotADirectory(PathBuf),
}

impl ValidationError {
    pub fn path(&self) -> &Path {
        match self {
            ValidationError::MissingFile(p) | ValidationError::NotADirectory(p) => p,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingFile(p) => write!(f, "{} is not a file", p.display()),
            ValidationError::NotADirectory(p) => write!(f, "{} is not a directory", p.display()),
        }
    }
}

/// Check `dir` for the manifest file and dependency directory.
///
/// An empty result means the app is deployable.
pub fn validate_app(dir: &Path) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let manifest = dir.join(MANIFEST_FILE);
    if !manifest.is_file() {
        errors.push(ValidationError::MissingFile(manifest));
    }

    let dependencies = dir.join(DEPENDENCY_DIR);
    if !dependencies.is_dir() {
        errors.push(ValidationError::NotADirectory(dependencies));
    }

    errors
}
