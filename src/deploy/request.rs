// ABOUTME: Input to one deployment: what to package and where it goes.
// ABOUTME: Resolves the source directory to an absolute path up front.

use std::path::{Component, Path, PathBuf};

use crate::config::MAX_ARTIFACT_SIZE;
use crate::package::ExcludePatterns;
use crate::types::{AccountId, AppId, BranchName, ModulePath};

pub const DEFAULT_ENVIRONMENT: &str = "Production";
pub const DEFAULT_MODULE: &str = "nodejs";

/// Everything one deployment needs. Not changed once the pipeline starts.
#[derive(Debug, Clone)]
pub struct PackageRequest {
    /// Absolute path of the app to package.
    pub source_dir: PathBuf,
    pub excludes: ExcludePatterns,
    pub account: AccountId,
    pub app: AppId,
    /// Branch of the config repository to update.
    pub environment: BranchName,
    /// Subdirectory of the config repository holding the runtime's descriptor.
    pub module: ModulePath,
    pub max_size: u64,
    pub skip_validation: bool,
    /// Leave the packed archive on disk and report its path.
    pub keep_artifact: bool,
    /// Leave the config repository checkout on disk and report its path.
    pub keep_checkout: bool,
}

impl PackageRequest {
    /// Request with the default exclusions and size ceiling.
    ///
    /// `source_dir` may be relative; it is resolved against `cwd`.
    pub fn new(
        source_dir: &Path,
        cwd: &Path,
        account: AccountId,
        app: AppId,
        environment: BranchName,
        module: ModulePath,
    ) -> Self {
        Self {
            source_dir: resolve_source_dir(source_dir, cwd),
            excludes: ExcludePatterns::new([".lint", ".git"]),
            account,
            app,
            environment,
            module,
            max_size: MAX_ARTIFACT_SIZE,
            skip_validation: false,
            keep_artifact: false,
            keep_checkout: false,
        }
    }
}

/// Absolute, lexically normalised form of `dir`.
///
/// Archive entry names are made by stripping the source directory from
/// each collected path, so `.` and `..` must be gone before collection
/// regardless of where the tool was started.
pub fn resolve_source_dir(dir: &Path, cwd: &Path) -> PathBuf {
    let joined = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        cwd.join(dir)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}
