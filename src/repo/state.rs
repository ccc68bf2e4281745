// ABOUTME: Config repository update state types for the type state pattern.
// ABOUTME: Each state carries exactly the data the next transition needs.

use std::path::PathBuf;

use git2::{Oid, Repository};
use tempfile::TempDir;

use super::descriptor::ExternalSourceDescriptor;
use crate::types::PayloadId;

/// A cloned working copy in a temporary directory.
///
/// `repo` is declared before `dir` so the repository handle is released
/// before the directory is removed.
pub struct Checkout {
    pub(crate) repo: Repository,
    pub(crate) dir: TempDir,
}

impl std::fmt::Debug for Checkout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkout")
            .field("dir", &self.dir.path())
            .finish()
    }
}

/// Initial state: nothing fetched yet.
/// Available actions: `clone_repo()`
#[derive(Debug, Clone, Copy, Default)]
pub struct NotStarted;

/// Cloned: working copy of the target branch exists.
/// Available actions: `read_descriptor()`
#[derive(Debug)]
pub struct Cloned {
    pub(crate) checkout: Checkout,
}

/// Descriptor read from the HEAD commit.
/// Available actions: `module_image()`, `rewrite()`
#[derive(Debug)]
pub struct DescriptorRead {
    pub(crate) checkout: Checkout,
    pub(crate) base_commit: Oid,
    pub(crate) descriptor: ExternalSourceDescriptor,
}

/// Descriptor rewritten in the working tree.
/// Available actions: `commit()`
#[derive(Debug)]
pub struct DescriptorRewritten {
    pub(crate) checkout: Checkout,
    pub(crate) previous_payload_id: Option<PayloadId>,
}

/// Committed locally, not yet published.
/// Available actions: `push()`
#[derive(Debug)]
pub struct Committed {
    pub(crate) checkout: Checkout,
    pub(crate) commit: Oid,
    pub(crate) previous_payload_id: Option<PayloadId>,
}

/// Pushed: the remote branch points at the new commit. Terminal.
#[derive(Debug)]
pub struct Pushed {
    pub(crate) commit: Oid,
    pub(crate) previous_payload_id: Option<PayloadId>,
    pub(crate) kept_checkout: Option<PathBuf>,
}
