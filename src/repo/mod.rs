// ABOUTME: Config repository update: point the deployed module at a new payload.
// ABOUTME: Port trait, git adapter, descriptor handling and the update state machine.

mod descriptor;
mod error;
mod git;
mod section_config;
mod state;
mod update;

pub use descriptor::{DESCRIPTOR_FILENAME, ExternalSourceDescriptor, PAYLOAD_ID_FIELD};
pub use error::{RepoError, RepoErrorKind};
pub use git::GitConfigRepo;
pub use section_config::{ModuleImage, ProxyChainEntry, SECTION_CONFIG_PATH, SectionConfig};
pub use state::{
    Checkout, Cloned, Committed, DescriptorRead, DescriptorRewritten, NotStarted, Pushed,
};
pub use update::RepoUpdate;

pub use crate::cancel::{AbortFlag, AbortOnDrop};

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::types::{AccountId, AppId, BranchName, ModulePath, PayloadId};

/// Updates the descriptor of a deployed module in its config repository.
#[async_trait]
pub trait ConfigRepo: Send + Sync {
    /// Clone, rewrite the descriptor, commit and push, as one operation.
    async fn clone_and_update(&self, request: RepoUpdateRequest)
    -> Result<RepoUpdateReport, RepoError>;
}

/// Git remote of an application's config repository.
///
/// The application name may contain `/`, which is stripped, and anything
/// else unsafe in a path segment is percent-encoded.
pub fn config_repo_url(base: &str, account: AccountId, app: AppId, app_name: &str) -> String {
    let name = app_name.replace('/', "");
    format!(
        "{}/account/{}/application/{}/{}.git",
        base.trim_end_matches('/'),
        account,
        app,
        urlencoding::encode(&name)
    )
}

/// Identity recorded on deployment commits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

impl Default for CommitAuthor {
    fn default() -> Self {
        Self {
            name: "sectionctl".to_string(),
            email: "noreply@section.io".to_string(),
        }
    }
}

/// Settings that stay the same across deployments.
#[derive(Debug, Clone)]
pub struct GitSettings {
    pub descriptor_filename: String,
    pub section_config_path: String,
    pub author: CommitAuthor,
    /// Ceiling for clone through push.
    pub timeout: Duration,
    /// Parent of temporary checkouts. The system temp directory when unset.
    pub temp_dir: Option<PathBuf>,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            descriptor_filename: DESCRIPTOR_FILENAME.to_string(),
            section_config_path: SECTION_CONFIG_PATH.to_string(),
            author: CommitAuthor::default(),
            timeout: Duration::from_secs(300),
            temp_dir: None,
        }
    }
}

/// One deployment's worth of repository changes.
#[derive(Clone)]
pub struct RepoUpdateRequest {
    pub remote_url: String,
    pub branch: BranchName,
    pub module: ModulePath,
    pub payload_id: PayloadId,
    pub token: String,
    /// Leave the working copy on disk after a successful push.
    pub keep_checkout: bool,
}

impl std::fmt::Debug for RepoUpdateRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoUpdateRequest")
            .field("remote_url", &self.remote_url)
            .field("branch", &self.branch)
            .field("module", &self.module)
            .field("payload_id", &self.payload_id)
            .field("token", &"[redacted]")
            .field("keep_checkout", &self.keep_checkout)
            .finish()
    }
}

/// Outcome of a pushed update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoUpdateReport {
    /// Hash of the pushed commit.
    pub commit: String,
    pub previous_payload_id: Option<PayloadId>,
    pub module_image: ModuleImage,
    pub kept_checkout: Option<PathBuf>,
}
