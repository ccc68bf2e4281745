// ABOUTME: Deploy pipeline: validate, package, upload, then point the config repo at the payload.
// ABOUTME: Stages run strictly in order and the first failure aborts the deployment.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::DeployError;
use super::request::PackageRequest;
use super::validate::validate_app;
use crate::cancel::AbortFlag;
use crate::config::Config;
use crate::diagnostics::{Diagnostics, Warning};
use crate::output::Output;
use crate::package::{Artifact, collect};
use crate::platform::{ApplicationResolver, HttpApplicationResolver};
use crate::repo::{
    ConfigRepo, GitConfigRepo, GitSettings, ModuleImage, RepoUpdateRequest, config_repo_url,
};
use crate::types::PayloadId;
use crate::upload::{UploadTarget, Uploader};

/// What a successful deployment changed.
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub payload_id: PayloadId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_payload_id: Option<PayloadId>,
    pub commit: String,
    pub branch: String,
    pub module: String,
    pub module_image: ModuleImage,
    pub artifact_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kept_artifact: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kept_checkout: Option<PathBuf>,
    pub deployed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

/// Runs deployments against one platform.
pub struct Deployer {
    uploader: Uploader,
    resolver: Arc<dyn ApplicationResolver>,
    repo: Arc<dyn ConfigRepo>,
    git_base_url: String,
    token: String,
    temp_dir: Option<PathBuf>,
}

impl std::fmt::Debug for Deployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployer")
            .field("uploader", &self.uploader)
            .field("git_base_url", &self.git_base_url)
            .field("temp_dir", &self.temp_dir)
            .finish_non_exhaustive()
    }
}

impl Deployer {
    pub fn new(
        uploader: Uploader,
        resolver: Arc<dyn ApplicationResolver>,
        repo: Arc<dyn ConfigRepo>,
        git_base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            uploader,
            resolver,
            repo,
            git_base_url: git_base_url.into(),
            token: token.into(),
            temp_dir: None,
        }
    }

    /// Deployer wired to the real upload service, REST API and git remotes.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::InvalidInput` when an endpoint in `config` is
    /// not a usable URL.
    pub fn from_config(config: &Config, token: &str) -> Result<Self, DeployError> {
        let uploader = Uploader::new(
            &config.upload_url,
            token,
            config.upload_timeout,
            config.max_artifact_size,
        )
        .map_err(|e| DeployError::InvalidInput(e.to_string()))?;
        let resolver = HttpApplicationResolver::new(&config.api_url, token, config.api_timeout)
            .map_err(|e| DeployError::InvalidInput(e.to_string()))?;
        let repo = GitConfigRepo::new(GitSettings {
            descriptor_filename: config.descriptor_filename.clone(),
            section_config_path: config.section_config_path.clone(),
            author: config.commit_author.clone(),
            timeout: config.git_timeout,
            temp_dir: config.temp_dir.clone(),
        });

        let mut deployer = Self::new(
            uploader,
            Arc::new(resolver),
            Arc::new(repo),
            config.git_base_url(),
            token,
        );
        deployer.temp_dir = config.temp_dir.clone();
        Ok(deployer)
    }

    /// Run the whole pipeline for `request`.
    ///
    /// The temporary archive is removed on every exit path unless
    /// `request.keep_artifact` is set. Nothing is retried.
    ///
    /// # Errors
    ///
    /// Returns the `DeployError` of the first stage that failed.
    pub async fn deploy(
        &self,
        request: &PackageRequest,
        output: &Output,
    ) -> Result<DeployReport, DeployError> {
        let mut diag = Diagnostics::default();
        let dir = &request.source_dir;

        if !request.skip_validation {
            let problems = validate_app(dir);
            if !problems.is_empty() {
                return Err(DeployError::InvalidApp(problems));
            }
        }

        output.progress(&format!("Packaging app in: {}", dir.display()));
        let mut artifact = pack(request, self.temp_dir.clone()).await?;
        tracing::debug!("Temporary tarball path: {}", artifact.path().display());

        let kept_artifact = if request.keep_artifact {
            let temp_path = artifact.path().to_path_buf();
            match artifact.keep() {
                Ok(path) => {
                    tracing::info!("Temporary upload tarball location: {}", path.display());
                    Some(path.to_path_buf())
                }
                Err(e) => {
                    diag.warn(Warning::artifact_cleanup(format!(
                        "unable to keep {}: {e}",
                        temp_path.display()
                    )));
                    None
                }
            }
        } else {
            None
        };

        let artifact_size = artifact.size();
        if artifact_size > request.max_size {
            return Err(DeployError::ArtifactTooLarge {
                size: artifact_size,
                max: request.max_size,
            });
        }

        let size_mb = artifact_size / 1024 / 1024;
        tracing::debug!(
            "Upload artifact is {}MB ({} bytes) large",
            size_mb,
            artifact_size
        );
        output.progress(&format!("Uploading app ({size_mb}MB)..."));
        let target = UploadTarget {
            account: request.account,
            app: request.app,
        };
        let uploaded = self.uploader.upload(&mut artifact, &target).await?;
        tracing::info!("Upload stored as payload {}", uploaded.payload_id);

        if let Err(e) = artifact.close() {
            diag.warn(Warning::artifact_cleanup(format!(
                "unable to remove temporary tarball: {e}"
            )));
        }

        let application = self
            .resolver
            .resolve_application(request.account, request.app)
            .await?;
        let remote_url = config_repo_url(
            &self.git_base_url,
            request.account,
            request.app,
            &application.name,
        );

        output.progress(&format!(
            "Updating {} on {} of {}...",
            request.module, request.environment, application.name
        ));
        let updated = self
            .repo
            .clone_and_update(RepoUpdateRequest {
                remote_url,
                branch: request.environment.clone(),
                module: request.module.clone(),
                payload_id: uploaded.payload_id.clone(),
                token: self.token.clone(),
                keep_checkout: request.keep_checkout,
            })
            .await?;

        if let ModuleImage::Unknown { reason } = &updated.module_image {
            diag.warn(Warning::image_lookup(format!(
                "could not determine the image for {}: {reason}",
                request.module
            )));
        }
        tracing::info!("Deploying onto module image {}", updated.module_image);

        Ok(DeployReport {
            payload_id: uploaded.payload_id,
            previous_payload_id: updated.previous_payload_id,
            commit: updated.commit,
            branch: request.environment.to_string(),
            module: request.module.to_string(),
            module_image: updated.module_image,
            artifact_size,
            kept_artifact,
            kept_checkout: updated.kept_checkout,
            deployed_at: Utc::now(),
            warnings: diag.into_warnings(),
        })
    }
}

/// Collect and archive the source tree off the async runtime.
///
/// Dropping the returned future stops the packing task at its next write;
/// the task then removes the partial archive.
async fn pack(
    request: &PackageRequest,
    temp_dir: Option<PathBuf>,
) -> Result<Artifact, DeployError> {
    let dir = request.source_dir.clone();
    let excludes = request.excludes.clone();
    let abort = AbortFlag::default();
    let _guard = abort.raise_on_drop();

    let packed = tokio::task::spawn_blocking(move || {
        let manifest = collect(&dir, &excludes)?;
        tracing::debug!("Archiving files:");
        for path in manifest.iter() {
            tracing::debug!("{}", path.display());
        }
        Artifact::pack_in(&manifest, temp_dir.as_deref(), &abort)
    })
    .await
    .map_err(|e| DeployError::Internal(format!("packaging task failed: {e}")))?;
    packed.map_err(DeployError::from)
}
