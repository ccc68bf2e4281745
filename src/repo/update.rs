// ABOUTME: State transitions for updating the config repository.
// ABOUTME: Clone, read descriptor, rewrite, commit and push, each consuming the previous state.

use std::cell::{Cell, RefCell};
use std::path::Path;

use git2::build::RepoBuilder;
use git2::{Cred, CredentialType, ErrorCode, FetchOptions, PushOptions, RemoteCallbacks, Signature};

use super::descriptor::ExternalSourceDescriptor;
use super::error::RepoError;
use super::section_config::{ModuleImage, SectionConfig};
use super::state::{
    Checkout, Cloned, Committed, DescriptorRead, DescriptorRewritten, NotStarted, Pushed,
};
use super::{AbortFlag, GitSettings, RepoUpdateReport, RepoUpdateRequest};

/// Username sent with the token. Must be non-empty; the platform ignores it.
const GIT_USERNAME: &str = "section-token";

/// An update of the config repository in progress, parameterized by its state.
///
/// The chain is strictly linear and every transition consumes `self`, so a
/// descriptor can never be rewritten twice or pushed before it is committed.
#[derive(Debug)]
pub struct RepoUpdate<S> {
    settings: GitSettings,
    request: RepoUpdateRequest,
    abort: AbortFlag,
    state: S,
}

impl<S> RepoUpdate<S> {
    fn transition<T>(self, state: T) -> RepoUpdate<T> {
        RepoUpdate {
            settings: self.settings,
            request: self.request,
            abort: self.abort,
            state,
        }
    }

    pub fn request(&self) -> &RepoUpdateRequest {
        &self.request
    }

    /// Repository-relative path of the descriptor file.
    pub fn descriptor_path(&self) -> String {
        self.request.module.join(&self.settings.descriptor_filename)
    }

    /// Callbacks shared by fetch and push: token auth and abort checks.
    fn callbacks<'a>(&'a self, auth_attempts: &'a Cell<u32>) -> RemoteCallbacks<'a> {
        let mut callbacks = RemoteCallbacks::new();
        let token = self.request.token.as_str();
        callbacks.credentials(move |_url, _username, allowed| {
            if !allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
                return Cred::default();
            }
            // libgit2 asks again after a rejected credential; stop instead of looping.
            let attempt = auth_attempts.get() + 1;
            auth_attempts.set(attempt);
            if attempt > 1 {
                return Err(git2::Error::from_str(
                    "authentication rejected; check your API token",
                ));
            }
            Cred::userpass_plaintext(GIT_USERNAME, token)
        });
        let abort = &self.abort;
        callbacks.transfer_progress(move |_| !abort.is_raised());
        callbacks.sideband_progress(move |line| {
            tracing::debug!("remote: {}", String::from_utf8_lossy(line).trim_end());
            !abort.is_raised()
        });
        callbacks.push_negotiation(move |_| {
            if abort.is_raised() {
                Err(git2::Error::from_str("push cancelled"))
            } else {
                Ok(())
            }
        });
        callbacks
    }
}

// =============================================================================
// NotStarted -> Cloned
// =============================================================================

impl RepoUpdate<NotStarted> {
    pub fn new(settings: GitSettings, request: RepoUpdateRequest) -> Self {
        RepoUpdate {
            settings,
            request,
            abort: AbortFlag::default(),
            state: NotStarted,
        }
    }

    /// Share an abort flag with the caller so it can stop network transfers.
    pub fn with_abort(mut self, abort: AbortFlag) -> Self {
        self.abort = abort;
        self
    }

    /// Run every transition through to `Pushed`.
    ///
    /// The module image is looked up from the pre-mutation tree and never
    /// fails the update.
    ///
    /// # Errors
    ///
    /// Returns the first `RepoError` raised by any transition.
    pub fn run(self) -> Result<RepoUpdateReport, RepoError> {
        let read = self.clone_repo()?.read_descriptor()?;
        let module_image = read.module_image();
        let pushed = read.rewrite()?.commit()?.push()?;
        Ok(pushed.into_report(module_image))
    }

    /// Clone the remote, checking out only the target branch.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::Clone` on auth, network or missing-branch failures
    /// and `RepoError::Cancelled` if the abort flag was raised mid-transfer.
    pub fn clone_repo(self) -> Result<RepoUpdate<Cloned>, RepoError> {
        let mut temp = tempfile::Builder::new();
        temp.prefix("sectionctl-");
        let dir = match &self.settings.temp_dir {
            Some(parent) => temp.tempdir_in(parent),
            None => temp.tempdir(),
        }
        .map_err(RepoError::TempDir)?;
        tracing::info!(
            "Cloning application configuration repo to {}",
            dir.path().display()
        );

        let auth_attempts = Cell::new(0);
        let cloned = {
            let mut fetch = FetchOptions::new();
            fetch.remote_callbacks(self.callbacks(&auth_attempts));

            let mut builder = RepoBuilder::new();
            builder.branch(self.request.branch.as_str());
            builder.fetch_options(fetch);
            builder.clone(&self.request.remote_url, dir.path())
        };

        let repo = match cloned {
            Ok(repo) => repo,
            Err(_) if self.abort.is_raised() => return Err(RepoError::Cancelled),
            Err(source) => {
                return Err(RepoError::Clone {
                    url: self.request.remote_url.clone(),
                    source,
                });
            }
        };

        Ok(self.transition(Cloned {
            checkout: Checkout { repo, dir },
        }))
    }
}

// =============================================================================
// Cloned -> DescriptorRead
// =============================================================================

impl RepoUpdate<Cloned> {
    /// Read the descriptor from the HEAD commit's tree.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::DescriptorMissing` if the file is absent and
    /// `RepoError::DescriptorInvalid` if it is not a JSON object.
    pub fn read_descriptor(self) -> Result<RepoUpdate<DescriptorRead>, RepoError> {
        let path = self.descriptor_path();
        let (base_commit, descriptor) = self.load_descriptor(&path)?;

        let Cloned { checkout } = self.state;
        Ok(RepoUpdate {
            settings: self.settings,
            request: self.request,
            abort: self.abort,
            state: DescriptorRead {
                checkout,
                base_commit,
                descriptor,
            },
        })
    }

    fn load_descriptor(
        &self,
        path: &str,
    ) -> Result<(git2::Oid, ExternalSourceDescriptor), RepoError> {
        let repo = &self.state.checkout.repo;
        let head = repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map_err(|source| RepoError::Checkout {
                operation: "resolve HEAD",
                source,
            })?;
        tracing::debug!("HEAD commit: {} {}", head.id(), head.summary().unwrap_or(""));

        let content = match read_blob(repo, &head, path) {
            Ok(content) => content,
            Err(e) if e.code() == ErrorCode::NotFound => {
                return Err(RepoError::DescriptorMissing {
                    path: path.to_string(),
                });
            }
            Err(source) => {
                return Err(RepoError::Checkout {
                    operation: "read descriptor",
                    source,
                });
            }
        };
        tracing::debug!(
            "Old external source contents: {}",
            String::from_utf8_lossy(&content)
        );

        let descriptor =
            ExternalSourceDescriptor::parse(&content).map_err(|source| {
                RepoError::DescriptorInvalid {
                    path: path.to_string(),
                    source,
                }
            })?;
        Ok((head.id(), descriptor))
    }
}

// =============================================================================
// DescriptorRead -> DescriptorRewritten
// =============================================================================

impl RepoUpdate<DescriptorRead> {
    pub fn descriptor(&self) -> &ExternalSourceDescriptor {
        &self.state.descriptor
    }

    /// Image/version of the module being deployed, from the proxy chain file.
    ///
    /// Best effort: any failure is logged and reported as unknown.
    pub fn module_image(&self) -> ModuleImage {
        match self.lookup_module_image() {
            Ok(image) => image,
            Err(reason) => {
                tracing::debug!("{}", reason);
                ModuleImage::unknown(reason)
            }
        }
    }

    fn lookup_module_image(&self) -> Result<ModuleImage, String> {
        let path = &self.settings.section_config_path;
        let repo = &self.state.checkout.repo;
        let content = repo
            .find_commit(self.state.base_commit)
            .and_then(|commit| read_blob(repo, &commit, path))
            .map_err(|e| {
                format!("unable to open {path} which is used to log the image name and version: {e}")
            })?;
        let config = SectionConfig::parse(&content)
            .map_err(|e| format!("there was an issue reading {path}: {e}"))?;

        match config.image_for(&self.request.module) {
            Some(image) => Ok(ModuleImage::Known(image.to_string())),
            None => {
                tracing::debug!(
                    "Failed to pair app path {} with an image in {}",
                    self.request.module,
                    path
                );
                Ok(ModuleImage::unknown(format!(
                    "no proxychain entry named {}",
                    self.request.module
                )))
            }
        }
    }

    /// Point the descriptor at the new payload and write it to the working tree.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::Write` if the file cannot be written.
    pub fn rewrite(self) -> Result<RepoUpdate<DescriptorRewritten>, RepoError> {
        let relative = self.descriptor_path();
        let DescriptorRead {
            checkout,
            mut descriptor,
            ..
        } = self.state;
        let target = checkout.dir.path().join(&relative);

        let previous_payload_id = descriptor.payload_id();
        let json = descriptor
            .set_payload_id(&self.request.payload_id)
            .and_then(|()| descriptor.to_json())
            .map_err(|e| RepoError::Write {
                path: target.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            })?;
        tracing::debug!("Expected new payload ID: {}", self.request.payload_id);

        std::fs::write(&target, json).map_err(|source| RepoError::Write {
            path: target.clone(),
            source,
        })?;

        Ok(RepoUpdate {
            settings: self.settings,
            request: self.request,
            abort: self.abort,
            state: DescriptorRewritten {
                checkout,
                previous_payload_id,
            },
        })
    }
}

// =============================================================================
// DescriptorRewritten -> Committed
// =============================================================================

impl RepoUpdate<DescriptorRewritten> {
    /// Stage only the descriptor and commit it on top of HEAD.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::Commit` if staging or committing fails.
    pub fn commit(self) -> Result<RepoUpdate<Committed>, RepoError> {
        let relative = self.descriptor_path();
        let message = format!(
            "[sectionctl] updated {relative} with new deployment.\n\nPayload: {}",
            self.request.payload_id
        );
        let commit = create_commit(&self.state.checkout, &relative, &self.settings, &message)
            .map_err(|source| RepoError::Commit { source })?;
        tracing::debug!("New commit: {}", commit);

        let DescriptorRewritten {
            checkout,
            previous_payload_id,
        } = self.state;
        Ok(RepoUpdate {
            settings: self.settings,
            request: self.request,
            abort: self.abort,
            state: Committed {
                checkout,
                commit,
                previous_payload_id,
            },
        })
    }
}

fn create_commit(
    checkout: &Checkout,
    relative: &str,
    settings: &GitSettings,
    message: &str,
) -> Result<git2::Oid, git2::Error> {
    let repo = &checkout.repo;
    let mut index = repo.index()?;
    index.add_path(Path::new(relative))?;
    index.write()?;
    let tree = repo.find_tree(index.write_tree()?)?;
    let parent = repo.head()?.peel_to_commit()?;
    let author = Signature::now(&settings.author.name, &settings.author.email)?;
    repo.commit(Some("HEAD"), &author, &author, message, &tree, &[&parent])
}

// =============================================================================
// Committed -> Pushed
// =============================================================================

impl RepoUpdate<Committed> {
    pub fn commit_id(&self) -> String {
        self.state.commit.to_string()
    }

    /// Push the commit to the branch it was cloned from. Never forces.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::PushRejected` when the remote branch moved since
    /// the clone (a concurrent deploy won), `RepoError::Push` otherwise.
    pub fn push(self) -> Result<RepoUpdate<Pushed>, RepoError> {
        let branch = self.request.branch.as_str();
        let reference = self.request.branch.reference();
        let refspec = format!("{reference}:{reference}");
        tracing::info!(
            "Pushing {} to {} on {}",
            self.state.commit,
            branch,
            self.request.remote_url
        );

        let rejection: RefCell<Option<String>> = RefCell::new(None);
        let auth_attempts = Cell::new(0);
        let result = {
            let mut callbacks = self.callbacks(&auth_attempts);
            callbacks.push_update_reference(|refname, status| {
                if let Some(message) = status {
                    *rejection.borrow_mut() = Some(format!("{refname}: {message}"));
                }
                Ok(())
            });
            let mut options = PushOptions::new();
            options.remote_callbacks(callbacks);

            self.state
                .checkout
                .repo
                .find_remote("origin")
                .and_then(|mut remote| remote.push(&[refspec.as_str()], Some(&mut options)))
        };

        match result {
            Ok(()) => {}
            Err(_) if self.abort.is_raised() => return Err(RepoError::Cancelled),
            Err(e) if is_rejection(&e) => {
                return Err(RepoError::PushRejected {
                    branch: branch.to_string(),
                    reason: e.message().to_string(),
                });
            }
            Err(source) => {
                return Err(RepoError::Push {
                    url: self.request.remote_url.clone(),
                    source,
                });
            }
        }
        if let Some(reason) = rejection.into_inner() {
            return Err(RepoError::PushRejected {
                branch: branch.to_string(),
                reason,
            });
        }

        let Committed {
            checkout,
            commit,
            previous_payload_id,
        } = self.state;
        let kept_checkout = release_checkout(checkout, self.request.keep_checkout);

        Ok(RepoUpdate {
            settings: self.settings,
            request: self.request,
            abort: self.abort,
            state: Pushed {
                commit,
                previous_payload_id,
                kept_checkout,
            },
        })
    }
}

/// Remove the working copy, or keep it and return its path.
fn release_checkout(checkout: Checkout, keep: bool) -> Option<std::path::PathBuf> {
    let Checkout { repo, dir } = checkout;
    drop(repo);
    if keep {
        return Some(dir.keep());
    }
    let path = dir.path().to_path_buf();
    if let Err(e) = dir.close() {
        tracing::warn!("Failed to remove checkout {}: {}", path.display(), e);
    }
    None
}

fn is_rejection(err: &git2::Error) -> bool {
    if err.code() == ErrorCode::NotFastForward {
        return true;
    }
    let message = err.message();
    message.contains("non-fast-forward")
        || message.contains("non-fastforwardable")
        || message.contains("not present locally")
        || message.contains("fetch first")
}

// =============================================================================
// Pushed (terminal)
// =============================================================================

impl RepoUpdate<Pushed> {
    pub fn commit_id(&self) -> String {
        self.state.commit.to_string()
    }

    pub fn kept_checkout(&self) -> Option<&Path> {
        self.state.kept_checkout.as_deref()
    }

    /// Finish the update, consuming the state machine.
    pub fn into_report(self, module_image: ModuleImage) -> RepoUpdateReport {
        RepoUpdateReport {
            commit: self.state.commit.to_string(),
            previous_payload_id: self.state.previous_payload_id,
            module_image,
            kept_checkout: self.state.kept_checkout,
        }
    }
}

/// Read the blob at `path` in `commit`'s tree.
fn read_blob(
    repo: &git2::Repository,
    commit: &git2::Commit<'_>,
    path: &str,
) -> Result<Vec<u8>, git2::Error> {
    let tree = commit.tree()?;
    let entry = tree.get_path(Path::new(path))?;
    let blob = entry.to_object(repo)?.peel_to_blob()?;
    Ok(blob.content().to_vec())
}
