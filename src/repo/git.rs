// ABOUTME: libgit2-backed ConfigRepo adapter.
// ABOUTME: Runs the blocking update off the async runtime under a timeout.

use std::time::Duration;

use async_trait::async_trait;
use git2::opts;

use super::error::RepoError;
use super::update::RepoUpdate;
use super::{AbortFlag, ConfigRepo, GitSettings, RepoUpdateReport, RepoUpdateRequest};

/// Config repository reached over git with token authentication.
#[derive(Debug, Clone)]
pub struct GitConfigRepo {
    settings: GitSettings,
}

impl GitConfigRepo {
    pub fn new(settings: GitSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl ConfigRepo for GitConfigRepo {
    async fn clone_and_update(
        &self,
        request: RepoUpdateRequest,
    ) -> Result<RepoUpdateReport, RepoError> {
        let timeout = self.settings.timeout;
        configure_git_timeouts(timeout);

        let abort = AbortFlag::default();
        // Dropping this future (timeout or Ctrl-C) raises the flag so the
        // blocking task stops at its next transfer callback.
        let _guard = abort.raise_on_drop();

        let update = RepoUpdate::new(self.settings.clone(), request).with_abort(abort.clone());
        let mut task = tokio::task::spawn_blocking(move || update.run());

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(RepoError::Task(join_error.to_string())),
            Err(_) => {
                tracing::warn!("Git operation exceeded {:?}; abandoning", timeout);
                abort.raise();
                // The task owns the checkout; wait for it to unwind and remove it.
                match tokio::time::timeout(CLEANUP_GRACE, task).await {
                    Ok(_) => tracing::debug!("Git task stopped after timeout"),
                    Err(_) => tracing::warn!(
                        "Git task still running {:?} after timeout; its checkout may remain",
                        CLEANUP_GRACE
                    ),
                }
                Err(RepoError::Timeout(timeout))
            }
        }
    }
}

/// How long a timed-out update may take to release its checkout.
const CLEANUP_GRACE: Duration = Duration::from_secs(10);

/// Extra time libgit2 sockets get beyond the stage timeout, so the stage
/// timer fires first and a blocked read still unwinds shortly after.
const SOCKET_GRACE: Duration = Duration::from_secs(1);

/// Bound libgit2's socket connect and read timeouts by the stage timeout.
fn configure_git_timeouts(timeout: Duration) {
    let timeout_ms = (timeout + SOCKET_GRACE)
        .as_millis()
        .clamp(1, i32::MAX as u128) as i32;
    // SAFETY: these only set process-wide libgit2 options and are called
    // before any transfer of this update starts.
    let result = unsafe {
        opts::set_server_connect_timeout_in_milliseconds(timeout_ms)
            .and_then(|()| opts::set_server_timeout_in_milliseconds(timeout_ms))
    };
    if let Err(e) = result {
        tracing::debug!("Could not set libgit2 timeouts: {}", e);
    }
}
