// ABOUTME: Platform collaborators the deploy pipeline consumes.
// ABOUTME: Application name lookup over the REST API and API token sources.

mod error;
mod resolver;

pub use error::PlatformError;
pub use resolver::HttpApplicationResolver;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::Secret;
use crate::types::{AccountId, AppId};

/// The parts of an application record the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Application {
    #[serde(rename = "application_name")]
    pub name: String,
}

/// Looks up application metadata by id.
#[async_trait]
pub trait ApplicationResolver: Send + Sync {
    async fn resolve_application(
        &self,
        account: AccountId,
        app: AppId,
    ) -> Result<Application, PlatformError>;
}

/// Where the API token comes from.
pub trait TokenSource {
    fn auth_token(&self) -> Result<String, PlatformError>;
}

/// A token known up front, e.g. from `--token`.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken([redacted])")
    }
}

impl TokenSource for StaticToken {
    fn auth_token(&self) -> Result<String, PlatformError> {
        if self.0.trim().is_empty() {
            return Err(PlatformError::MissingToken);
        }
        Ok(self.0.clone())
    }
}

impl TokenSource for Secret {
    fn auth_token(&self) -> Result<String, PlatformError> {
        match self.resolve() {
            Ok(token) if !token.trim().is_empty() => Ok(token),
            Ok(_) => Err(PlatformError::MissingToken),
            Err(e) => {
                tracing::debug!("Token not available: {}", e);
                Err(PlatformError::MissingToken)
            }
        }
    }
}

impl<T: TokenSource> TokenSource for Option<T> {
    fn auth_token(&self) -> Result<String, PlatformError> {
        match self {
            Some(source) => source.auth_token(),
            None => Err(PlatformError::MissingToken),
        }
    }
}
