// ABOUTME: REST implementation of ApplicationResolver.
// ABOUTME: GET /api/v1/account/{id}/application/{id} with the token header.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};

use super::{Application, ApplicationResolver, PlatformError};
use crate::http::{self, TOKEN_HEADER};
use crate::types::{AccountId, AppId};

#[derive(Debug, Clone)]
pub struct HttpApplicationResolver {
    client: reqwest::Client,
    base: Url,
    token: String,
    timeout: Duration,
}

impl HttpApplicationResolver {
    /// Resolver against the API rooted at `api_url` (e.g. `https://aperture.section.io`).
    pub fn new(
        api_url: &str,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PlatformError> {
        let base = Url::parse(api_url).map_err(|e| PlatformError::InvalidUrl {
            url: api_url.to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(PlatformError::InvalidUrl {
                url: api_url.to_string(),
                reason: "not a base URL".to_string(),
            });
        }
        let client = http::client(timeout).map_err(PlatformError::Transport)?;
        Ok(Self {
            client,
            base,
            token: token.into(),
            timeout,
        })
    }

    fn application_url(&self, account: AccountId, app: AppId) -> String {
        format!(
            "{}/api/v1/account/{}/application/{}",
            self.base.as_str().trim_end_matches('/'),
            account,
            app
        )
    }
}

#[async_trait]
impl ApplicationResolver for HttpApplicationResolver {
    async fn resolve_application(
        &self,
        account: AccountId,
        app: AppId,
    ) -> Result<Application, PlatformError> {
        let url = self.application_url(account, app);
        tracing::debug!("Request URL: GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(TOKEN_HEADER, &self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PlatformError::Timeout(self.timeout)
                } else {
                    PlatformError::Transport(e)
                }
            })?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED => return Err(PlatformError::Unauthorized),
            StatusCode::FORBIDDEN => return Err(PlatformError::Forbidden),
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(PlatformError::TooManyRequests {
                    tx_id: http::tx_id(response.headers()),
                });
            }
            status => {
                return Err(PlatformError::Status {
                    status,
                    tx_id: http::tx_id(response.headers()),
                });
            }
        }

        let body = response.bytes().await.map_err(PlatformError::Transport)?;
        serde_json::from_slice(&body).map_err(PlatformError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_url_joins_without_double_slash() {
        let resolver =
            HttpApplicationResolver::new("https://api.example/", "t", Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            resolver.application_url(AccountId::new(1).unwrap(), AppId::new(2).unwrap()),
            "https://api.example/api/v1/account/1/application/2"
        );
    }

    #[test]
    fn rejects_unparsable_api_url() {
        assert!(matches!(
            HttpApplicationResolver::new("not a url", "t", Duration::from_secs(1)),
            Err(PlatformError::InvalidUrl { .. })
        ));
    }
}
