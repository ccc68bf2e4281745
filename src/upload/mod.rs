// ABOUTME: Multipart upload of a packed artifact to the platform's upload service.
// ABOUTME: Enforces the size ceiling locally and decodes the returned payload ID.

mod error;

pub use error::{UploadError, UploadErrorKind};

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Body, StatusCode, Url};
use serde::Deserialize;

use crate::http::{self, TOKEN_HEADER};
use crate::package::Artifact;
use crate::types::{AccountId, AppId, PayloadId};

/// Account and application the artifact belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTarget {
    pub account: AccountId,
    pub app: AppId,
}

/// What the platform returns once the artifact is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub payload_id: PayloadId,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "payloadID")]
    payload_id: PayloadId,
}

/// Sends artifacts to the upload endpoint. One attempt per call, no retries.
#[derive(Debug, Clone)]
pub struct Uploader {
    client: reqwest::Client,
    endpoint: Url,
    token: String,
    timeout: Duration,
    max_size: u64,
}

impl Uploader {
    /// Create an uploader for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::InvalidEndpoint` for an unparsable URL and
    /// `UploadError::Client` if the HTTP client cannot be built.
    pub fn new(
        endpoint: &str,
        token: impl Into<String>,
        timeout: Duration,
        max_size: u64,
    ) -> Result<Self, UploadError> {
        let endpoint = Url::parse(endpoint).map_err(|e| UploadError::InvalidEndpoint {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        let client = http::client(timeout).map_err(UploadError::Client)?;

        Ok(Self {
            client,
            endpoint,
            token: token.into(),
            timeout,
            max_size,
        })
    }

    /// Upload `artifact` as `multipart/form-data`.
    ///
    /// The form carries the archive as `file` plus `account_id` and `app_id`
    /// as decimal strings. The artifact is rewound before streaming.
    ///
    /// # Errors
    ///
    /// `TooLarge` without touching the network when the artifact exceeds the
    /// ceiling; otherwise `Transport`, `Timeout`, `Status` or `Decode`.
    pub async fn upload(
        &self,
        artifact: &mut Artifact,
        target: &UploadTarget,
    ) -> Result<UploadResult, UploadError> {
        if artifact.size() > self.max_size {
            return Err(UploadError::TooLarge {
                size: artifact.size(),
                max: self.max_size,
            });
        }

        artifact.rewind().map_err(UploadError::Read)?;
        let file = tokio::fs::File::from_std(artifact.reader().map_err(UploadError::Read)?);
        let part = Part::stream_with_length(Body::from(file), artifact.size())
            .file_name(artifact.file_name())
            .mime_str("application/gzip")
            .map_err(UploadError::Client)?;
        let form = Form::new()
            .part("file", part)
            .text("account_id", target.account.to_string())
            .text("app_id", target.app.to_string());

        tracing::debug!("Request URL: POST {}", self.endpoint);
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(TOKEN_HEADER, &self.token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        // 204 passes the status check but carries no payload ID, so it
        // fails below as Decode rather than Status.
        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::NO_CONTENT {
            let tx_id = http::tx_id(response.headers());
            return Err(UploadError::Status { status, tx_id });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;
        let decoded: UploadResponse = serde_json::from_slice(&body).map_err(UploadError::Decode)?;
        tracing::debug!("Upload stored as payload {}", decoded.payload_id);

        Ok(UploadResult {
            payload_id: decoded.payload_id,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> UploadError {
        if err.is_timeout() {
            UploadError::Timeout(self.timeout)
        } else {
            UploadError::Transport(err)
        }
    }
}
