// ABOUTME: Error types for platform REST API lookups.
// ABOUTME: Auth failures are separate variants so the CLI can point at the token.

use std::time::Duration;

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("no API token; pass --token, set SECTION_TOKEN or add a token to sectionctl.yml")]
    MissingToken,

    #[error("check your token? API request is unauthorized")]
    Unauthorized,

    #[error("check your token? API request is forbidden")]
    Forbidden,

    #[error(
        "status 429{}: the number of requests have exceeded the maximum allowed for this time period, wait a few minutes and try again",
        tx_suffix(.tx_id)
    )]
    TooManyRequests { tx_id: Option<String> },

    #[error("request failed with status {status}{}", tx_suffix(.tx_id))]
    Status {
        status: StatusCode,
        tx_id: Option<String>,
    },

    #[error("invalid API URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("API request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("API request timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("failed to decode API response: {0}")]
    Decode(#[source] serde_json::Error),
}

impl PlatformError {
    /// True for 401/403 and a missing token: re-running won't help without a new token.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            PlatformError::MissingToken | PlatformError::Unauthorized | PlatformError::Forbidden
        )
    }

    pub fn tx_id(&self) -> Option<&str> {
        match self {
            PlatformError::TooManyRequests { tx_id } | PlatformError::Status { tx_id, .. } => {
                tx_id.as_deref()
            }
            _ => None,
        }
    }
}

fn tx_suffix(tx_id: &Option<String>) -> String {
    tx_id
        .as_ref()
        .map(|id| format!(" and transaction ID {id}"))
        .unwrap_or_default()
}
