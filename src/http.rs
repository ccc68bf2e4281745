// ABOUTME: Shared HTTP client construction and platform header names.
// ABOUTME: Used by both the artifact uploader and the REST API collaborators.

use std::time::Duration;

use reqwest::header::HeaderMap;

/// Header carrying the API token on every platform request.
pub const TOKEN_HEADER: &str = "section-token";

/// Response header with the platform's transaction ID, the support escalation key.
pub const TX_ID_HEADER: &str = "aperture-tx-id";

/// User agent in the form `sectionctl/<version> (<arch>-<os>)`.
pub fn user_agent() -> String {
    format!(
        "sectionctl/{} ({}-{})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::ARCH,
        std::env::consts::OS
    )
}

/// Build a client whose every request is bounded by `timeout`.
pub fn client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent())
        .build()
}

/// Extract the transaction ID from a response, if the platform sent one.
pub fn tx_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(TX_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
