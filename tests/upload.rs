// ABOUTME: Integration tests for artifact upload against a mock upload service.
// ABOUTME: Covers the multipart form, token header, error statuses and the local size ceiling.

mod support;

use std::time::Duration;

use httpmock::prelude::*;
use sectionctl::package::{Artifact, ExcludePatterns, collect};
use sectionctl::types::{AccountId, AppId, PayloadId};
use sectionctl::upload::{UploadErrorKind, UploadTarget, Uploader};

fn packed_app() -> (tempfile::TempDir, Artifact) {
    let app = support::node_app();
    let manifest = collect(app.path(), &ExcludePatterns::new([".git"])).unwrap();
    let artifact = Artifact::pack(&manifest).unwrap();
    (app, artifact)
}

fn target() -> UploadTarget {
    UploadTarget {
        account: AccountId::new(support::ACCOUNT).unwrap(),
        app: AppId::new(support::APP).unwrap(),
    }
}

fn uploader(server: &MockServer, max_size: u64) -> Uploader {
    Uploader::new(
        &server.url("/new/code_upload/v1/upload"),
        "s3cr3t",
        Duration::from_secs(10),
        max_size,
    )
    .unwrap()
}

#[tokio::test]
async fn upload_sends_form_and_returns_payload_id() {
    support::init_tracing();
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/new/code_upload/v1/upload")
                .header("section-token", "s3cr3t")
                .header_exists("content-type")
                .body_contains("name=\"file\"")
                .body_contains("name=\"account_id\"\r\n\r\n1887")
                .body_contains("name=\"app_id\"\r\n\r\n7749");
            then.status(200)
                .json_body(serde_json::json!({ "payloadID": "p-0a1b2c" }));
        })
        .await;

    let (_app, mut artifact) = packed_app();
    let result = uploader(&server, u64::MAX)
        .upload(&mut artifact, &target())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result.payload_id, PayloadId::new("p-0a1b2c"));
}

#[tokio::test]
async fn failed_status_carries_transaction_id() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/new/code_upload/v1/upload");
            then.status(500)
                .header("Aperture-Tx-Id", "tx-42")
                .body("boom");
        })
        .await;

    let (_app, mut artifact) = packed_app();
    let err = uploader(&server, u64::MAX)
        .upload(&mut artifact, &target())
        .await
        .unwrap_err();

    mock.assert_hits_async(1).await;
    assert_eq!(err.kind(), UploadErrorKind::Status);
    assert_eq!(err.tx_id(), Some("tx-42"));
    assert!(err.to_string().contains("500"));
    assert!(err.to_string().contains("transaction ID tx-42"));
}

#[tokio::test]
async fn oversized_artifact_never_reaches_the_network() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).json_body(serde_json::json!({ "payloadID": "x" }));
        })
        .await;

    let (_app, mut artifact) = packed_app();
    let err = uploader(&server, 16)
        .upload(&mut artifact, &target())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), UploadErrorKind::TooLarge);
    assert_eq!(mock.hits_async().await, 0);
}

#[tokio::test]
async fn undecodable_success_body_is_an_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).body("<html>maintenance</html>");
        })
        .await;

    let (_app, mut artifact) = packed_app();
    let err = uploader(&server, u64::MAX)
        .upload(&mut artifact, &target())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), UploadErrorKind::Decode);
}

#[tokio::test]
async fn no_content_response_fails_to_decode() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(204).header("Aperture-Tx-Id", "tx-204");
        })
        .await;

    let (_app, mut artifact) = packed_app();
    let err = uploader(&server, u64::MAX)
        .upload(&mut artifact, &target())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), UploadErrorKind::Decode);
}

#[tokio::test]
async fn same_artifact_can_be_uploaded_twice() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).json_body(serde_json::json!({ "payloadID": "again" }));
        })
        .await;

    let (_app, mut artifact) = packed_app();
    let uploader = uploader(&server, u64::MAX);
    uploader.upload(&mut artifact, &target()).await.unwrap();
    uploader.upload(&mut artifact, &target()).await.unwrap();

    mock.assert_hits_async(2).await;
}
