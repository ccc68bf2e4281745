// ABOUTME: Integration tests for the sectionctl CLI commands.
// ABOUTME: Validates --help output, the validate command and a full deploy through the binary.

mod support;

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use httpmock::prelude::*;
use predicates::prelude::*;

fn sectionctl_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("sectionctl"));
    cmd.env_remove("SECTION_TOKEN")
        .env_remove("SECTION_CI")
        .env_remove("DEBUG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_shows_commands() {
    sectionctl_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn deploy_help_lists_flags() {
    sectionctl_cmd()
        .args(["deploy", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--account-id"))
        .stdout(predicate::str::contains("--app-path"))
        .stdout(predicate::str::contains("--skip-validation"));
}

mod validate {
    use super::*;

    #[test]
    fn accepts_node_app() {
        let app = support::node_app();
        sectionctl_cmd()
            .args(["validate", "-C"])
            .arg(app.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("is a valid Node.js app"));
    }

    #[test]
    fn lists_every_problem() {
        let dir = tempfile::tempdir().unwrap();
        sectionctl_cmd()
            .current_dir(dir.path())
            .arg("validate")
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("package.json is not a file"))
            .stderr(predicate::str::contains("node_modules is not a directory"));
    }
}

mod deploy {
    use super::*;

    fn write_config(dir: &Path, server: &MockServer, remote: &support::ConfigRemote) {
        fs::write(
            dir.join("sectionctl.yml"),
            format!(
                "api_url: {}\nupload_url: {}\ngit_url: {}\n",
                server.base_url(),
                server.url("/upload"),
                remote.base_url()
            ),
        )
        .unwrap();
    }

    #[test]
    fn fails_without_token() {
        let app = support::node_app();
        sectionctl_cmd()
            .current_dir(app.path())
            .arg("deploy")
            .assert()
            .failure()
            .stderr(predicate::str::contains("no API token"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let app = support::node_app();
        sectionctl_cmd()
            .current_dir(app.path())
            .args(["deploy", "--token", "s3cr3t", "--timeout", "0s"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("timeout must be non-zero"));
    }

    #[test]
    fn rejects_unknown_config_keys() {
        let app = support::node_app();
        fs::write(app.path().join("sectionctl.yml"), "uplod_url: x\n").unwrap();
        sectionctl_cmd()
            .current_dir(app.path())
            .args(["deploy", "--token", "s3cr3t"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("uplod_url"));
    }

    #[test]
    fn quiet_deploy_prints_payload_id() {
        let server = MockServer::start();
        let remote = support::ConfigRemote::new();
        let upload = server.mock(|when, then| {
            when.method(POST)
                .path("/upload")
                .header("section-token", "s3cr3t");
            then.status(200)
                .json_body(serde_json::json!({ "payloadID": "cli-payload" }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/account/1887/application/7749");
            then.status(200)
                .json_body(serde_json::json!({ "application_name": support::APP_NAME }));
        });

        // Account and app come from package.json.
        let app = support::node_app();
        let work = tempfile::tempdir().unwrap();
        write_config(work.path(), &server, &remote);

        sectionctl_cmd()
            .current_dir(work.path())
            .env("SECTION_TOKEN", "s3cr3t")
            .args(["deploy", "-q", "-C"])
            .arg(app.path())
            .assert()
            .success()
            .stdout("cli-payload\n");

        upload.assert();
        assert!(remote.descriptor_at_head().unwrap().contains("cli-payload"));
    }

    #[test]
    fn json_deploy_reports_commit() {
        let server = MockServer::start();
        let remote = support::ConfigRemote::new();
        server.mock(|when, then| {
            when.method(POST).path("/upload");
            then.status(200)
                .json_body(serde_json::json!({ "payloadID": "json-payload" }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/account/1887/application/7749");
            then.status(200)
                .json_body(serde_json::json!({ "application_name": support::APP_NAME }));
        });
        let app = support::node_app();
        write_config(app.path(), &server, &remote);

        let output = sectionctl_cmd()
            .current_dir(app.path())
            .args(["deploy", "--json", "--token", "s3cr3t", "-a", "1887", "-i", "7749"])
            .output()
            .unwrap();

        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        let stdout = String::from_utf8(output.stdout).unwrap();
        let event: serde_json::Value = serde_json::from_str(stdout.lines().last().unwrap()).unwrap();
        assert_eq!(event["event"], "deployed");
        assert_eq!(event["payload_id"], "json-payload");
        assert_eq!(event["previous_payload_id"], support::OLD_PAYLOAD);
        assert_eq!(event["commit"], remote.head().to_string());
        assert_eq!(event["module_image"], support::IMAGE);
    }

    #[test]
    fn missing_ids_name_both_sources() {
        let app = tempfile::tempdir().unwrap();
        fs::write(app.path().join("package.json"), "{}").unwrap();
        fs::create_dir(app.path().join("node_modules")).unwrap();
        sectionctl_cmd()
            .current_dir(app.path())
            .args(["deploy", "--token", "s3cr3t"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("missing account ID"));
    }
}
