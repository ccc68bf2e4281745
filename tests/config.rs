// ABOUTME: Integration tests for configuration parsing and validation.
// ABOUTME: Tests YAML parsing, token sources and package.json deploy defaults.

use std::time::Duration;

use sectionctl::config::*;
use sectionctl::platform::{PlatformError, TokenSource};

mod parsing {
    use super::*;

    #[test]
    fn parse_full_config() {
        let yaml = r#"
api_url: https://aperture.example.com
upload_url: https://upload.example.com/v1/upload
git_url: https://git.example.com
token:
  env: SECTIONCTL_IT_TOKEN
api_timeout: 10s
upload_timeout: 15m
git_timeout: 2m
max_artifact_size: 52428800
descriptor_filename: external.json
section_config_path: config/section.config.json
exclude:
  - .git
  - coverage
commit_author:
  name: ci-bot
  email: ci@example.com
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.api_url, "https://aperture.example.com");
        assert_eq!(config.git_base_url(), "https://git.example.com");
        assert_eq!(config.api_timeout, Duration::from_secs(10));
        assert_eq!(config.upload_timeout, Duration::from_secs(900));
        assert_eq!(config.git_timeout, Duration::from_secs(120));
        assert_eq!(config.max_artifact_size, 50 * 1024 * 1024);
        assert_eq!(config.descriptor_filename, "external.json");
        assert_eq!(config.section_config_path, "config/section.config.json");
        assert_eq!(config.exclude, vec![".git", "coverage"]);
        assert_eq!(config.commit_author.name, "ci-bot");
        assert_eq!(
            config.token,
            Some(Secret::FromEnv {
                var: "SECTIONCTL_IT_TOKEN".to_string(),
                default: None,
            })
        );
    }

    #[test]
    fn partial_author_keeps_default_email() {
        let config = Config::from_yaml("commit_author:\n  name: release\n").unwrap();
        assert_eq!(config.commit_author.name, "release");
        assert_eq!(config.commit_author.email, "noreply@section.io");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = Config::from_yaml("git_timeout: 0s").unwrap_err();
        assert!(err.to_string().contains("git_timeout"), "{err}");
    }

    #[test]
    fn malformed_duration_is_rejected() {
        assert!(Config::from_yaml("upload_timeout: soon").is_err());
    }

    #[test]
    fn load_reads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.yml");
        std::fs::write(&path, "upload_url: http://127.0.0.1:9/upload\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.upload_url, "http://127.0.0.1:9/upload");
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(&dir.path().join("absent.yml")).is_err());
    }
}

mod token {
    use super::*;

    #[test]
    fn literal_token() {
        let config = Config::from_yaml("token: abc").unwrap();
        assert_eq!(config.token.auth_token().unwrap(), "abc");
    }

    #[test]
    fn token_from_environment() {
        let config = Config::from_yaml("token:\n  env: SECTIONCTL_IT_TOKEN\n").unwrap();
        temp_env::with_var("SECTIONCTL_IT_TOKEN", Some("from-env"), || {
            assert_eq!(config.token.auth_token().unwrap(), "from-env");
        });
    }

    #[test]
    fn unset_variable_without_default_is_missing_token() {
        let config = Config::from_yaml("token:\n  env: SECTIONCTL_IT_UNSET\n").unwrap();
        temp_env::with_var_unset("SECTIONCTL_IT_UNSET", || {
            assert!(matches!(
                config.token.auth_token(),
                Err(PlatformError::MissingToken)
            ));
        });
    }

    #[test]
    fn no_token_configured() {
        let config = Config::default();
        let err = config.token.auth_token().unwrap_err();
        assert!(err.is_auth());
    }
}

mod package_json {
    use super::*;

    #[test]
    fn reads_section_block() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PACKAGE_JSON),
            r#"{
  "name": "storefront",
  "section": {
    "accountId": "1887",
    "appId": 7749,
    "environment": "Staging",
    "module-name": "frontend"
  }
}"#,
        )
        .unwrap();

        let defaults = PackageJsonDefaults::discover(dir.path());
        assert_eq!(defaults.account_id.map(|id| id.get()), Some(1887));
        assert_eq!(defaults.app_id.map(|id| id.get()), Some(7749));
        assert_eq!(defaults.environment.as_deref(), Some("Staging"));
        assert_eq!(defaults.module_name.as_deref(), Some("frontend"));
    }

    #[test]
    fn unreadable_package_json_gives_no_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PACKAGE_JSON), "{ not json").unwrap();

        let defaults = PackageJsonDefaults::discover(dir.path());
        assert!(defaults.account_id.is_none());
        assert!(defaults.module_name.is_none());
    }
}
