// ABOUTME: Configuration types and parsing for sectionctl.yml.
// ABOUTME: Endpoints, timeouts, size ceiling and repository layout, all with defaults.

mod deserialize;
mod package_json;
mod secret;

pub use package_json::{PACKAGE_JSON, PackageJsonDefaults};
pub use secret::Secret;

use crate::error::{Error, Result};
use crate::repo::{CommitAuthor, DESCRIPTOR_FILENAME, SECTION_CONFIG_PATH};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "sectionctl.yml";
pub const CONFIG_FILENAME_ALT: &str = "sectionctl.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".sectionctl/config.yml";

pub const DEFAULT_API_URL: &str = "https://aperture.section.io";
pub const DEFAULT_UPLOAD_URL: &str = "https://aperture.section.io/new/code_upload/v1/upload";

/// Largest artifact the upload service accepts.
pub const MAX_ARTIFACT_SIZE: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_upload_url")]
    pub upload_url: String,

    /// Base of the config repository remotes. Falls back to `api_url`.
    #[serde(default)]
    pub git_url: Option<String>,

    #[serde(default)]
    pub token: Option<Secret>,

    #[serde(default = "default_api_timeout", with = "humantime_serde")]
    pub api_timeout: Duration,

    #[serde(default = "default_upload_timeout", with = "humantime_serde")]
    pub upload_timeout: Duration,

    #[serde(default = "default_git_timeout", with = "humantime_serde")]
    pub git_timeout: Duration,

    #[serde(default = "default_max_artifact_size")]
    pub max_artifact_size: u64,

    #[serde(default = "default_descriptor_filename")]
    pub descriptor_filename: String,

    #[serde(default = "default_section_config_path")]
    pub section_config_path: String,

    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub commit_author: CommitAuthor,

    /// Where temporary archives and checkouts go. System temp dir when unset.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_upload_url() -> String {
    DEFAULT_UPLOAD_URL.to_string()
}

fn default_api_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_upload_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_git_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_max_artifact_size() -> u64 {
    MAX_ARTIFACT_SIZE
}

fn default_descriptor_filename() -> String {
    DESCRIPTOR_FILENAME.to_string()
}

fn default_section_config_path() -> String {
    SECTION_CONFIG_PATH.to_string()
}

fn default_exclude() -> Vec<String> {
    vec![".lint".to_string(), ".git".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: default_api_url(),
            upload_url: default_upload_url(),
            git_url: None,
            token: None,
            api_timeout: default_api_timeout(),
            upload_timeout: default_upload_timeout(),
            git_timeout: default_git_timeout(),
            max_artifact_size: default_max_artifact_size(),
            descriptor_filename: default_descriptor_filename(),
            section_config_path: default_section_config_path(),
            exclude: default_exclude(),
            commit_author: CommitAuthor::default(),
            temp_dir: None,
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty file is a valid, all-defaults config.
        if yaml.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Self::from_yaml(&content)
    }

    /// First config file found in `dir`, if any.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        [CONFIG_FILENAME, CONFIG_FILENAME_ALT, CONFIG_FILENAME_DIR]
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Load the config file in `dir`, or the defaults when there is none.
    pub fn discover(dir: &Path) -> Result<Self> {
        match Self::find(dir) {
            Some(path) => Self::load(&path),
            None => Ok(Config::default()),
        }
    }

    /// Base URL the config repository remotes hang off.
    pub fn git_base_url(&self) -> &str {
        self.git_url.as_deref().unwrap_or(&self.api_url)
    }

    fn validate(&self) -> Result<()> {
        if self.max_artifact_size == 0 {
            return Err(Error::InvalidConfig(
                "max_artifact_size must be greater than zero".to_string(),
            ));
        }
        for (name, timeout) in [
            ("api_timeout", self.api_timeout),
            ("upload_timeout", self.upload_timeout),
            ("git_timeout", self.git_timeout),
        ] {
            if timeout.is_zero() {
                return Err(Error::InvalidConfig(format!("{name} must be non-zero")));
            }
        }
        if self.descriptor_filename.contains('/') || self.descriptor_filename.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "descriptor_filename must be a plain file name, got '{}'",
                self.descriptor_filename
            )));
        }
        Ok(())
    }
}
