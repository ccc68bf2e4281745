// ABOUTME: Deploy defaults read from the "section" block of an app's package.json.
// ABOUTME: Fill in account, app, environment and module when not given on the command line.

use std::path::Path;

use serde::Deserialize;

use super::deserialize::{lenient_id, non_blank};
use crate::types::{AccountId, AppId};

pub const PACKAGE_JSON: &str = "package.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PackageJsonDefaults {
    #[serde(default, rename = "accountId", deserialize_with = "lenient_id")]
    pub account_id: Option<AccountId>,

    #[serde(default, rename = "appId", deserialize_with = "lenient_id")]
    pub app_id: Option<AppId>,

    #[serde(default, deserialize_with = "non_blank")]
    pub environment: Option<String>,

    #[serde(default, rename = "module-name", deserialize_with = "non_blank")]
    pub module_name: Option<String>,
}

#[derive(Deserialize)]
struct PackageJson {
    #[serde(default)]
    section: Option<PackageJsonDefaults>,
}

impl PackageJsonDefaults {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let parsed: PackageJson = serde_json::from_str(json)?;
        Ok(parsed.section.unwrap_or_default())
    }

    /// Defaults from `dir/package.json`.
    ///
    /// A missing or unparsable file yields no defaults; validation reports
    /// the missing file separately.
    pub fn discover(dir: &Path) -> Self {
        let path = dir.join(PACKAGE_JSON);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("No defaults from {}: {}", path.display(), e);
                return Self::default();
            }
        };
        match Self::from_json(&content) {
            Ok(defaults) => defaults,
            Err(e) => {
                tracing::info!("Error parsing {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}
