// ABOUTME: Read-only view of section.config.json in the config repository.
// ABOUTME: Maps a module path to the image/version in the proxy chain for operator output.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::types::ModulePath;

/// Default location of the proxy chain file, relative to the repository root.
pub const SECTION_CONFIG_PATH: &str = "section.config.json";

#[derive(Debug, Clone, Deserialize)]
pub struct SectionConfig {
    #[serde(default)]
    pub proxychain: Vec<ProxyChainEntry>,
}

/// One module in the platform's proxy chain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProxyChainEntry {
    pub name: String,
    pub image: String,
}

impl SectionConfig {
    pub fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Image of the proxy chain entry named after `module`. Later entries win.
    pub fn image_for(&self, module: &ModulePath) -> Option<&str> {
        self.proxychain
            .iter()
            .rev()
            .find(|entry| entry.name == module.as_str())
            .map(|entry| entry.image.as_str())
    }
}

/// The image a deployment is layered onto, as far as the repository says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleImage {
    Known(String),
    Unknown { reason: String },
}

impl ModuleImage {
    pub fn unknown(reason: impl Into<String>) -> Self {
        ModuleImage::Unknown {
            reason: reason.into(),
        }
    }
}

/// Serialized as the image string, or `null` when unknown.
impl Serialize for ModuleImage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ModuleImage::Known(image) => serializer.serialize_some(image),
            ModuleImage::Unknown { .. } => serializer.serialize_none(),
        }
    }
}

impl fmt::Display for ModuleImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleImage::Known(image) => f.write_str(image),
            ModuleImage::Unknown { .. } => f.write_str("unknown"),
        }
    }
}
