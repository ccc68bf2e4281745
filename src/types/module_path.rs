// ABOUTME: Validated module path inside the config repository.
// ABOUTME: A relative, forward-slash path such as "nodejs" naming the runtime's subdirectory.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModulePathError {
    #[error("module path cannot be empty")]
    Empty,

    #[error("module path must be relative to the repository root")]
    Absolute,

    #[error("module path cannot contain '.' or '..' segments")]
    Traversal,

    #[error("invalid character in module path: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModulePath(String);

impl ModulePath {
    pub fn new(value: &str) -> Result<Self, ModulePathError> {
        let trimmed = value.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ModulePathError::Empty);
        }

        if trimmed.starts_with('/') {
            return Err(ModulePathError::Absolute);
        }

        for c in trimmed.chars() {
            if c.is_ascii_control() || c == '\\' {
                return Err(ModulePathError::InvalidChar(c));
            }
        }

        if trimmed
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(ModulePathError::Traversal);
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Repository-relative path of a file inside this module.
    pub fn join(&self, file_name: &str) -> String {
        format!("{}/{}", self.0, file_name)
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
