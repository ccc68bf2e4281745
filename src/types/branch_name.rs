// ABOUTME: Git branch name validation for deployment environments.
// ABOUTME: Each environment (Production, staging, ...) is a branch of the config repository.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BranchNameError {
    #[error("environment name cannot be empty")]
    Empty,

    #[error("environment name cannot start with '-' or '/'")]
    InvalidStart,

    #[error("environment name cannot end with '/', '.' or '.lock'")]
    InvalidEnd,

    #[error("environment name cannot contain '..' or '//'")]
    InvalidSequence,

    #[error("invalid character in environment name: '{0}'")]
    InvalidChar(char),
}

/// A branch of the application's config repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchName(String);

impl BranchName {
    pub fn new(value: &str) -> Result<Self, BranchNameError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(BranchNameError::Empty);
        }

        if value.starts_with('-') || value.starts_with('/') {
            return Err(BranchNameError::InvalidStart);
        }

        if value.ends_with('/') || value.ends_with('.') || value.ends_with(".lock") {
            return Err(BranchNameError::InvalidEnd);
        }

        if value.contains("..") || value.contains("//") || value.contains("@{") {
            return Err(BranchNameError::InvalidSequence);
        }

        for c in value.chars() {
            if c.is_ascii_control() || matches!(c, ' ' | '~' | '^' | ':' | '?' | '*' | '[' | '\\')
            {
                return Err(BranchNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fully qualified reference, e.g. `refs/heads/Production`.
    pub fn reference(&self) -> String {
        format!("refs/heads/{}", self.0)
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
