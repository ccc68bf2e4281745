// ABOUTME: Opaque identifier of an uploaded artifact.
// ABOUTME: Returned by the upload service and written into the external source descriptor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-side reference to a stored artifact. Carries no structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadId(String);

impl PayloadId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PayloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
