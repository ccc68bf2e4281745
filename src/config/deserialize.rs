// ABOUTME: Lenient serde deserializers for hand-edited JSON.
// ABOUTME: Bad or empty values become None instead of failing the whole document.

use serde::{Deserialize, Deserializer};

use crate::types::Id;

/// An id given as `42` or `"42"`; anything else (including `""` and `0`) is `None`.
pub fn lenient_id<'de, D, T>(deserializer: D) -> Result<Option<Id<T>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| Id::<T>::deserialize(v).ok()))
}

/// A string that counts as unset when blank or of the wrong type.
pub fn non_blank<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}
