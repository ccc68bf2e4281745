// ABOUTME: Phantom-typed numeric identifiers for platform resources.
// ABOUTME: Prevents accidental swapping of account and application IDs.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;
use thiserror::Error;

/// Marker types for phantom type parameters.
/// Using empty enums prevents instantiation and requires no trait bounds.
pub enum AccountMarker {}
pub enum AppMarker {}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseIdError {
    #[error("identifier cannot be empty")]
    Empty,

    #[error("identifier must be a positive integer, got '{0}'")]
    NotNumeric(String),

    #[error("identifier must be greater than zero")]
    Zero,
}

/// A type-safe numeric identifier for a resource on the platform.
///
/// `AccountId` and `AppId` are both plain integers on the wire, so the
/// phantom marker is what stops one being passed where the other belongs.
#[must_use = "IDs reference resources and should not be ignored"]
pub struct Id<T> {
    value: u64,
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new(value: u64) -> Result<Self, ParseIdError> {
        if value == 0 {
            return Err(ParseIdError::Zero);
        }
        Ok(Self {
            value,
            _marker: PhantomData,
        })
    }

    pub fn get(&self) -> u64 {
        self.value
    }
}

impl<T> FromStr for Id<T> {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseIdError::Empty);
        }
        let value = s
            .parse::<u64>()
            .map_err(|_| ParseIdError::NotNumeric(s.to_string()))?;
        Self::new(value)
    }
}

// Manual trait implementations that don't require T to implement the trait.

impl<T> std::fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Id").field(&self.value).finish()
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> std::fmt::Display for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

/// Accepts both `42` and `"42"`, since package.json files in the wild carry either.
impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Self::new(n).map_err(serde::de::Error::custom),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

pub type AccountId = Id<AccountMarker>;
pub type AppId = Id<AppMarker>;
