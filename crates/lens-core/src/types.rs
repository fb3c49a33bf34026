//! Validated identifier types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum accepted session ID length (exclusive bound is 256).
pub const MAX_SESSION_ID_LEN: usize = 255;

/// Validation errors for session identifiers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided identifier was empty.
    #[error("session id cannot be empty")]
    Empty,

    /// The identifier exceeded the maximum length.
    #[error("session id exceeds {MAX_SESSION_ID_LEN} characters")]
    TooLong,

    /// The identifier contained characters outside the allowed set.
    #[error("session id may only contain [A-Za-z0-9_-]")]
    InvalidCharacter,
}

/// A validated session identifier, safe to use as a path component.
///
/// Session IDs become filesystem paths, so the grammar is deliberately
/// restrictive: `[A-Za-z0-9_-]+`, shorter than 256 characters. Anything
/// else (dots, slashes, whitespace) is rejected before any path is built,
/// which is how path traversal is prevented.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Creates a new session ID after validation.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::Empty);
        }
        if id.len() > MAX_SESSION_ID_LEN {
            return Err(ValidationError::TooLong);
        }
        if !id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            return Err(ValidationError::InvalidCharacter);
        }
        Ok(Self(id))
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl std::str::FromStr for SessionId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
