//! Validated Git commit identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Length of a full SHA-1 object name.
pub const SHA_LENGTH: usize = 40;

/// Number of characters in the abbreviated form returned by [`GitSha::short`].
pub const SHORT_LENGTH: usize = 7;

/// A full 40-character hexadecimal Git object name.
///
/// Construction is the only place the format is checked, so every `GitSha`
/// in the program is known to be well formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GitSha(String);

impl GitSha {
    /// Validates `value` and wraps it, failing with `Error::InvalidSha`.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.len() == SHA_LENGTH && value.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidSha { value })
        }
    }

    /// The abbreviated form.
    pub fn short(&self) -> &str {
        &self.0[..SHORT_LENGTH]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GitSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GitSha {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for GitSha {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<GitSha> for String {
    fn from(sha: GitSha) -> Self {
        sha.0
    }
}

impl AsRef<str> for GitSha {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
