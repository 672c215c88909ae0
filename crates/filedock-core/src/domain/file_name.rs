//! Sanitized file names
//!
//! Every name that reaches the storage root passes through [`FileName::sanitize`],
//! which keeps only ASCII word characters, whitespace, `.` and `-`. Path
//! separators never survive, so a client-supplied name can only ever address
//! an entry directly inside the root.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::errors::StorageError;

/// A file name that is safe to join onto the storage root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileName(String);

impl FileName {
    /// Strips every character outside `[A-Za-z0-9_]`, whitespace, `.` and `-`.
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidName`] when nothing addressable is left:
    /// the empty string, `.` or `..`.
    pub fn sanitize(raw: &str) -> Result<Self, StorageError> {
        let cleaned: String = raw.chars().filter(|c| is_allowed(*c)).collect();

        if cleaned.trim().is_empty() || cleaned == "." || cleaned == ".." {
            return Err(StorageError::InvalidName(raw.to_string()));
        }

        Ok(Self(cleaned))
    }

    /// Accepts `raw` only if sanitizing it is a no-op.
    ///
    /// Used for names read back from the directory: entries that were not
    /// created through [`FileName::sanitize`] cannot be addressed by clients
    /// and are ignored.
    pub fn from_existing(raw: &str) -> Option<Self> {
        match Self::sanitize(raw) {
            Ok(name) if name.0 == raw => Some(name),
            _ => None,
        }
    }

    /// The sanitized name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-cased extension including the leading dot, e.g. `".png"`.
    ///
    /// A leading dot alone (`.bashrc`) is not an extension.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        let idx = self.0.rfind('.')?;
        if idx == 0 || idx + 1 == self.0.len() {
            return None;
        }
        Some(self.0[idx..].to_ascii_lowercase())
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' || c.is_whitespace()
}

impl Display for FileName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FileName {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::sanitize(&value)
    }
}

impl From<FileName> for String {
    fn from(name: FileName) -> Self {
        name.0
    }
}
