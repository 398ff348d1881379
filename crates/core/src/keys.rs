//! Volatile system keys
//!
//! Top-level document keys that hold session or UI state rather than
//! outline content. They are skipped by change detection and stripped
//! before a document is written to disk.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Keys the outlining application keeps in memory only
const DEFAULT_SYSTEM_KEYS: &[&str] = &[
    "error",
    "permission",
    "project",
    "client",
    "notifications",
    "imageCache",
    "settings",
    "backups",
    "license",
    "knownFiles",
    "templates",
    "applicationSettings",
    "domainEvents",
];

/// Set of top-level keys ignored by comparison and persistence
///
/// `file` is deliberately absent: it holds durable file metadata and is
/// compared by deep equality like any other content key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemKeys {
    keys: BTreeSet<String>,
}

impl SystemKeys {
    /// Build a key set from arbitrary names
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// A key set that ignores nothing
    pub fn none() -> Self {
        Self {
            keys: BTreeSet::new(),
        }
    }

    /// Check whether a top-level key is volatile
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Iterate over the keys in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for SystemKeys {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_KEYS.iter().copied())
    }
}
