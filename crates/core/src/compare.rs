//! Structural change detection between snapshots
//!
//! Two snapshots are equal when every non-system top-level key holds a
//! deeply equal value. Object key order never matters.

use crate::keys::SystemKeys;
use crate::snapshot::Snapshot;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Compares snapshots while ignoring volatile keys
#[derive(Debug, Clone, Default)]
pub struct StateComparator {
    system_keys: SystemKeys,
}

impl StateComparator {
    /// Create a comparator with the given ignore set
    pub fn new(system_keys: SystemKeys) -> Self {
        Self { system_keys }
    }

    pub fn system_keys(&self) -> &SystemKeys {
        &self.system_keys
    }

    /// Check whether `current` carries nothing new relative to `previous`
    ///
    /// A missing previous snapshot always counts as changed.
    pub fn unchanged(&self, previous: Option<&Snapshot>, current: &Snapshot) -> bool {
        let Some(previous) = previous else {
            return false;
        };
        if previous.ptr_eq(current) {
            return true;
        }

        match (previous.value(), current.value()) {
            (Value::Object(a), Value::Object(b)) => self.diff_keys(a, b).next().is_none(),
            (a, b) => a == b,
        }
    }

    /// List the content keys that differ, sorted
    ///
    /// Non-object snapshots that differ report a single empty key.
    pub fn changed_keys(&self, previous: Option<&Snapshot>, current: &Snapshot) -> Vec<String> {
        let empty = Map::new();
        let prev_value = previous.map(Snapshot::value);

        match (prev_value, current.value()) {
            (Some(Value::Object(a)), Value::Object(b)) => {
                self.diff_keys(a, b).map(str::to_owned).collect()
            }
            (None, Value::Object(b)) => self.diff_keys(&empty, b).map(str::to_owned).collect(),
            (Some(a), b) if a == b => Vec::new(),
            _ => vec![String::new()],
        }
    }

    fn diff_keys<'a>(
        &'a self,
        a: &'a Map<String, Value>,
        b: &'a Map<String, Value>,
    ) -> impl Iterator<Item = &'a str> + 'a {
        let keys: BTreeSet<&str> = a
            .keys()
            .chain(b.keys())
            .map(String::as_str)
            .filter(|key| !self.system_keys.contains(key))
            .collect();

        keys.into_iter().filter(move |key| a.get(*key) != b.get(*key))
    }
}
