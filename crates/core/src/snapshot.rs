//! Immutable document snapshots

use crate::keys::SystemKeys;
use serde_json::Value;
use std::sync::Arc;

/// A point-in-time copy of the application state
///
/// Snapshots are captured on every scheduler tick and never mutated.
/// Cloning is cheap (reference counted), so the scheduler can keep the
/// last persisted snapshot while a newer one is in flight.
#[derive(Debug, Clone)]
pub struct Snapshot {
    value: Arc<Value>,
}

impl Snapshot {
    /// Capture a snapshot from a JSON value
    pub fn new(value: Value) -> Self {
        Self {
            value: Arc::new(value),
        }
    }

    /// Borrow the captured state
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The document as it should be persisted (system keys removed)
    pub fn persistable(&self, system_keys: &SystemKeys) -> Value {
        match self.value.as_ref() {
            Value::Object(map) => Value::Object(
                map.iter()
                    .filter(|(key, _)| !system_keys.contains(key))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Serialize the persistable document
    pub fn to_json_bytes(&self, system_keys: &SystemKeys) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.persistable(system_keys))
    }

    /// Check whether two handles point at the same captured value
    pub fn ptr_eq(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl From<Value> for Snapshot {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
