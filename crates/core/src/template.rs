//! Empty-document template and required-key validation

use crate::keys::SystemKeys;
use serde_json::{json, Value};
use std::collections::BTreeSet;

/// Canonical shape of a brand new outline document
pub fn empty_document() -> Value {
    json!({
        "file": {
            "fileName": "",
            "loaded": false,
            "dirty": false,
            "version": "",
        },
        "ui": {},
        "series": { "name": "", "premise": "", "genre": "", "theme": "" },
        "books": { "allIds": [] },
        "beats": {},
        "cards": [],
        "categories": { "characters": [], "places": [], "notes": [], "tags": [] },
        "characters": [],
        "customAttributes": { "characters": [], "places": [], "scenes": [], "lines": [] },
        "lines": [],
        "notes": [],
        "places": [],
        "tags": [],
        "images": {},
        "hierarchyLevels": {},
    })
}

/// Minimal key set every persisted document must contain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredKeys {
    keys: BTreeSet<String>,
}

impl RequiredKeys {
    /// Derive the required keys from a template, minus system keys
    pub fn from_template(template: &Value, system_keys: &SystemKeys) -> Self {
        let keys = template
            .as_object()
            .map(|map| {
                map.keys()
                    .filter(|key| !system_keys.contains(key))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Self { keys }
    }

    /// Keys absent from the payload, sorted
    ///
    /// A payload that is not an object is missing every key.
    pub fn missing(&self, payload: &Value) -> Vec<String> {
        match payload.as_object() {
            Some(map) => self
                .keys
                .iter()
                .filter(|key| !map.contains_key(*key))
                .cloned()
                .collect(),
            None => self.keys.iter().cloned().collect(),
        }
    }

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

impl Default for RequiredKeys {
    fn default() -> Self {
        Self::from_template(&empty_document(), &SystemKeys::default())
    }
}
