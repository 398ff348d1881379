//! Common utilities for integration tests

pub mod cli;

use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// A complete outline document with some content
pub fn sample_document() -> Value {
    let mut document = plotsave_core::empty_document();
    document["cards"] = json!([{ "id": 1, "title": "Opening" }]);
    document["file"] = json!({ "fileName": "novel.pltr", "version": "2024.3.1" });
    document
}

/// Write `value` as JSON to `dir/name`
pub fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    path
}
