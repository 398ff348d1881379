//! Check a saved document

use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;
use plotsave_core::{RequiredKeys, SystemKeys};
use std::path::Path;

pub async fn run(path: &Path) -> Result<()> {
    let document = util::read_json(path)?;

    let missing = RequiredKeys::default().missing(&document);
    if !missing.is_empty() {
        println!("{} {}", "✗".red(), path.display());
        for key in &missing {
            println!("  {} {}", "missing".red(), key);
        }
        anyhow::bail!("{} is missing {} required keys", path.display(), missing.len());
    }

    // Volatile keys should never reach disk
    let system_keys = SystemKeys::default();
    if let Some(object) = document.as_object() {
        for key in object.keys().filter(|key| system_keys.contains(key)) {
            println!("  {} system key {} was persisted", "warning".yellow(), key);
        }
    }

    println!("{} {} is complete", "✓".green(), path.display().cyan());
    Ok(())
}
