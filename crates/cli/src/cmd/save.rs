//! One-shot durable save

use crate::system_config;
use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use plotsave_core::{Snapshot, SystemKeys};
use std::path::Path;
use writer::DurableWriter;

/// Validate `from` and write it to `target` through the durable writer
pub async fn run(target: &Path, from: &Path) -> Result<()> {
    let config = system_config::load()?;
    let document = Snapshot::new(util::read_json(from)?);

    let writer = DurableWriter::new(config.writer_config());
    writer
        .save_document(target, &document.persistable(&SystemKeys::default()))
        .await
        .with_context(|| format!("Failed to save {}", target.display()))?;

    println!("{} Saved {}", "✓".green(), target.display().cyan());
    Ok(())
}
