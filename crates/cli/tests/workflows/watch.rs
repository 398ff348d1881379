//! Foreground autosave loop

#![cfg(unix)]

use crate::common::{sample_document, write_json};
use crate::ps;
use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::path::Path;
use std::process::{Child, Command};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Poll `path` until it holds `expected`
fn wait_for_json(path: &Path, expected: &Value) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        let current = std::fs::read(path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok());
        if current.as_ref() == Some(expected) {
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    anyhow::bail!("{} never held the expected document", path.display())
}

fn interrupt(child: &Child) -> Result<()> {
    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .context("Failed to run kill")?;
    anyhow::ensure!(status.success(), "kill -INT failed");
    Ok(())
}

fn backup_files(root: &Path) -> usize {
    let Ok(days) = std::fs::read_dir(root) else {
        return 0;
    };
    days.filter_map(|day| std::fs::read_dir(day.ok()?.path()).ok())
        .map(|files| files.count())
        .sum()
}

#[test]
fn test_watch_saves_edits_and_stops_cleanly() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let dir = temp_dir.path();
    let source = write_json(dir, "live.json", &sample_document());
    let target = dir.join("novel.pltr");
    let backups = dir.join("backups");

    let mut child = ps!(
        dir,
        "watch",
        "--source",
        source.to_str().unwrap(),
        "--target",
        target.to_str().unwrap(),
        "--backup-dir",
        backups.to_str().unwrap(),
        "--save-interval-ms",
        "100",
        "--backup-interval-ms",
        "100"
    )
    .spawn()?;

    let run = (|| -> Result<()> {
        wait_for_json(&target, &sample_document())?;

        let mut edited = sample_document();
        edited["cards"] = json!([
            { "id": 1, "title": "Opening" },
            { "id": 2, "title": "Midpoint" }
        ]);
        write_json(dir, "live.json", &edited);
        wait_for_json(&target, &edited)?;

        interrupt(&child)
    })();
    if run.is_err() {
        let _ = child.kill();
    }
    run?;

    let output = child.wait_with_output()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "watch failed:\n{}\n{}",
        stdout,
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("Stopped after"));
    assert!(backup_files(&backups) >= 1);

    let result = ps!(dir, "verify", target.to_str().unwrap()).assert_success()?;
    assert!(result.contains_stdout("is complete"));
    Ok(())
}
