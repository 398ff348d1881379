//! One-shot save and verification

use crate::common::{sample_document, write_json};
use crate::ps;
use anyhow::Result;
use serde_json::{json, Value};
use tempfile::TempDir;

#[test]
fn test_save_then_verify() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let dir = temp_dir.path();
    let source = write_json(dir, "draft.json", &sample_document());
    let target = dir.join("novel.pltr");

    let result = ps!(
        dir,
        "save",
        target.to_str().unwrap(),
        "--from",
        source.to_str().unwrap()
    )
    .assert_success()?;
    assert!(result.contains_stdout("Saved"));

    let saved: Value = serde_json::from_slice(&std::fs::read(&target)?)?;
    assert_eq!(saved, sample_document());

    let result = ps!(dir, "verify", target.to_str().unwrap()).assert_success()?;
    assert!(result.contains_stdout("is complete"));
    Ok(())
}

#[test]
fn test_save_strips_system_keys() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let dir = temp_dir.path();
    let mut document = sample_document();
    document["client"] = json!({ "id": "abc" });
    document["notifications"] = json!([]);
    let source = write_json(dir, "draft.json", &document);
    let target = dir.join("novel.pltr");

    ps!(
        dir,
        "save",
        target.to_str().unwrap(),
        "--from",
        source.to_str().unwrap()
    )
    .assert_success()?;

    let saved: Value = serde_json::from_slice(&std::fs::read(&target)?)?;
    assert!(saved.get("client").is_none());
    assert!(saved.get("notifications").is_none());
    assert_eq!(saved["cards"], document["cards"]);
    Ok(())
}

#[test]
fn test_save_refuses_incomplete_document() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let dir = temp_dir.path();
    let mut document = sample_document();
    document.as_object_mut().unwrap().remove("beats");
    let source = write_json(dir, "draft.json", &document);
    let target = dir.join("novel.pltr");
    std::fs::write(&target, "previous contents")?;

    let result = ps!(
        dir,
        "save",
        target.to_str().unwrap(),
        "--from",
        source.to_str().unwrap()
    )
    .assert_failure()?;
    assert!(result.contains_stderr("beats"));

    // The existing file is left alone
    assert_eq!(std::fs::read_to_string(&target)?, "previous contents");
    Ok(())
}

#[test]
fn test_save_refuses_backup_directory() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let dir = temp_dir.path();
    let backups = dir.join("backups");
    std::fs::create_dir_all(&backups)?;
    ps!(dir, "config", "set", "backup.dir", backups.to_str().unwrap()).assert_success()?;

    let source = write_json(dir, "draft.json", &sample_document());
    let target = backups.join("novel.pltr");

    let result = ps!(
        dir,
        "save",
        target.to_str().unwrap(),
        "--from",
        source.to_str().unwrap()
    )
    .assert_failure()?;
    assert!(result.contains_stderr("backup"));
    assert!(!target.exists());
    Ok(())
}

#[test]
fn test_save_rejects_invalid_source() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let dir = temp_dir.path();
    let source = dir.join("draft.json");
    std::fs::write(&source, "{ \"cards\": ")?;
    let target = dir.join("novel.pltr");

    let result = ps!(
        dir,
        "save",
        target.to_str().unwrap(),
        "--from",
        source.to_str().unwrap()
    )
    .assert_failure()?;
    assert!(result.contains_stderr("is not valid JSON"));
    assert!(!target.exists());
    Ok(())
}

#[test]
fn test_verify_reports_missing_keys() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let dir = temp_dir.path();
    let path = write_json(dir, "novel.pltr", &json!({ "file": {}, "cards": [] }));

    let result = ps!(dir, "verify", path.to_str().unwrap()).assert_failure()?;
    assert!(result.contains_stdout("missing"));
    assert!(result.contains_stdout("hierarchyLevels"));
    Ok(())
}
