//! Backup listing and pruning

use crate::ps;
use anyhow::Result;
use tempfile::TempDir;

#[test]
fn test_list_and_prune() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let dir = temp_dir.path();
    let backups = dir.join("backups");
    for day in ["2001_01_01", "2001_01_02"] {
        std::fs::create_dir_all(backups.join(day))?;
        std::fs::write(backups.join(day).join("novel.pltr"), "{}")?;
    }
    std::fs::create_dir_all(backups.join("keep-me"))?;
    let root = backups.to_str().unwrap();

    let result = ps!(dir, "backups", "list", "--dir", root).assert_success()?;
    let newest = result.stdout.find("2001-01-02").unwrap();
    let oldest = result.stdout.find("2001-01-01").unwrap();
    assert!(newest < oldest);
    assert!(result.contains_stdout("novel.pltr"));

    ps!(dir, "backups", "prune", "--dir", root, "--days", "30").assert_success()?;
    assert!(!backups.join("2001_01_01").exists());
    assert!(!backups.join("2001_01_02").exists());
    assert!(backups.join("keep-me").exists());
    Ok(())
}

#[test]
fn test_prune_with_zero_retention_keeps_everything() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let dir = temp_dir.path();
    let backups = dir.join("backups");
    std::fs::create_dir_all(backups.join("2001_01_01"))?;

    let result = ps!(
        dir,
        "backups",
        "prune",
        "--dir",
        backups.to_str().unwrap(),
        "--days",
        "0"
    )
    .assert_success()?;
    assert!(result.contains_stdout("nothing to prune"));
    assert!(backups.join("2001_01_01").exists());
    Ok(())
}

#[test]
fn test_list_empty_root() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let dir = temp_dir.path();
    let missing = dir.join("nowhere");

    let result =
        ps!(dir, "backups", "list", "--dir", missing.to_str().unwrap()).assert_success()?;
    assert!(result.contains_stdout("No backups yet"));
    Ok(())
}
