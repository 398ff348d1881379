//! Config file management

use crate::ps;
use anyhow::Result;
use tempfile::TempDir;

#[test]
fn test_set_then_get() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let dir = temp_dir.path();

    let result = ps!(dir, "config", "get", "saver.save_interval_ms").assert_success()?;
    assert_eq!(result.stdout.trim(), "10000");

    ps!(dir, "config", "set", "saver.save_interval_ms", "2500").assert_success()?;
    let result = ps!(dir, "config", "get", "saver.save_interval_ms").assert_success()?;
    assert_eq!(result.stdout.trim(), "2500");

    let text = std::fs::read_to_string(dir.join("config.toml"))?;
    assert!(text.contains("save_interval_ms = 2500"));
    Ok(())
}

#[test]
fn test_set_rejects_out_of_range() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let dir = temp_dir.path();

    ps!(dir, "config", "set", "writer.max_attempts", "0").assert_failure()?;
    ps!(dir, "config", "set", "no.such_key", "1").assert_failure()?;
    assert!(!dir.join("config.toml").exists());
    Ok(())
}

#[test]
fn test_path_create_and_list() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let dir = temp_dir.path();

    let result = ps!(dir, "config", "path").assert_success()?;
    assert!(result.contains_stdout("File does not exist"));

    ps!(dir, "config", "path", "--create").assert_success()?;
    assert!(dir.join("config.toml").exists());

    let result = ps!(dir, "config", "list").assert_success()?;
    assert!(result.contains_stdout("retry_delay_ms"));
    assert!(result.contains_stdout("retention_days"));
    Ok(())
}

#[test]
fn test_example_is_printed() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let result = ps!(temp_dir.path(), "config", "example").assert_success()?;
    assert!(result.contains_stdout("[writer]"));
    assert!(result.contains_stdout("max_attempts = 10"));
    Ok(())
}
