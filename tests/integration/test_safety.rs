//! Integration tests for aborted releases

use crate::helpers::{TestMod, text};
use anyhow::Result;

#[test]
fn test_version_mismatch_aborts_before_packaging() -> Result<()> {
  let m = TestMod::new("2.0.0", &["2.0.1"])?;

  let output = m.run(&["--skip-test", "--skip-clean"], "y\n")?;
  let (_, stderr) = text(&output);
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr.contains("Version mismatch"));
  assert!(stderr.contains("v2.0.0") && stderr.contains("v2.0.1"));
  assert_eq!(m.output_entries()?, vec!["mymod"]);

  Ok(())
}

#[test]
fn test_missing_metadata() -> Result<()> {
  let m = TestMod::new("1.0.0", &["1.0.0"])?;
  std::fs::remove_file(m.path.join("info.json"))?;

  let output = m.run(&["--skip-test", "--skip-clean"], "y\n")?;
  let (_, stderr) = text(&output);
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr.contains("info.json"));

  Ok(())
}

#[test]
fn test_missing_previous_tag() -> Result<()> {
  let m = TestMod::new("1.1.0", &["1.1.0", "1.0.0"])?;

  let output = m.run(&["--skip-test", "--skip-clean"], "y\n")?;
  let (stdout, stderr) = text(&output);
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr.contains("Previous tag v1.0.0 not found"));
  assert!(!stdout.contains("REMOTE COMMANDS"));

  Ok(())
}

#[test]
fn test_existing_tag() -> Result<()> {
  let m = TestMod::new("1.0.0", &["1.0.0"])?;
  m.tag("v1.0.0")?;

  let output = m.run(&["--skip-test", "--skip-clean"], "y\n")?;
  let (stdout, stderr) = text(&output);
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr.contains("Git tag v1.0.0 already exists"));
  assert!(!stdout.contains("REMOTE COMMANDS"));

  Ok(())
}

#[test]
fn test_missing_archiver() -> Result<()> {
  let m = TestMod::new("1.0.0", &["1.0.0"])?;
  m.remove_tool("7z")?;
  std::fs::write(m.path.join("release.toml"), "[tools]\nbackup = [\"no-such-7z\", \"no-such-7za\"]\n")?;

  let output = m.run(&["--skip-test", "--skip-clean"], "y\n")?;
  let (_, stderr) = text(&output);
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr.contains("no-such-7z, no-such-7za"));

  Ok(())
}

#[test]
fn test_missing_test_executable() -> Result<()> {
  let m = TestMod::new("1.0.0", &["1.0.0"])?;

  let output = m.run(&["--skip-clean", "--test-executable", "/nonexistent/factorio"], "y\n")?;
  let (_, stderr) = text(&output);
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr.contains("/nonexistent/factorio"));

  Ok(())
}

#[test]
fn test_project_dir_flag() -> Result<()> {
  let m = TestMod::new("1.0.0", &["1.0.0"])?;
  let missing = m.output.join("does-not-exist");

  let output = m.run(&["--project-dir", &missing.to_string_lossy()], "")?;
  assert_eq!(output.status.code(), Some(1));

  Ok(())
}
