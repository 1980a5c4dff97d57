//! Integration tests for full release runs

use crate::helpers::{TestMod, text};
use anyhow::Result;
use std::fs::{File, Permissions};
use std::os::unix::fs::PermissionsExt;

#[test]
fn test_release_prints_transcript_and_summary() -> Result<()> {
  let m = TestMod::new("1.0.0", &["1.0.0"])?;

  let output = m.run(&["--skip-test", "--skip-clean"], "y\n")?;
  let (stdout, stderr) = text(&output);
  assert!(output.status.success(), "stdout: {stdout}\nstderr: {stderr}");

  assert!(stdout.contains("REMOTE COMMANDS TO RUN MANUALLY:"));
  let tag = stdout.find("git tag -a v1.0.0 -m 'Release v1.0.0'").expect("tag command");
  let push = stdout.find("git push origin v1.0.0").expect("push command");
  let release = stdout.find("gh release create v1.0.0").expect("release command");
  assert!(tag < push && push < release);
  assert!(stdout.contains("-t 'Version v1.0.0' -F "));
  assert!(stdout.contains("BUILD COMPLETE!"));
  assert!(stdout.contains("SHA-256:"));

  // Queued, never executed
  assert!(m.tags()?.is_empty());

  assert_eq!(
    m.output_entries()?,
    vec!["mymod", "mymod_1.0.0.zip", "mymod_v1.0.0_backup.7z"]
  );
  assert_eq!(m.read_file("tmp/changes.txt")?, "Features:\n  - Changes for 1.0.0");
  assert!(m.file_exists("info.json"));

  Ok(())
}

#[test]
fn test_package_layout() -> Result<()> {
  let m = TestMod::new("1.0.0", &["1.0.0"])?;

  let output = m.run(&["--skip-test", "--skip-clean"], "y\n")?;
  assert!(output.status.success());

  let archive = zip::ZipArchive::new(File::open(m.output.join("mymod_1.0.0.zip"))?)?;
  let mut names: Vec<&str> = archive.file_names().collect();
  names.sort();
  assert_eq!(
    names,
    vec![
      "mymod_1.0.0/changelog.txt",
      "mymod_1.0.0/control.lua",
      "mymod_1.0.0/info.json",
      "mymod_1.0.0/locale/en/strings.cfg",
    ]
  );

  Ok(())
}

#[test]
fn test_cleanup_keeps_git_and_notes() -> Result<()> {
  let m = TestMod::new("1.1.0", &["1.1.0", "1.0.0"])?;
  m.tag("v1.0.0")?;

  let output = m.run(&["--skip-test"], "yes\n")?;
  let (stdout, stderr) = text(&output);
  assert!(output.status.success(), "stdout: {stdout}\nstderr: {stderr}");

  assert!(!m.file_exists("info.json"));
  assert!(!m.file_exists("locale"));
  assert!(m.file_exists(".git/HEAD"));
  assert_eq!(m.read_file("tmp/changes.txt")?, "Features:\n  - Changes for 1.1.0");

  // Repository still intact after cleanup
  assert_eq!(m.tags()?, vec!["v1.0.0"]);
  assert!(stdout.contains("Previous: v1.0.0"));

  Ok(())
}

#[test]
fn test_decline_exits_cleanly() -> Result<()> {
  let m = TestMod::new("1.0.0", &["1.0.0"])?;

  let output = m.run(&["--skip-test", "--skip-clean"], "n\n")?;
  let (stdout, _) = text(&output);
  assert_eq!(output.status.code(), Some(0));
  assert!(stdout.contains("Release cancelled by user"));
  assert!(!stdout.contains("REMOTE COMMANDS"));
  assert!(!m.file_exists("tmp/changes.txt"));

  Ok(())
}

#[test]
fn test_closed_stdin_is_an_interrupt() -> Result<()> {
  let m = TestMod::new("1.0.0", &["1.0.0"])?;

  let output = m.run(&["--skip-test", "--skip-clean"], "")?;
  assert_eq!(output.status.code(), Some(130));

  Ok(())
}

#[test]
fn test_config_file_remote() -> Result<()> {
  let m = TestMod::new("1.0.0", &["1.0.0"])?;
  std::fs::write(m.path.join("release.toml"), "[tools]\nremote = \"upstream\"\n")?;

  let output = m.run(&["--skip-test", "--skip-clean"], "y\n")?;
  let (stdout, stderr) = text(&output);
  assert!(output.status.success(), "stderr: {stderr}");
  assert!(stdout.contains("git push upstream v1.0.0"));

  Ok(())
}

#[test]
fn test_test_executable_runs() -> Result<()> {
  let m = TestMod::new("1.0.0", &["1.0.0"])?;
  let marker = m.output.join("launched");
  let exe = m.output.join("fake-game");
  std::fs::write(&exe, format!("#!/bin/sh\ntouch '{}'\n", marker.display()))?;
  std::fs::set_permissions(&exe, Permissions::from_mode(0o755))?;

  let output = m.run(
    &["--skip-clean", "--factorio-path", &exe.to_string_lossy()],
    "y\n",
  )?;
  let (_, stderr) = text(&output);
  assert!(output.status.success(), "stderr: {stderr}");
  assert!(marker.exists());

  Ok(())
}
