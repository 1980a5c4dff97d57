//! External collaborators the pipeline drives
//!
//! Each one is a trait so the pipeline can run against fakes in tests. The system
//! implementations shell out synchronously, with no retries and no timeouts.

use crate::core::error::{BuildError, ReleaseError, ReleaseResult};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Creates the secondary snapshot of the project directory
pub trait BackupArchiver {
  /// Archive the contents of `source_dir` into `target`
  fn create_backup(&self, source_dir: &Path, target: &Path) -> ReleaseResult<()>;
}

/// Runs the manual test step and waits for it to exit
pub trait TestLauncher {
  fn launch(&self, executable: &Path) -> ReleaseResult<()>;
}

/// Asks the operator a yes/no question
pub trait Confirmation {
  /// `Ok(false)` means declined; closed input is [`ReleaseError::Interrupted`]
  fn confirm(&mut self, prompt: &str) -> ReleaseResult<bool>;
}

/// Checks whether a command-line tool can be run
pub trait ToolCheck {
  fn is_available(&self, program: &str) -> bool;
}

/// Run `program arg` with output discarded; success means the tool is usable
fn try_run(program: &str, arg: &str) -> anyhow::Result<()> {
  use anyhow::Context;

  let status = Command::new(program)
    .arg(arg)
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .status()
    .with_context(|| format!("{} could not be started", program))?;

  if !status.success() {
    anyhow::bail!("{} {} exited with {}", program, arg, status);
  }
  Ok(())
}

/// `7z`-compatible archiver, first usable candidate wins
pub struct SystemArchiver {
  candidates: Vec<String>,
  vcs_dir: String,
}

impl SystemArchiver {
  pub fn new(candidates: &[String], vcs_dir: &str) -> Self {
    Self {
      candidates: candidates.to_vec(),
      vcs_dir: vcs_dir.to_string(),
    }
  }

  /// First candidate that answers `--help`
  pub fn find_tool(&self) -> ReleaseResult<&str> {
    for (index, tool) in self.candidates.iter().enumerate() {
      match try_run(tool, "--help") {
        Ok(()) => return Ok(tool),
        Err(e) => {
          tracing::debug!(tool = %tool, error = %e, "archiver not usable");
          if let Some(next) = self.candidates.get(index + 1) {
            println!("⚠️  {} not found, trying {}...", tool, next);
          }
        }
      }
    }

    Err(ReleaseError::Build(BuildError::ToolMissing {
      tools: self.candidates.clone(),
      hint: "Install p7zip-full (or 7-Zip) and make sure it is on PATH.".to_string(),
    }))
  }

  fn arguments(&self, target: &Path) -> Vec<String> {
    vec![
      "a".to_string(),
      target.to_string_lossy().into_owned(),
      ".".to_string(),
      format!("-xr!{}", self.vcs_dir),
      "-xr!*.zip".to_string(),
      "-xr!*.7z".to_string(),
    ]
  }
}

impl BackupArchiver for SystemArchiver {
  fn create_backup(&self, source_dir: &Path, target: &Path) -> ReleaseResult<()> {
    let tool = self.find_tool()?;
    let args = self.arguments(target);
    tracing::debug!(tool, ?args, cwd = %source_dir.display(), "running archiver");

    // Run from inside the project so `.` is the only thing archived
    let output = Command::new(tool)
      .args(&args)
      .current_dir(source_dir)
      .stdin(Stdio::null())
      .output()
      .map_err(|e| ReleaseError::from(e).context(format!("Failed to start {}", tool)))?;

    if !output.status.success() {
      return Err(ReleaseError::Build(BuildError::ToolFailed {
        command: format!("{} {}", tool, args.join(" ")),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
      }));
    }
    Ok(())
  }
}

/// Launches the test executable attached to the terminal
pub struct ProcessLauncher;

impl TestLauncher for ProcessLauncher {
  fn launch(&self, executable: &Path) -> ReleaseResult<()> {
    let status = Command::new(executable)
      .status()
      .map_err(|e| ReleaseError::from(e).context(format!("Failed to start {}", executable.display())))?;

    if !status.success() {
      return Err(ReleaseError::Build(BuildError::ToolFailed {
        command: executable.display().to_string(),
        stderr: format!("exited with {}", status),
      }));
    }
    Ok(())
  }
}

/// Prompt on stdout, answer on stdin
pub struct StdinConfirmation;

impl Confirmation for StdinConfirmation {
  fn confirm(&mut self, prompt: &str) -> ReleaseResult<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer)? == 0 {
      return Err(ReleaseError::Interrupted);
    }
    Ok(is_affirmative(&answer))
  }
}

/// Only `y` and `yes` proceed (trimmed, any case)
pub fn is_affirmative(answer: &str) -> bool {
  matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Checks tools by running `<program> --version`
pub struct PathLookup;

impl ToolCheck for PathLookup {
  fn is_available(&self, program: &str) -> bool {
    match try_run(program, "--version") {
      Ok(()) => true,
      Err(e) => {
        tracing::debug!(program, error = %e, "tool not available");
        false
      }
    }
  }
}

/// Test executable resolved from settings, if one is configured
pub fn test_executable(configured: Option<&Path>) -> ReleaseResult<PathBuf> {
  match configured {
    Some(path) if path.is_file() => Ok(path.to_path_buf()),
    Some(path) => Err(ReleaseError::Build(BuildError::TestExecutableMissing {
      path: Some(path.to_path_buf()),
    })),
    None => Err(ReleaseError::Build(BuildError::TestExecutableMissing { path: None })),
  }
}
