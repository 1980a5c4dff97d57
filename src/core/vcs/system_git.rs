//! System git backend for read-only queries
//!
//! Uses git plumbing through a subprocess with an isolated environment. Nothing in
//! here creates, moves or pushes a ref.

use super::TagLookup;
use crate::core::error::{BuildError, ReleaseError, ReleaseResult, ResultExt};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Git backend using system git (zero crate dependencies)
pub struct SystemGit {
  /// Repository working directory
  pub(crate) repo_path: PathBuf,
}

impl SystemGit {
  /// Point at a repository without touching it
  ///
  /// Failures surface on the first query, so a release that aborts earlier never needs
  /// git at all.
  pub fn new(path: &Path) -> Self {
    Self {
      repo_path: path.to_path_buf(),
    }
  }

  /// List tags matching `pattern` (`git tag -l <pattern>`)
  pub fn list_tags(&self, pattern: &str) -> ReleaseResult<Vec<String>> {
    let output = self
      .git_cmd()
      .args(["tag", "-l", pattern])
      .output()
      .context("Failed to execute git tag -l")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(ReleaseError::Build(BuildError::RepoNotFound {
          path: self.repo_path.clone(),
        }));
      }
      return Err(ReleaseError::Build(BuildError::GitCommandFailed {
        command: format!("git tag -l {}", pattern),
        stderr: stderr.to_string(),
      }));
    }

    Ok(parse_tag_list(&String::from_utf8_lossy(&output.stdout)))
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to repo path
  /// - Clears environment variables
  /// - Whitelists only PATH and HOME
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    // Set working directory
    cmd.arg("-C").arg(&self.repo_path);

    // Isolated environment (don't trust global config)
    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
      cmd.env("PATH", path);
    }
    if let Ok(home) = std::env::var("HOME") {
      cmd.env("HOME", home);
    }

    cmd.arg("-c").arg("core.quotePath=false"); // Don't escape non-ASCII

    cmd
  }
}

impl TagLookup for SystemGit {
  fn tag_exists(&self, tag: &str) -> ReleaseResult<bool> {
    // `tag -l` treats its argument as a glob; compare exactly so `v1.0.*` style names
    // can't produce a false positive
    Ok(self.list_tags(tag)?.iter().any(|t| t == tag))
  }
}

fn parse_tag_list(stdout: &str) -> Vec<String> {
  stdout
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty())
    .map(str::to_string)
    .collect()
}
