//! Release command implementation
//!
//! Wires the real collaborators (system git, 7z, the test executable, stdin) into the
//! pipeline, then prints the deferred transcript and the completion summary.

use crate::core::config::{CliOverrides, FileConfig, ReleaseSettings};
use crate::core::error::{BuildError, ReleaseError, ReleaseResult};
use crate::core::fs_ops::SafeFileOps;
use crate::core::vcs::SystemGit;
use crate::release::tools::{PathLookup, ProcessLauncher, StdinConfirmation, SystemArchiver};
use crate::release::{Collaborators, ReleasePipeline, RunOutcome};
use std::env;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

/// Command-line inputs for one release run
#[derive(Debug, Clone, Default)]
pub struct ReleaseOptions {
  pub project_dir: Option<PathBuf>,
  pub config: Option<PathBuf>,
  pub test_executable: Option<PathBuf>,
  pub skip_test: bool,
  pub skip_clean: bool,
}

/// Run the full release pipeline for one mod directory
pub fn run_release(options: ReleaseOptions) -> ReleaseResult<()> {
  let project_dir = match options.project_dir {
    Some(dir) => dir,
    None => env::current_dir()?,
  };
  if !project_dir.is_dir() {
    return Err(ReleaseError::Build(BuildError::UnsafeProjectRoot {
      path: project_dir,
      reason: "does not exist or is not a directory".to_string(),
    }));
  }

  let file_config = FileConfig::load(&project_dir, options.config.as_deref())?;
  let settings = ReleaseSettings::new(
    file_config,
    CliOverrides {
      test_executable: options.test_executable,
      skip_test: options.skip_test,
      skip_clean: options.skip_clean,
    },
  );

  let files = SafeFileOps::new(&project_dir, &settings.vcs_dir)?;
  println!("📁 Project directory: {}", files.project_root().display());
  println!("   Output directory:  {}", files.output_root().display());
  println!();

  let git = SystemGit::new(files.project_root());
  let archiver = SystemArchiver::new(&settings.backup_tools, &settings.vcs_dir);
  let mut confirmation = StdinConfirmation;

  let report = ReleasePipeline::new(
    &settings,
    &files,
    Collaborators {
      tags: &git,
      archiver: &archiver,
      launcher: &ProcessLauncher,
      confirmation: &mut confirmation,
      availability: &PathLookup,
    },
  )
  .with_progress(io::stderr().is_terminal())
  .run()?;

  tracing::debug!(
    outcome = ?report.outcome,
    stages = report.visited.len(),
    queued = report.queue.len(),
    package = ?report.state.package_path,
    "release run finished"
  );

  if report.outcome == RunOutcome::AbortedByUser {
    return Ok(());
  }

  println!();
  print!("{}", report.queue.render_all());
  if let Some(summary) = &report.summary {
    println!();
    print!("{}", summary.render());
  }

  Ok(())
}
