//! Release pipeline state machine
//!
//! ```text
//! ValidateVersions → Package → Backup → CleanProjectDirectory → RunExternalTest
//!   → ConfirmWithUser → VerifyPreviousTagExists → PrepareVersionControlCommands
//!   → PrepareReleaseCommands → RenderSummary
//! ```
//!
//! Stages run strictly in table order and the first error ends the run. Filesystem
//! changes go through [`SafeFileOps`]; tagging, pushing and publishing are only ever
//! recorded in the [`CommandQueue`] for the operator to run.

use crate::core::config::ReleaseSettings;
use crate::core::error::{BuildError, ReleaseError, ReleaseResult, VersionSource};
use crate::core::fs_ops::{Operation, SafeFileOps};
use crate::core::queue::{CommandKind, CommandQueue, QueuedCommand};
use crate::core::vcs::TagLookup;
use crate::release::changelog::{self, Changelog};
use crate::release::metadata::ModInfo;
use crate::release::package::{self, PackageFilter};
use crate::release::tools::{self, BackupArchiver, Confirmation, TestLauncher, ToolCheck};
use crate::release::version::ReleaseVersion;
use chrono::{DateTime, Local};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const BANNER_WIDTH: usize = 70;
const NOTES_FILE: &str = "changes.txt";

/// Pipeline states, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
  ValidateVersions,
  Package,
  Backup,
  CleanProjectDirectory,
  RunExternalTest,
  ConfirmWithUser,
  VerifyPreviousTagExists,
  PrepareVersionControlCommands,
  PrepareReleaseCommands,
  RenderSummary,
}

/// `(from, to)`; `None` ends the run
const TRANSITIONS: &[(Stage, Option<Stage>)] = &[
  (Stage::ValidateVersions, Some(Stage::Package)),
  (Stage::Package, Some(Stage::Backup)),
  (Stage::Backup, Some(Stage::CleanProjectDirectory)),
  (Stage::CleanProjectDirectory, Some(Stage::RunExternalTest)),
  (Stage::RunExternalTest, Some(Stage::ConfirmWithUser)),
  (Stage::ConfirmWithUser, Some(Stage::VerifyPreviousTagExists)),
  (Stage::VerifyPreviousTagExists, Some(Stage::PrepareVersionControlCommands)),
  (Stage::PrepareVersionControlCommands, Some(Stage::PrepareReleaseCommands)),
  (Stage::PrepareReleaseCommands, Some(Stage::RenderSummary)),
  (Stage::RenderSummary, None),
];

impl Stage {
  pub const FIRST: Stage = Stage::ValidateVersions;

  pub fn next(self) -> Option<Stage> {
    TRANSITIONS
      .iter()
      .find(|(from, _)| *from == self)
      .and_then(|(_, to)| *to)
  }

  pub fn label(self) -> &'static str {
    match self {
      Stage::ValidateVersions => "validate versions",
      Stage::Package => "package",
      Stage::Backup => "backup",
      Stage::CleanProjectDirectory => "clean project directory",
      Stage::RunExternalTest => "run external test",
      Stage::ConfirmWithUser => "confirm with user",
      Stage::VerifyPreviousTagExists => "verify previous tag",
      Stage::PrepareVersionControlCommands => "prepare version-control commands",
      Stage::PrepareReleaseCommands => "prepare release commands",
      Stage::RenderSummary => "render summary",
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.label())
  }
}

/// How a single stage ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
  Completed,
  Skipped,
  /// Operator declined; only produced by [`Stage::ConfirmWithUser`]
  Cancelled,
}

/// How a run that didn't fail ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
  Completed,
  AbortedByUser,
}

/// Facts gathered along the way; each field is written by exactly one stage
#[derive(Debug, Clone, Default)]
pub struct ReleaseState {
  pub project_name: Option<String>,
  pub current_version: Option<ReleaseVersion>,
  pub previous_version: Option<ReleaseVersion>,
  pub artifact_base_name: Option<String>,
  pub package_path: Option<PathBuf>,
  pub package_sha256: Option<String>,
  pub backup_path: Option<PathBuf>,
  /// Changelog text as read during validation
  pub changelog_text: Option<String>,
  pub notes_path: Option<PathBuf>,
}

/// Completion summary shown after the transcript
#[derive(Debug, Clone)]
pub struct ReleaseSummary {
  pub version: ReleaseVersion,
  pub package_path: PathBuf,
  pub package_sha256: String,
  pub backup_path: PathBuf,
  pub notes_path: PathBuf,
  pub completed_at: DateTime<Local>,
}

impl ReleaseSummary {
  pub fn render(&self) -> String {
    let banner = "=".repeat(BANNER_WIDTH);
    let mut output = String::new();

    output.push_str(&format!("{}\n", banner));
    output.push_str("✅ BUILD COMPLETE!\n");
    output.push_str(&format!("  Version: {}\n", self.version));
    output.push_str(&format!("  Package: {}\n", self.package_path.display()));
    output.push_str(&format!("  SHA-256: {}\n", self.package_sha256));
    output.push_str(&format!("  Backup:  {}\n", self.backup_path.display()));
    output.push_str(&format!("  Notes:   {}\n", self.notes_path.display()));
    output.push('\n');
    output.push_str("Next steps (MANUAL):\n");
    output.push_str("  1. Run the git tag commands printed above\n");
    output.push_str("  2. Run the GitHub release command printed above\n");
    output.push_str("  3. Verify the release on GitHub\n");
    output.push('\n');
    output.push_str(&format!("Completed at {}\n", self.completed_at.format("%Y-%m-%d %H:%M:%S %:z")));
    output.push_str(&format!("{}\n", banner));
    output
  }
}

/// Everything the pipeline talks to outside its own process
pub struct Collaborators<'a> {
  pub tags: &'a dyn TagLookup,
  pub archiver: &'a dyn BackupArchiver,
  pub launcher: &'a dyn TestLauncher,
  pub confirmation: &'a mut dyn Confirmation,
  pub availability: &'a dyn ToolCheck,
}

/// Result of a run that didn't fail
#[derive(Debug)]
pub struct PipelineReport {
  pub outcome: RunOutcome,
  pub state: ReleaseState,
  pub queue: CommandQueue,
  pub visited: Vec<(Stage, StageStatus)>,
  pub summary: Option<ReleaseSummary>,
}

/// Drives one release from validation to the deferred transcript
pub struct ReleasePipeline<'a> {
  settings: &'a ReleaseSettings,
  files: &'a SafeFileOps,
  tools: Collaborators<'a>,
  state: ReleaseState,
  queue: CommandQueue,
  visited: Vec<(Stage, StageStatus)>,
  summary: Option<ReleaseSummary>,
  show_progress: bool,
}

impl<'a> ReleasePipeline<'a> {
  pub fn new(settings: &'a ReleaseSettings, files: &'a SafeFileOps, tools: Collaborators<'a>) -> Self {
    Self {
      settings,
      files,
      tools,
      state: ReleaseState::default(),
      queue: CommandQueue::new(files.project_root()),
      visited: Vec::new(),
      summary: None,
      show_progress: false,
    }
  }

  /// Draw a progress bar while packaging
  pub fn with_progress(mut self, show_progress: bool) -> Self {
    self.show_progress = show_progress;
    self
  }

  /// Run every stage; the queue is only handed out if nothing failed
  pub fn run(mut self) -> ReleaseResult<PipelineReport> {
    let outcome = self.drive()?;

    Ok(PipelineReport {
      outcome,
      state: self.state,
      queue: self.queue,
      visited: self.visited,
      summary: self.summary,
    })
  }

  fn drive(&mut self) -> ReleaseResult<RunOutcome> {
    let mut current = Some(Stage::FIRST);

    while let Some(stage) = current {
      debug!(%stage, "entering stage");
      let status = self.run_stage(stage)?;
      debug!(%stage, ?status, "stage finished");
      self.visited.push((stage, status));

      if status == StageStatus::Cancelled {
        return Ok(RunOutcome::AbortedByUser);
      }
      current = stage.next();
    }

    Ok(RunOutcome::Completed)
  }

  fn run_stage(&mut self, stage: Stage) -> ReleaseResult<StageStatus> {
    match stage {
      Stage::ValidateVersions => self.validate_versions(),
      Stage::Package => self.build_package(),
      Stage::Backup => self.create_backup(),
      Stage::CleanProjectDirectory => self.clean_project_directory(),
      Stage::RunExternalTest => self.run_external_test(),
      Stage::ConfirmWithUser => self.confirm_with_user(),
      Stage::VerifyPreviousTagExists => self.verify_previous_tag(),
      Stage::PrepareVersionControlCommands => self.prepare_vcs_commands(),
      Stage::PrepareReleaseCommands => self.prepare_release_commands(),
      Stage::RenderSummary => self.render_summary(),
    }
  }

  fn project_root(&self) -> &Path {
    self.files.project_root()
  }

  fn validate_versions(&mut self) -> ReleaseResult<StageStatus> {
    println!("🔍 Validating versions...");

    let info = ModInfo::load(self.project_root())?;
    let changelog = Changelog::load(self.project_root())?;

    let metadata_version = ReleaseVersion::parse(&info.version, VersionSource::Metadata)?;
    let changelog_version = ReleaseVersion::parse(&changelog.current, VersionSource::Changelog)?;

    if metadata_version != changelog_version {
      return Err(ReleaseError::Build(BuildError::VersionMismatch {
        metadata: metadata_version.to_string(),
        changelog: changelog_version.to_string(),
      }));
    }

    let previous = changelog
      .previous
      .as_deref()
      .map(|raw| ReleaseVersion::parse(raw, VersionSource::PreviousChangelog))
      .transpose()?;

    println!("   Current version: {}", metadata_version);
    match &previous {
      Some(prev) => println!("   Previous version: {}", prev),
      None => println!("   No previous version found (first release?)"),
    }

    self.state.artifact_base_name = Some(package::artifact_base_name(&info.name, &metadata_version));
    self.state.project_name = Some(info.name);
    self.state.current_version = Some(metadata_version);
    self.state.previous_version = previous;
    self.state.changelog_text = Some(changelog.text);
    Ok(StageStatus::Completed)
  }

  fn build_package(&mut self) -> ReleaseResult<StageStatus> {
    let name = require(&self.state.project_name, "project_name")?.clone();
    let version = require(&self.state.current_version, "current_version")?.clone();
    let base_name = require(&self.state.artifact_base_name, "artifact_base_name")?.clone();

    let target = self
      .files
      .output_root()
      .join(package::package_file_name(&name, &version));
    let target = self.files.validate_output_target(&target)?;

    println!("📦 Building package {}...", target.display());
    let filter = PackageFilter::new(self.settings);
    let built = package::build_package(self.project_root(), &base_name, &filter, self.show_progress)?;
    let digest = built.sha256();
    let entries = built.entries.len();
    self.files.apply(Operation::WriteFile {
      path: target.clone(),
      contents: built.bytes,
    })?;
    println!("   {} entries, sha256 {}", entries, digest);

    self.state.package_path = Some(target);
    self.state.package_sha256 = Some(digest);
    Ok(StageStatus::Completed)
  }

  fn create_backup(&mut self) -> ReleaseResult<StageStatus> {
    let name = require(&self.state.project_name, "project_name")?;
    let version = require(&self.state.current_version, "current_version")?;

    let file_name = package::backup_file_name(name, version, &self.settings.backup_extension);
    let target = self.files.validate_output_target(&self.files.output_root().join(file_name))?;

    println!("🗜️  Creating backup {}...", target.display());
    self.tools.archiver.create_backup(self.files.project_root(), &target)?;

    self.state.backup_path = Some(target);
    Ok(StageStatus::Completed)
  }

  fn clean_project_directory(&mut self) -> ReleaseResult<StageStatus> {
    if self.settings.skip_clean {
      println!("⏭️  Skipping project directory cleanup");
      return Ok(StageStatus::Skipped);
    }

    println!("🧹 Cleaning project directory (keeping {})...", self.settings.vcs_dir);

    let mut children = fs::read_dir(self.project_root())?
      .map(|entry| entry.map(|e| e.path()))
      .collect::<Result<Vec<_>, _>>()?;
    children.sort();

    for child in children {
      if child == self.files.protected() {
        continue;
      }

      // Symlinks are unlinked, whatever they point at
      let file_type = fs::symlink_metadata(&child)?.file_type();
      let operation = if file_type.is_dir() {
        Operation::DeleteTree(child)
      } else if file_type.is_file() || file_type.is_symlink() {
        Operation::DeleteFile(child)
      } else {
        debug!(path = %child.display(), "leaving special file in place");
        continue;
      };
      self.files.apply(operation)?;
    }

    println!("   Project directory cleaned");
    Ok(StageStatus::Completed)
  }

  fn run_external_test(&mut self) -> ReleaseResult<StageStatus> {
    if self.settings.skip_test {
      println!("⏭️  Skipping test run");
      return Ok(StageStatus::Skipped);
    }

    let executable = tools::test_executable(self.settings.test_executable.as_deref())?;
    println!("🎮 Running {}", executable.display());
    println!("   Test the mod and close the program when done.");
    self.tools.launcher.launch(&executable)?;
    println!("   Test run finished");
    Ok(StageStatus::Completed)
  }

  fn confirm_with_user(&mut self) -> ReleaseResult<StageStatus> {
    let version = require(&self.state.current_version, "current_version")?;
    let package_path = require(&self.state.package_path, "package_path")?;
    let banner = "=".repeat(BANNER_WIDTH);

    println!();
    println!("{}", banner);
    println!("Ready to create release:");
    println!("  Version: {}", version);
    if let Some(file_name) = package_path.file_name() {
      println!("  Package: {}", file_name.to_string_lossy());
    }
    if let Some(previous) = &self.state.previous_version {
      println!("  Previous: {}", previous);
    }
    println!("{}", banner);

    if self
      .tools
      .confirmation
      .confirm("\nProceed with git tag and GitHub release? [y/N]: ")?
    {
      Ok(StageStatus::Completed)
    } else {
      println!("⚠️  Release cancelled by user");
      Ok(StageStatus::Cancelled)
    }
  }

  fn verify_previous_tag(&mut self) -> ReleaseResult<StageStatus> {
    let Some(previous) = &self.state.previous_version else {
      return Ok(StageStatus::Skipped);
    };

    println!("🏷️  Verifying previous tag {} exists...", previous);
    if !self.tools.tags.tag_exists(previous.tag())? {
      return Err(ReleaseError::Build(BuildError::PreviousTagMissing {
        tag: previous.tag().to_string(),
      }));
    }

    println!("   Previous tag {} verified", previous);
    Ok(StageStatus::Completed)
  }

  fn prepare_vcs_commands(&mut self) -> ReleaseResult<StageStatus> {
    let tag = require(&self.state.current_version, "current_version")?.tag().to_string();

    println!("🏷️  Preparing git tag {}...", tag);
    if self.tools.tags.tag_exists(&tag)? {
      return Err(ReleaseError::Build(BuildError::TagExists { tag }));
    }

    self.queue.enqueue(QueuedCommand::vcs(
      ["tag".to_string(), "-a".to_string(), tag.clone(), "-m".to_string(), format!("Release {}", tag)],
      format!("Create tag {}", tag),
    ));
    self.queue.enqueue(QueuedCommand::vcs(
      ["push".to_string(), self.settings.remote.clone(), tag.clone()],
      "Push tag to remote",
    ));

    println!("   Git tag commands prepared");
    Ok(StageStatus::Completed)
  }

  fn prepare_release_commands(&mut self) -> ReleaseResult<StageStatus> {
    let publisher = CommandKind::Publisher.program();
    println!("🚀 Preparing GitHub release...");

    if !self.tools.availability.is_available(publisher) {
      return Err(ReleaseError::Build(BuildError::ToolMissing {
        tools: vec![publisher.to_string()],
        hint: "Install the GitHub CLI (https://cli.github.com) first.".to_string(),
      }));
    }

    let tag = require(&self.state.current_version, "current_version")?.tag().to_string();
    let changelog_text = require(&self.state.changelog_text, "changelog_text")?;
    let notes = changelog::extract_release_notes(changelog_text);

    let notes_dir = self.project_root().join(&self.settings.tmp_dir);
    let notes_path = notes_dir.join(NOTES_FILE);
    self.files.apply(Operation::MakeDirectory(notes_dir))?;
    self.files.apply(Operation::WriteFile {
      path: notes_path.clone(),
      contents: notes.into_bytes(),
    })?;

    let package_path = require(&self.state.package_path, "package_path")?.clone();
    if !package_path.is_file() {
      return Err(ReleaseError::Build(BuildError::PackageMissing { path: package_path }));
    }

    self.queue.enqueue(QueuedCommand::publisher(
      [
        "release".to_string(),
        "create".to_string(),
        tag.clone(),
        package_path.to_string_lossy().into_owned(),
        "-t".to_string(),
        format!("Version {}", tag),
        "-F".to_string(),
        notes_path.to_string_lossy().into_owned(),
      ],
      format!("Create GitHub release for {}", tag),
    ));

    println!("   Release notes saved to {}", notes_path.display());
    println!("   GitHub release command prepared");
    println!("⚠️  DO NOT delete {} until after running the command!", NOTES_FILE);

    self.state.notes_path = Some(notes_path);
    Ok(StageStatus::Completed)
  }

  fn render_summary(&mut self) -> ReleaseResult<StageStatus> {
    self.summary = Some(ReleaseSummary {
      version: require(&self.state.current_version, "current_version")?.clone(),
      package_path: require(&self.state.package_path, "package_path")?.clone(),
      package_sha256: require(&self.state.package_sha256, "package_sha256")?.clone(),
      backup_path: require(&self.state.backup_path, "backup_path")?.clone(),
      notes_path: require(&self.state.notes_path, "notes_path")?.clone(),
      completed_at: Local::now(),
    });
    Ok(StageStatus::Completed)
  }
}

/// A state field an earlier stage should have filled in
fn require<'s, T>(field: &'s Option<T>, name: &str) -> ReleaseResult<&'s T> {
  field
    .as_ref()
    .ok_or_else(|| ReleaseError::message(format!("Release state is missing '{}'", name)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::{Cell, RefCell};
  use std::collections::HashSet;
  use tempfile::TempDir;

  const SEPARATOR: &str = "---------------------------------------------------------------------------------------------------";

  struct FakeTags {
    existing: HashSet<String>,
    queried: RefCell<Vec<String>>,
  }

  impl FakeTags {
    fn with(tags: &[&str]) -> Self {
      Self {
        existing: tags.iter().map(|t| t.to_string()).collect(),
        queried: RefCell::new(Vec::new()),
      }
    }
  }

  impl TagLookup for FakeTags {
    fn tag_exists(&self, tag: &str) -> ReleaseResult<bool> {
      self.queried.borrow_mut().push(tag.to_string());
      Ok(self.existing.contains(tag))
    }
  }

  /// Stands in for 7z by writing a placeholder at the target
  struct FakeArchiver;

  impl BackupArchiver for FakeArchiver {
    fn create_backup(&self, _source_dir: &Path, target: &Path) -> ReleaseResult<()> {
      fs::write(target, b"7z placeholder")?;
      Ok(())
    }
  }

  struct FakeLauncher {
    fail: bool,
    launched: Cell<bool>,
  }

  impl TestLauncher for FakeLauncher {
    fn launch(&self, executable: &Path) -> ReleaseResult<()> {
      self.launched.set(true);
      if self.fail {
        return Err(ReleaseError::Build(BuildError::ToolFailed {
          command: executable.display().to_string(),
          stderr: "exited with exit status: 1".to_string(),
        }));
      }
      Ok(())
    }
  }

  struct ScriptedAnswer {
    answer: bool,
    asked: bool,
  }

  impl Confirmation for ScriptedAnswer {
    fn confirm(&mut self, _prompt: &str) -> ReleaseResult<bool> {
      self.asked = true;
      Ok(self.answer)
    }
  }

  struct FakeTools(bool);

  impl ToolCheck for FakeTools {
    fn is_available(&self, _program: &str) -> bool {
      self.0
    }
  }

  struct Fixture {
    _tmp: TempDir,
    files: SafeFileOps,
    settings: ReleaseSettings,
    tags: FakeTags,
    launcher: FakeLauncher,
    answer: ScriptedAnswer,
    tools: FakeTools,
  }

  impl Fixture {
    fn new(metadata_version: &str, changelog_versions: &[&str]) -> Self {
      let tmp = TempDir::new().unwrap();
      let root = tmp.path().join("mymod");
      fs::create_dir_all(root.join(".git")).unwrap();
      fs::write(root.join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
      fs::write(
        root.join("info.json"),
        format!(r#"{{"name": "mymod", "version": "{}"}}"#, metadata_version),
      )
      .unwrap();

      let mut changelog = String::new();
      for version in changelog_versions {
        changelog.push_str(&format!(
          "{SEPARATOR}\nVersion: {version}\nDate: 2025-01-01\n  Features:\n    - Changes for {version}\n"
        ));
      }
      fs::write(root.join("changelog.txt"), changelog).unwrap();
      fs::write(root.join("control.lua"), "-- control").unwrap();
      fs::create_dir_all(root.join("scripts")).unwrap();
      fs::write(root.join("scripts/build.sh"), "#!/bin/sh").unwrap();

      let files = SafeFileOps::new(&root, ".git").unwrap();
      let settings = ReleaseSettings {
        skip_test: true,
        skip_clean: true,
        ..ReleaseSettings::default()
      };

      Self {
        _tmp: tmp,
        files,
        settings,
        tags: FakeTags::with(&[]),
        launcher: FakeLauncher {
          fail: false,
          launched: Cell::new(false),
        },
        answer: ScriptedAnswer {
          answer: true,
          asked: false,
        },
        tools: FakeTools(true),
      }
    }

    fn pipeline(&mut self) -> ReleasePipeline<'_> {
      ReleasePipeline::new(
        &self.settings,
        &self.files,
        Collaborators {
          tags: &self.tags,
          archiver: &FakeArchiver,
          launcher: &self.launcher,
          confirmation: &mut self.answer,
          availability: &self.tools,
        },
      )
    }

    fn output_entries(&self) -> Vec<String> {
      let mut names: Vec<String> = fs::read_dir(self.files.output_root())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
      names.sort();
      names
    }
  }

  #[test]
  fn test_transition_table_order() {
    let mut order = vec![Stage::FIRST];
    while let Some(next) = order.last().unwrap().next() {
      order.push(next);
    }
    assert_eq!(
      order,
      vec![
        Stage::ValidateVersions,
        Stage::Package,
        Stage::Backup,
        Stage::CleanProjectDirectory,
        Stage::RunExternalTest,
        Stage::ConfirmWithUser,
        Stage::VerifyPreviousTagExists,
        Stage::PrepareVersionControlCommands,
        Stage::PrepareReleaseCommands,
        Stage::RenderSummary,
      ]
    );
  }

  #[test]
  fn test_first_release_completes() {
    let mut fx = Fixture::new("2.0.0", &["2.0.0"]);
    let report = fx.pipeline().run().unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.state.current_version.as_ref().unwrap().tag(), "v2.0.0");
    assert!(report.state.previous_version.is_none());
    assert!(report.visited.contains(&(Stage::VerifyPreviousTagExists, StageStatus::Skipped)));
    assert!(report.visited.contains(&(Stage::CleanProjectDirectory, StageStatus::Skipped)));
    assert_eq!(report.visited.len(), 10);

    let lines: Vec<String> = report.queue.commands().iter().map(QueuedCommand::command_line).collect();
    assert_eq!(lines[0], "git tag -a v2.0.0 -m 'Release v2.0.0'");
    assert_eq!(lines[1], "git push origin v2.0.0");
    assert!(lines[2].starts_with("gh release create v2.0.0 "));
    assert!(lines[2].contains("mymod_2.0.0.zip -t 'Version v2.0.0' -F "));

    assert_eq!(
      fx.output_entries(),
      vec!["mymod", "mymod_2.0.0.zip", "mymod_v2.0.0_backup.7z"]
    );

    let notes = fs::read_to_string(report.state.notes_path.as_ref().unwrap()).unwrap();
    assert_eq!(notes, "Features:\n  - Changes for 2.0.0");

    let summary = report.summary.unwrap().render();
    assert!(summary.contains("Version: v2.0.0"));
    assert!(summary.contains(report.state.package_sha256.as_ref().unwrap()));
    assert!(summary.contains("Next steps (MANUAL):"));
  }

  #[test]
  fn test_version_mismatch_aborts_before_mutation() {
    let mut fx = Fixture::new("2.0.0", &["2.0.1"]);
    let err = fx.pipeline().run().unwrap_err();

    match err {
      ReleaseError::Build(BuildError::VersionMismatch { metadata, changelog }) => {
        assert_eq!(metadata, "v2.0.0");
        assert_eq!(changelog, "v2.0.1");
      }
      other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fx.output_entries(), vec!["mymod"]);
    assert!(fx.tags.queried.borrow().is_empty());
  }

  #[test]
  fn test_invalid_previous_version_aborts() {
    let mut fx = Fixture::new("2.0.0", &["2.0.0", "1.0"]);
    let err = fx.pipeline().run().unwrap_err();
    assert!(matches!(
      err,
      ReleaseError::Build(BuildError::InvalidVersion {
        source: VersionSource::PreviousChangelog,
        ..
      })
    ));
  }

  #[test]
  fn test_cleanup_keeps_only_vcs_dir() {
    let mut fx = Fixture::new("1.0.0", &["1.0.0"]);
    let root = fx.files.project_root().to_path_buf();
    fs::remove_dir_all(root.join("scripts")).unwrap();
    for name in ["info.json", "changelog.txt", "control.lua"] {
      fs::remove_file(root.join(name)).unwrap();
    }
    fs::write(root.join("leftover.txt"), "x").unwrap();
    fx.settings.skip_clean = false;

    let status = fx.pipeline().clean_project_directory().unwrap();
    assert_eq!(status, StageStatus::Completed);

    let remaining: Vec<_> = fs::read_dir(&root)
      .unwrap()
      .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
      .collect();
    assert_eq!(remaining, vec![".git"]);
    assert!(root.join(".git/HEAD").is_file());
  }

  #[cfg(unix)]
  #[test]
  fn test_cleanup_unlinks_symlinks_without_following() {
    use std::os::unix::fs::symlink;

    let mut fx = Fixture::new("1.0.0", &["1.0.0"]);
    let root = fx.files.project_root().to_path_buf();
    let outside = TempDir::new().unwrap();
    fs::create_dir_all(outside.path().join("shared")).unwrap();
    fs::write(outside.path().join("shared/lib.lua"), "-- shared").unwrap();
    fs::write(outside.path().join("notes.txt"), "keep").unwrap();

    symlink(outside.path().join("shared"), root.join("shared")).unwrap();
    symlink(outside.path().join("notes.txt"), root.join("notes.txt")).unwrap();
    symlink(root.join("missing"), root.join("dangling")).unwrap();
    fx.settings.skip_clean = false;

    let status = fx.pipeline().clean_project_directory().unwrap();
    assert_eq!(status, StageStatus::Completed);

    let remaining: Vec<_> = fs::read_dir(&root)
      .unwrap()
      .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
      .collect();
    assert_eq!(remaining, vec![".git"]);
    assert!(outside.path().join("shared/lib.lua").is_file());
    assert_eq!(fs::read_to_string(outside.path().join("notes.txt")).unwrap(), "keep");
  }

  #[test]
  fn test_notes_survive_cleanup() {
    let mut fx = Fixture::new("1.1.0", &["1.1.0", "1.0.0"]);
    fx.settings.skip_clean = false;
    fx.tags = FakeTags::with(&["v1.0.0"]);

    let report = fx.pipeline().run().unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed);

    let root = fx.files.project_root();
    assert!(!root.join("info.json").exists());
    assert!(!root.join("control.lua").exists());
    assert!(root.join(".git/HEAD").is_file());

    let notes = fs::read_to_string(root.join("tmp/changes.txt")).unwrap();
    assert_eq!(notes, "Features:\n  - Changes for 1.1.0");
    assert_eq!(report.queue.len(), 3);
  }

  #[test]
  fn test_missing_previous_tag_aborts_without_commands() {
    let mut fx = Fixture::new("1.1.0", &["1.1.0", "1.0.0"]);
    let mut pipeline = fx.pipeline();

    let err = pipeline.drive().unwrap_err();
    assert!(matches!(err, ReleaseError::Build(BuildError::PreviousTagMissing { ref tag }) if tag == "v1.0.0"));
    assert!(pipeline.queue.is_empty());
  }

  #[test]
  fn test_existing_tag_aborts_before_enqueue() {
    let mut fx = Fixture::new("1.1.0", &["1.1.0", "1.0.0"]);
    fx.tags = FakeTags::with(&["v1.0.0", "v1.1.0"]);
    let mut pipeline = fx.pipeline();

    let err = pipeline.drive().unwrap_err();
    assert!(matches!(err, ReleaseError::Build(BuildError::TagExists { ref tag }) if tag == "v1.1.0"));
    assert!(pipeline.queue.is_empty());
    assert_eq!(
      pipeline.visited.last(),
      Some(&(Stage::VerifyPreviousTagExists, StageStatus::Completed))
    );
  }

  #[test]
  fn test_decline_stops_cleanly() {
    let mut fx = Fixture::new("1.0.0", &["1.0.0"]);
    fx.answer.answer = false;

    let report = fx.pipeline().run().unwrap();
    assert_eq!(report.outcome, RunOutcome::AbortedByUser);
    assert!(report.queue.is_empty());
    assert!(report.summary.is_none());
    assert_eq!(report.visited.last(), Some(&(Stage::ConfirmWithUser, StageStatus::Cancelled)));
    assert!(fx.tags.queried.borrow().is_empty());
    assert!(fx.answer.asked);
  }

  #[test]
  fn test_missing_publisher_aborts() {
    let mut fx = Fixture::new("1.0.0", &["1.0.0"]);
    fx.tools = FakeTools(false);

    let err = fx.pipeline().run().unwrap_err();
    assert!(matches!(err, ReleaseError::Build(BuildError::ToolMissing { .. })));
  }

  #[test]
  fn test_external_test_requires_executable() {
    let mut fx = Fixture::new("1.0.0", &["1.0.0"]);
    fx.settings.skip_test = false;

    let err = fx.pipeline().run().unwrap_err();
    assert!(matches!(
      err,
      ReleaseError::Build(BuildError::TestExecutableMissing { path: None })
    ));
    assert!(!fx.answer.asked);
  }

  #[test]
  fn test_failed_test_run_aborts() {
    let mut fx = Fixture::new("1.0.0", &["1.0.0"]);
    let exe = fx.files.output_root().join("factorio");
    fs::write(&exe, "").unwrap();
    fx.settings.skip_test = false;
    fx.settings.test_executable = Some(exe);
    fx.launcher.fail = true;

    let err = fx.pipeline().run().unwrap_err();
    assert!(matches!(err, ReleaseError::Build(BuildError::ToolFailed { .. })));
    assert!(fx.launcher.launched.get());
    assert!(!fx.answer.asked);
  }

  #[test]
  fn test_package_excludes_scripts() {
    let mut fx = Fixture::new("1.0.0", &["1.0.0"]);
    let report = fx.pipeline().run().unwrap();

    let bytes = fs::read(report.state.package_path.unwrap()).unwrap();
    let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut names: Vec<&str> = archive.file_names().collect();
    names.sort();
    assert_eq!(
      names,
      vec!["mymod_1.0.0/changelog.txt", "mymod_1.0.0/control.lua", "mymod_1.0.0/info.json"]
    );
  }
}
