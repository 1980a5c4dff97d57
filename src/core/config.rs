use crate::core::error::{BuildError, ReleaseError, ReleaseResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Optional configuration file for mod-release
/// Searched in order: release.toml, .release.toml, .config/release.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
  #[serde(default)]
  pub project: ProjectConfig,
  #[serde(default)]
  pub tools: ToolsConfig,
}

/// Layout of the mod directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
  /// Version-control metadata directory, never modified (default: ".git")
  #[serde(default = "default_vcs_dir")]
  pub vcs_dir: String,

  /// Build scripts, left out of the package (default: "scripts")
  #[serde(default = "default_scripts_dir")]
  pub scripts_dir: String,

  /// Scratch space for release notes, left out of the package (default: "tmp")
  #[serde(default = "default_tmp_dir")]
  pub tmp_dir: String,
}

fn default_vcs_dir() -> String {
  ".git".to_string()
}

fn default_scripts_dir() -> String {
  "scripts".to_string()
}

fn default_tmp_dir() -> String {
  "tmp".to_string()
}

impl Default for ProjectConfig {
  fn default() -> Self {
    Self {
      vcs_dir: default_vcs_dir(),
      scripts_dir: default_scripts_dir(),
      tmp_dir: default_tmp_dir(),
    }
  }
}

/// External tools the release relies on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
  /// Backup archivers, tried in order (default: ["7z", "7za"])
  #[serde(default = "default_backup_tools")]
  pub backup: Vec<String>,

  /// Backup file extension (default: "7z")
  #[serde(default = "default_backup_extension")]
  pub backup_extension: String,

  /// Remote the tag push targets (default: "origin")
  #[serde(default = "default_remote")]
  pub remote: String,

  /// Executable launched for the manual test run
  #[serde(default)]
  pub test_executable: Option<PathBuf>,
}

fn default_backup_tools() -> Vec<String> {
  vec!["7z".to_string(), "7za".to_string()]
}

fn default_backup_extension() -> String {
  "7z".to_string()
}

fn default_remote() -> String {
  "origin".to_string()
}

impl Default for ToolsConfig {
  fn default() -> Self {
    Self {
      backup: default_backup_tools(),
      backup_extension: default_backup_extension(),
      remote: default_remote(),
      test_executable: None,
    }
  }
}

impl FileConfig {
  /// Find config file in search order: release.toml, .release.toml, .config/release.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("release.toml"),
      path.join(".release.toml"),
      path.join(".config").join("release.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load the config for a project, falling back to defaults when there is no file
  pub fn load(project_dir: &Path, explicit: Option<&Path>) -> ReleaseResult<Self> {
    let config_path = match explicit {
      Some(path) => {
        if !path.is_file() {
          return Err(ReleaseError::Build(BuildError::MissingFile {
            path: path.to_path_buf(),
          }));
        }
        path.to_path_buf()
      }
      None => match Self::find_config_path(project_dir) {
        Some(path) => path,
        None => return Ok(Self::default()),
      },
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: FileConfig = toml_edit::de::from_str(&content).map_err(|e| {
      ReleaseError::Build(BuildError::InvalidConfig {
        path: Some(config_path.clone()),
        reason: e.to_string(),
      })
    })?;

    config.validate().map_err(|reason| {
      ReleaseError::Build(BuildError::InvalidConfig {
        path: Some(config_path.clone()),
        reason,
      })
    })?;

    Ok(config)
  }

  /// Validate names and tool lists
  pub fn validate(&self) -> Result<(), String> {
    for (field, value) in [
      ("project.vcs_dir", &self.project.vcs_dir),
      ("project.scripts_dir", &self.project.scripts_dir),
      ("project.tmp_dir", &self.project.tmp_dir),
      ("tools.backup_extension", &self.tools.backup_extension),
    ] {
      if !is_plain_name(value) {
        return Err(format!("{} must be a plain name, got '{}'", field, value));
      }
    }

    if self.tools.backup.is_empty() || self.tools.backup.iter().any(|tool| tool.trim().is_empty()) {
      return Err("tools.backup must list at least one executable".to_string());
    }
    if self.tools.remote.trim().is_empty() {
      return Err("tools.remote must not be empty".to_string());
    }

    Ok(())
  }
}

/// A single path component: not empty, no separators, not `.` or `..`
fn is_plain_name(value: &str) -> bool {
  !value.is_empty() && value != "." && value != ".." && !value.contains(['/', '\\'])
}

/// Flags from the command line that override the file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
  pub test_executable: Option<PathBuf>,
  pub skip_test: bool,
  pub skip_clean: bool,
}

/// Immutable settings for one release run
///
/// Built once at startup from the config file and the command line, then shared
/// read-only with every stage.
#[derive(Debug, Clone)]
pub struct ReleaseSettings {
  pub vcs_dir: String,
  pub scripts_dir: String,
  pub tmp_dir: String,
  pub backup_tools: Vec<String>,
  pub backup_extension: String,
  pub remote: String,
  pub test_executable: Option<PathBuf>,
  pub skip_test: bool,
  pub skip_clean: bool,
}

impl ReleaseSettings {
  /// Merge file config with command-line overrides
  pub fn new(file: FileConfig, cli: CliOverrides) -> Self {
    Self {
      vcs_dir: file.project.vcs_dir,
      scripts_dir: file.project.scripts_dir,
      tmp_dir: file.project.tmp_dir,
      backup_tools: file.tools.backup,
      backup_extension: file.tools.backup_extension,
      remote: file.tools.remote,
      test_executable: cli.test_executable.or(file.tools.test_executable),
      skip_test: cli.skip_test,
      skip_clean: cli.skip_clean,
    }
  }
}

impl Default for ReleaseSettings {
  fn default() -> Self {
    Self::new(FileConfig::default(), CliOverrides::default())
  }
}
