//! Mod metadata (`info.json`)

use crate::core::error::{BuildError, ReleaseError, ReleaseResult, ResultExt};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const METADATA_FILE: &str = "info.json";

/// The two fields the release cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModInfo {
  pub name: String,
  /// Raw version string as written in the file
  pub version: String,
}

impl ModInfo {
  /// Read `info.json` from the project directory
  pub fn load(project_root: &Path) -> ReleaseResult<Self> {
    let path = project_root.join(METADATA_FILE);
    if !path.is_file() {
      return Err(ReleaseError::Build(BuildError::MissingFile { path }));
    }

    let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    Self::parse(&content, &path)
  }

  /// Parse metadata text; `origin` is only used in error messages
  pub fn parse(content: &str, origin: &Path) -> ReleaseResult<Self> {
    let raw: RawModInfo = serde_json::from_str(content).map_err(|e| {
      ReleaseError::Build(BuildError::MalformedMetadata {
        file: origin.to_path_buf(),
        reason: e.to_string(),
      })
    })?;

    let missing = |field: &str| {
      ReleaseError::Build(BuildError::MissingField {
        file: origin.to_path_buf(),
        field: field.to_string(),
      })
    };

    // Version is reported first when both are missing
    let version = raw.version.ok_or_else(|| missing("version"))?;
    let name = raw.name.ok_or_else(|| missing("name"))?;

    Ok(Self { name, version })
  }
}

/// On-disk shape; every other key in `info.json` is ignored
#[derive(Debug, Deserialize)]
struct RawModInfo {
  #[serde(default)]
  name: Option<String>,
  #[serde(default)]
  version: Option<String>,
}
