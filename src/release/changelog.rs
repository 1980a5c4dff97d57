//! Mod changelog (`changelog.txt`)
//!
//! Factorio-style layout: a separator line, then entries that each start with a
//! `Version:` line, a date line, and a body indented by two spaces. Entries are
//! separated by lines of dashes.
//!
//! ```text
//! ---------------------------------------------------------------------------------------------------
//! Version: 1.1.0
//! Date: 2025-02-01
//!   Features:
//!     - Faster belts
//! ---------------------------------------------------------------------------------------------------
//! Version: 1.0.0
//! ...
//! ```

use crate::core::error::{BuildError, ReleaseError, ReleaseResult, ResultExt};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

pub const CHANGELOG_FILE: &str = "changelog.txt";

/// Lines above the first entry body (separator, version, date)
const HEADER_LINES: usize = 3;

static VERSION_LINE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?m)^Version:[ \t]*(.*?)[ \t\r]*$").expect("version line pattern is valid"));

/// Changelog contents plus the two newest version strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changelog {
  /// Full text, kept so release notes never depend on the file surviving
  pub text: String,
  /// First `Version:` entry, unvalidated
  pub current: String,
  /// Second `Version:` entry, if any
  pub previous: Option<String>,
}

impl Changelog {
  /// Read `changelog.txt` from the project directory
  pub fn load(project_root: &Path) -> ReleaseResult<Self> {
    let path = project_root.join(CHANGELOG_FILE);
    if !path.is_file() {
      return Err(ReleaseError::Build(BuildError::MissingFile { path }));
    }

    let text = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    Self::parse(text, &path)
  }

  pub fn parse(text: String, origin: &Path) -> ReleaseResult<Self> {
    let mut versions = VERSION_LINE
      .captures_iter(&text)
      .filter_map(|caps| caps.get(1))
      .map(|m| m.as_str().to_string());

    let current = versions.next().ok_or_else(|| {
      ReleaseError::Build(BuildError::NoChangelogVersion {
        file: origin.to_path_buf(),
      })
    })?;
    let previous = versions.next();

    Ok(Self { text, current, previous })
  }
}

/// Body of the first changelog entry, reflowed for a release description
///
/// Skips the header, stops at the first dashed separator, drops one level of
/// two-space indent and puts a blank line in front of every section heading.
pub fn extract_release_notes(changelog: &str) -> String {
  let body = changelog
    .split_inclusive('\n')
    .skip(HEADER_LINES)
    .take_while(|line| !line.trim().starts_with("----"))
    .map(|line| line.strip_prefix("  ").unwrap_or(line));

  let mut notes = String::new();
  for (index, line) in body.enumerate() {
    let starts_section = line.chars().next().is_some_and(|c| !c.is_whitespace());
    if index > 0 && starts_section {
      notes.push('\n');
    }
    notes.push_str(line);
  }

  notes.trim().to_string()
}
