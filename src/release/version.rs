//! Release version strings (`vMAJOR.MINOR.PATCH`)

use crate::core::error::{BuildError, ReleaseError, ReleaseResult, VersionSource};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static VERSION_PATTERN: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^v[0-9]+\.[0-9]+\.[0-9]+$").expect("version pattern is valid"));

/// A validated release version, always rendered with its `v` prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseVersion(String);

impl ReleaseVersion {
  /// Normalize and validate a raw version string
  ///
  /// A missing leading `v` is added; nothing else is forgiven (no trimming, no
  /// pre-release suffixes, exactly three numeric components).
  pub fn parse(raw: &str, source: VersionSource) -> ReleaseResult<Self> {
    let normalized = normalize(raw);
    if !is_valid(&normalized) {
      return Err(ReleaseError::Build(BuildError::InvalidVersion {
        source,
        version: normalized,
      }));
    }
    Ok(Self(normalized))
  }

  /// Tag name, e.g. `v1.2.3`
  pub fn tag(&self) -> &str {
    &self.0
  }

  /// Version without the prefix, e.g. `1.2.3`
  pub fn number(&self) -> &str {
    &self.0[1..]
  }
}

impl fmt::Display for ReleaseVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Prepend `v` unless already present
pub fn normalize(raw: &str) -> String {
  if raw.starts_with('v') {
    raw.to_string()
  } else {
    format!("v{}", raw)
  }
}

/// Whether a normalized version matches `vX.Y.Z`
pub fn is_valid(normalized: &str) -> bool {
  VERSION_PATTERN.is_match(normalized)
}
