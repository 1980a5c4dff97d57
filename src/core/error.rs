//! Error types for mod-release with contextual messages and exit codes
//!
//! Every precondition the pipeline enforces has a [`BuildError`] variant. Those are
//! the classified failures: they print one clear message (plus a hint when there is
//! an obvious fix) and exit with [`ExitCode::Build`]. Anything else is unexpected and
//! is printed with full diagnostic detail.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for mod-release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// A release precondition failed (versions, boundaries, tags, tools)
  Build = 1,
  /// Something nobody planned for (I/O, archive writer, malformed JSON plumbing)
  Unexpected = 2,
  /// Input closed while waiting for the operator
  Interrupted = 130,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for mod-release
#[derive(Debug)]
pub enum ReleaseError {
  /// Classified release failure
  Build(BuildError),

  /// I/O errors
  Io(io::Error),

  /// Operator closed stdin at a prompt
  Interrupted,

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl ReleaseError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    ReleaseError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      ReleaseError::Message { message, context, help } => ReleaseError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      ReleaseError::Io(err) => ReleaseError::Message {
        message: format!("I/O error: {}", err),
        context: Some(ctx_str),
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      ReleaseError::Build(_) => ExitCode::Build,
      ReleaseError::Interrupted => ExitCode::Interrupted,
      ReleaseError::Io(_) | ReleaseError::Message { .. } => ExitCode::Unexpected,
    }
  }

  /// Whether this is one of the classified build failures
  pub fn is_build_error(&self) -> bool {
    matches!(self, ReleaseError::Build(_))
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      ReleaseError::Build(e) => e.help_message(),
      ReleaseError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for ReleaseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReleaseError::Build(e) => write!(f, "{}", e),
      ReleaseError::Io(e) => write!(f, "I/O error: {}", e),
      ReleaseError::Interrupted => write!(f, "Release cancelled: input closed while waiting for confirmation"),
      ReleaseError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for ReleaseError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ReleaseError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<BuildError> for ReleaseError {
  fn from(err: BuildError) -> Self {
    ReleaseError::Build(err)
  }
}

impl From<io::Error> for ReleaseError {
  fn from(err: io::Error) -> Self {
    ReleaseError::Io(err)
  }
}

impl From<String> for ReleaseError {
  fn from(msg: String) -> Self {
    ReleaseError::message(msg)
  }
}

impl From<&str> for ReleaseError {
  fn from(msg: &str) -> Self {
    ReleaseError::message(msg)
  }
}

impl From<serde_json::Error> for ReleaseError {
  fn from(err: serde_json::Error) -> Self {
    ReleaseError::message(format!("JSON error: {}", err))
  }
}

impl From<toml_edit::de::Error> for ReleaseError {
  fn from(err: toml_edit::de::Error) -> Self {
    ReleaseError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<zip::result::ZipError> for ReleaseError {
  fn from(err: zip::result::ZipError) -> Self {
    ReleaseError::message(format!("Archive error: {}", err))
  }
}

impl From<walkdir::Error> for ReleaseError {
  fn from(err: walkdir::Error) -> Self {
    ReleaseError::message(format!("Directory walk error: {}", err))
  }
}

impl From<std::path::StripPrefixError> for ReleaseError {
  fn from(err: std::path::StripPrefixError) -> Self {
    ReleaseError::message(format!("Path strip prefix error: {}", err))
  }
}

impl From<anyhow::Error> for ReleaseError {
  fn from(err: anyhow::Error) -> Self {
    ReleaseError::message(format!("{:#}", err))
  }
}

/// Where a version string came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSource {
  Metadata,
  Changelog,
  PreviousChangelog,
}

impl fmt::Display for VersionSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      VersionSource::Metadata => write!(f, "info.json"),
      VersionSource::Changelog => write!(f, "changelog.txt"),
      VersionSource::PreviousChangelog => write!(f, "changelog.txt (previous entry)"),
    }
  }
}

/// Classified release failures
#[derive(Debug)]
pub enum BuildError {
  /// A required input file does not exist
  MissingFile { path: PathBuf },

  /// A required field is absent from the metadata
  MissingField { file: PathBuf, field: String },

  /// Metadata could not be parsed
  MalformedMetadata { file: PathBuf, reason: String },

  /// Changelog has no `Version:` entry
  NoChangelogVersion { file: PathBuf },

  /// Version string is not `vX.Y.Z`
  InvalidVersion { source: VersionSource, version: String },

  /// Metadata and changelog disagree
  VersionMismatch { metadata: String, changelog: String },

  /// Path resolved outside the directory it must stay in
  OutsideBoundary { path: PathBuf, boundary: PathBuf },

  /// Path resolved to the protected VCS directory or below it
  ProtectedPath { path: PathBuf, protected: PathBuf },

  /// Output artifact is not a direct child of the output directory
  NotDirectChild { path: PathBuf, boundary: PathBuf },

  /// Expected a regular file
  NotAFile { path: PathBuf },

  /// Expected a directory
  NotADirectory { path: PathBuf },

  /// Project directory fails the startup sanity checks
  UnsafeProjectRoot { path: PathBuf, reason: String },

  /// None of the candidate executables could be run
  ToolMissing { tools: Vec<String>, hint: String },

  /// External tool exited unsuccessfully
  ToolFailed { command: String, stderr: String },

  /// A read-only git query failed
  GitCommandFailed { command: String, stderr: String },

  /// Project directory is not a git repository
  RepoNotFound { path: PathBuf },

  /// Release tag already exists
  TagExists { tag: String },

  /// Changelog names a previous release that was never tagged
  PreviousTagMissing { tag: String },

  /// Package archive vanished before the publish command was prepared
  PackageMissing { path: PathBuf },

  /// Configured test executable does not exist
  TestExecutableMissing { path: Option<PathBuf> },

  /// Configuration file contents are invalid
  InvalidConfig { path: Option<PathBuf>, reason: String },
}

impl BuildError {
  fn help_message(&self) -> Option<String> {
    match self {
      BuildError::MissingFile { path } => Some(format!("Run from the mod directory or pass --project-dir (looked for {})", path.display())),
      BuildError::InvalidVersion { .. } => Some("Versions must look like 1.2.3 (or v1.2.3): three numeric components, nothing else.".to_string()),
      BuildError::VersionMismatch { .. } => {
        Some("Bump the version in info.json and add a matching `Version:` entry at the top of changelog.txt.".to_string())
      }
      BuildError::ToolMissing { hint, .. } => Some(hint.clone()),
      BuildError::TagExists { tag } => Some(format!(
        "Bump the version, or delete the stale tag yourself if it was never pushed: git tag -d {}",
        tag
      )),
      BuildError::PreviousTagMissing { tag } => Some(format!(
        "Fetch tags (git fetch --tags) or tag the previous release ({}) before releasing a new one.",
        tag
      )),
      BuildError::RepoNotFound { path } => Some(format!("Initialize or clone the repository first: {}", path.display())),
      BuildError::TestExecutableMissing { .. } => {
        Some("Pass --test-executable <PATH>, set tools.test_executable in release.toml, or use --skip-test.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildError::MissingFile { path } => write!(f, "Required file not found: {}", path.display()),
      BuildError::MissingField { file, field } => {
        write!(f, "'{}' field not found in {}", field, file.display())
      }
      BuildError::MalformedMetadata { file, reason } => {
        write!(f, "Could not parse {}: {}", file.display(), reason)
      }
      BuildError::NoChangelogVersion { file } => write!(f, "No version found in {}", file.display()),
      BuildError::InvalidVersion { source, version } => {
        write!(f, "Version in {} '{}' is not in vX.Y.Z format", source, version)
      }
      BuildError::VersionMismatch { metadata, changelog } => write!(
        f,
        "Version mismatch!\n  info.json:      {}\n  changelog.txt:  {}",
        metadata, changelog
      ),
      BuildError::OutsideBoundary { path, boundary } => write!(
        f,
        "SAFETY: Path outside allowed directory!\n  Path:     {}\n  Boundary: {}",
        path.display(),
        boundary.display()
      ),
      BuildError::ProtectedPath { path, protected } => write!(
        f,
        "SAFETY: Refusing to modify version-control metadata!\n  Path:      {}\n  Protected: {}",
        path.display(),
        protected.display()
      ),
      BuildError::NotDirectChild { path, boundary } => write!(
        f,
        "SAFETY: Path not a direct child of the output directory!\n  Path:   {}\n  Output: {}",
        path.display(),
        boundary.display()
      ),
      BuildError::NotAFile { path } => write!(f, "SAFETY: Not a file: {}", path.display()),
      BuildError::NotADirectory { path } => write!(f, "SAFETY: Not a directory: {}", path.display()),
      BuildError::UnsafeProjectRoot { path, reason } => {
        write!(f, "Unsafe project directory {}: {}", path.display(), reason)
      }
      BuildError::ToolMissing { tools, .. } => write!(f, "None of these tools could be run: {}", tools.join(", ")),
      BuildError::ToolFailed { command, stderr } => write!(f, "{} failed:\n{}", command, stderr.trim_end()),
      BuildError::GitCommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr.trim_end())
      }
      BuildError::RepoNotFound { path } => write!(f, "Git repository not found at: {}", path.display()),
      BuildError::TagExists { tag } => write!(f, "Git tag {} already exists!", tag),
      BuildError::PreviousTagMissing { tag } => write!(
        f,
        "Previous tag {} not found in git!\nExpected tag from previous version in changelog.",
        tag
      ),
      BuildError::PackageMissing { path } => write!(f, "Package file not found: {}", path.display()),
      BuildError::TestExecutableMissing { path: Some(path) } => {
        write!(f, "Test executable not found at {}", path.display())
      }
      BuildError::TestExecutableMissing { path: None } => write!(f, "No test executable configured"),
      BuildError::InvalidConfig { path: Some(path), reason } => {
        write!(f, "Invalid configuration in {}: {}", path.display(), reason)
      }
      BuildError::InvalidConfig { path: None, reason } => write!(f, "Invalid configuration: {}", reason),
    }
  }
}

/// Result type alias for mod-release
pub type ReleaseResult<T> = Result<T, ReleaseError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> ReleaseResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> ReleaseResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<ReleaseError>,
{
  fn context(self, ctx: impl Into<String>) -> ReleaseResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> ReleaseResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
///
/// Classified failures get one message; anything else also gets its debug form so the
/// operator has something to paste into a bug report.
pub fn print_error(error: &ReleaseError) {
  if error.is_build_error() {
    eprintln!("\n❌ ERROR: {}\n", error);
  } else if let ReleaseError::Interrupted = error {
    eprintln!("\n⚠️  {}\n", error);
  } else {
    eprintln!("\n❌ UNEXPECTED ERROR: {}\n", error);
    eprintln!("Details: {:#?}\n", error);
  }

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
