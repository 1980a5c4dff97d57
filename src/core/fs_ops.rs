//! Safety-gated filesystem mutation
//!
//! `SafeFileOps` is the only place in the crate that deletes, creates or writes files.
//! Every request is resolved and checked against the project/output boundaries before
//! anything happens; a failed check means no side effect at all.

use crate::core::containment::{ContainmentPolicy, is_within, resolve, validate};
use crate::core::error::{BuildError, ReleaseError, ReleaseResult, ResultExt};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A single mutation request
///
/// Consumed by [`SafeFileOps::apply`], so a request runs at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
  DeleteFile(PathBuf),
  DeleteTree(PathBuf),
  WriteFile { path: PathBuf, contents: Vec<u8> },
  MakeDirectory(PathBuf),
}

impl Operation {
  /// Target path of the request
  pub fn target(&self) -> &Path {
    match self {
      Operation::DeleteFile(path) | Operation::DeleteTree(path) | Operation::MakeDirectory(path) => path,
      Operation::WriteFile { path, .. } => path,
    }
  }
}

/// Boundary-checked file operations for one project
#[derive(Debug, Clone)]
pub struct SafeFileOps {
  project_root: PathBuf,
  output_root: PathBuf,
  protected: PathBuf,
}

impl SafeFileOps {
  /// Build the file layer for `project_root`
  ///
  /// The project root is canonicalized and must not be the filesystem root. The output
  /// root is always its parent, and `vcs_dir` names the protected subtree inside it.
  pub fn new(project_root: &Path, vcs_dir: &str) -> ReleaseResult<Self> {
    let project_root = fs::canonicalize(project_root)
      .with_context(|| format!("Failed to resolve project directory {}", project_root.display()))?;

    if !project_root.is_dir() {
      return Err(ReleaseError::Build(BuildError::UnsafeProjectRoot {
        path: project_root,
        reason: "not a directory".to_string(),
      }));
    }

    let output_root = match project_root.parent() {
      Some(parent) if parent != project_root => parent.to_path_buf(),
      _ => {
        return Err(ReleaseError::Build(BuildError::UnsafeProjectRoot {
          path: project_root,
          reason: "project directory cannot be the filesystem root".to_string(),
        }));
      }
    };

    let protected = project_root.join(vcs_dir);

    Ok(Self {
      project_root,
      output_root,
      protected,
    })
  }

  pub fn project_root(&self) -> &Path {
    &self.project_root
  }

  pub fn output_root(&self) -> &Path {
    &self.output_root
  }

  pub fn protected(&self) -> &Path {
    &self.protected
  }

  /// Delete a regular file inside the project
  ///
  /// A symlink is removed itself, never its target.
  pub fn delete_file(&self, path: &Path) -> ReleaseResult<()> {
    if let Some(link) = self.symlink_location(path)? {
      return self.unlink(&link);
    }
    let validated = self.validate_for_delete(path)?;
    if !validated.is_file() {
      return Err(ReleaseError::Build(BuildError::NotAFile { path: validated }));
    }
    debug!(path = %validated.display(), "removing file");
    fs::remove_file(&validated).with_context(|| format!("Failed to remove {}", validated.display()))
  }

  /// Delete a directory tree inside the project
  ///
  /// A symlink is removed itself, never its target. The tree must not contain the
  /// protected subtree, so the project root itself can never be deleted.
  pub fn delete_tree(&self, path: &Path) -> ReleaseResult<()> {
    if let Some(link) = self.symlink_location(path)? {
      return self.unlink(&link);
    }
    let validated = self.validate_for_delete(path)?;
    if !validated.is_dir() {
      return Err(ReleaseError::Build(BuildError::NotADirectory { path: validated }));
    }
    debug!(path = %validated.display(), "removing directory tree");
    fs::remove_dir_all(&validated).with_context(|| format!("Failed to remove {}", validated.display()))
  }

  /// Write `contents` to a file inside the project or directly inside the output root
  pub fn write_file(&self, path: &Path, contents: impl AsRef<[u8]>) -> ReleaseResult<()> {
    let resolved = resolve(path).with_context(|| format!("Failed to resolve {}", path.display()))?;

    let validated = if is_within(&resolved, &self.project_root) {
      self.validate_in_project(&resolved)?
    } else if is_within(&resolved, &self.output_root) {
      self.validate_output_target(&resolved)?
    } else {
      return Err(ReleaseError::Build(BuildError::OutsideBoundary {
        path: resolved,
        boundary: self.output_root.clone(),
      }));
    };

    debug!(path = %validated.display(), bytes = contents.as_ref().len(), "writing file");
    fs::write(&validated, contents).with_context(|| format!("Failed to write {}", validated.display()))
  }

  /// Create one directory level inside the project (no-op when it already exists)
  pub fn make_directory(&self, path: &Path) -> ReleaseResult<()> {
    let validated = self.validate_in_project(path)?;
    if validated.is_dir() {
      return Ok(());
    }
    debug!(path = %validated.display(), "creating directory");
    fs::create_dir(&validated).with_context(|| format!("Failed to create {}", validated.display()))
  }

  /// Execute a request through the matching gated operation
  pub fn apply(&self, operation: Operation) -> ReleaseResult<()> {
    debug!(target = %operation.target().display(), "applying operation");
    match operation {
      Operation::DeleteFile(path) => self.delete_file(&path),
      Operation::DeleteTree(path) => self.delete_tree(&path),
      Operation::WriteFile { path, contents } => self.write_file(&path, contents),
      Operation::MakeDirectory(path) => self.make_directory(&path),
    }
  }

  /// Validate a release artifact path that will be created in the output root
  ///
  /// Used directly for artifacts produced by external tools, which write the file
  /// themselves.
  pub fn validate_output_target(&self, path: &Path) -> ReleaseResult<PathBuf> {
    validate(path, &self.output_root, &ContainmentPolicy::direct_child())
  }

  fn validate_in_project(&self, path: &Path) -> ReleaseResult<PathBuf> {
    validate(path, &self.project_root, &ContainmentPolicy::guarding(&self.protected))
  }

  fn validate_for_delete(&self, path: &Path) -> ReleaseResult<PathBuf> {
    validate(path, &self.project_root, &ContainmentPolicy::deleting(&self.protected))
  }

  /// Canonical location of `path` when it is a symlink, checked by where the link lives
  fn symlink_location(&self, path: &Path) -> ReleaseResult<Option<PathBuf>> {
    if !fs::symlink_metadata(path).is_ok_and(|meta| meta.file_type().is_symlink()) {
      return Ok(None);
    }
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
      return Ok(None);
    };

    let parent = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
    let location = self.validate_in_project(parent)?.join(name);
    if location.starts_with(&self.protected) {
      return Err(ReleaseError::Build(BuildError::ProtectedPath {
        path: location,
        protected: self.protected.clone(),
      }));
    }
    Ok(Some(location))
  }

  fn unlink(&self, link: &Path) -> ReleaseResult<()> {
    debug!(path = %link.display(), "removing symlink");
    fs::remove_file(link).with_context(|| format!("Failed to remove {}", link.display()))
  }
}
