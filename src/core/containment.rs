//! Path containment checks
//!
//! Every path the release touches is resolved to its canonical form before it is
//! compared against a boundary. Resolution works for paths that do not exist yet:
//! the existing prefix is canonicalized (symlinks followed, dangling ones included),
//! the missing tail is normalized lexically.

use crate::core::error::{BuildError, ReleaseError, ReleaseResult};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Maximum symlink hops before resolution gives up (matches Linux `ELOOP`)
const MAX_SYMLINK_HOPS: usize = 40;

/// What a path must satisfy beyond living under the allowed root
#[derive(Debug, Clone, Default)]
pub struct ContainmentPolicy {
  /// Subtree that must never be targeted
  pub protected: Option<PathBuf>,
  /// Let the path touch the protected subtree (reads only)
  pub allow_protected: bool,
  /// Path's parent must be exactly the allowed root
  pub require_direct_child: bool,
  /// Also reject paths that contain the protected subtree (deletes)
  pub protect_ancestors: bool,
}

impl ContainmentPolicy {
  /// Policy for destructive operations: stay out of `protected`
  pub fn guarding(protected: &Path) -> Self {
    Self {
      protected: Some(protected.to_path_buf()),
      allow_protected: false,
      require_direct_child: false,
      protect_ancestors: false,
    }
  }

  /// Policy for deletes: neither `protected` nor anything containing it
  pub fn deleting(protected: &Path) -> Self {
    Self {
      protect_ancestors: true,
      ..Self::guarding(protected)
    }
  }

  /// Policy for newly created release artifacts
  pub fn direct_child() -> Self {
    Self {
      protected: None,
      allow_protected: false,
      require_direct_child: true,
      protect_ancestors: false,
    }
  }

  /// Same policy, but reads of the protected subtree are allowed
  #[allow(dead_code)]
  pub fn allowing_protected(mut self) -> Self {
    self.allow_protected = true;
    self
  }
}

/// Validate that `path` stays inside `allowed_root` under `policy`
///
/// Returns the canonical path on success. Failures always carry the attempted path and
/// the boundary it failed to respect; nothing is ever silently corrected.
pub fn validate(path: &Path, allowed_root: &Path, policy: &ContainmentPolicy) -> ReleaseResult<PathBuf> {
  let root = resolve(allowed_root)?;
  let canonical = resolve(path)?;

  if !canonical.starts_with(&root) {
    return Err(ReleaseError::Build(BuildError::OutsideBoundary {
      path: canonical,
      boundary: root,
    }));
  }

  if let Some(protected) = &policy.protected
    && !policy.allow_protected
  {
    let protected = resolve(protected)?;
    let contains_protected = policy.protect_ancestors && protected.starts_with(&canonical);
    if canonical.starts_with(&protected) || contains_protected {
      return Err(ReleaseError::Build(BuildError::ProtectedPath { path: canonical, protected }));
    }
  }

  if policy.require_direct_child && canonical.parent() != Some(root.as_path()) {
    return Err(ReleaseError::Build(BuildError::NotDirectChild {
      path: canonical,
      boundary: root,
    }));
  }

  Ok(canonical)
}

/// Check whether `path` is `root` or lies beneath it, without erroring
pub fn is_within(path: &Path, root: &Path) -> bool {
  match (resolve(path), resolve(root)) {
    (Ok(path), Ok(root)) => path.starts_with(root),
    _ => false,
  }
}

/// Resolve a path to canonical absolute form, whether or not it exists
pub fn resolve(path: &Path) -> io::Result<PathBuf> {
  let absolute = if path.is_absolute() {
    path.to_path_buf()
  } else {
    std::env::current_dir()?.join(path)
  };
  resolve_with_budget(&absolute, &mut 0)
}

fn resolve_with_budget(absolute: &Path, hops: &mut usize) -> io::Result<PathBuf> {
  let mut resolved = PathBuf::new();

  for component in absolute.components() {
    match component {
      Component::Prefix(_) | Component::RootDir => resolved.push(component.as_os_str()),
      Component::CurDir => {}
      Component::ParentDir => {
        // `resolved` is canonical up to here, so popping is the real `..`
        resolved.pop();
      }
      Component::Normal(name) => {
        resolved.push(name);
        match fs::canonicalize(&resolved) {
          Ok(canonical) => resolved = canonical,
          Err(err) if err.kind() == io::ErrorKind::NotFound => {
            if let Ok(meta) = fs::symlink_metadata(&resolved)
              && meta.file_type().is_symlink()
            {
              // Dangling symlink: writes would follow it, so resolve where it points
              *hops += 1;
              if *hops > MAX_SYMLINK_HOPS {
                return Err(io::Error::other(format!(
                  "too many levels of symbolic links: {}",
                  resolved.display()
                )));
              }
              let target = fs::read_link(&resolved)?;
              resolved.pop();
              let target = if target.is_absolute() { target } else { resolved.join(target) };
              resolved = resolve_with_budget(&target, hops)?;
            }
          }
          Err(err) => return Err(err),
        }
      }
    }
  }

  Ok(resolved)
}
