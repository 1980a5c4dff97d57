//! Utility functions for cross-platform path handling

use std::path::{Component, Path};

/// Convert a relative path to archive format (always forward slashes)
///
/// Zip entry names use `/` regardless of platform. Only normal components are kept,
/// so `./a/../b` style inputs can't produce entries outside the archive root.
pub fn path_to_archive_format(path: &Path) -> String {
  path
    .components()
    .filter_map(|component| match component {
      Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
      _ => None,
    })
    .collect::<Vec<_>>()
    .join("/")
}

/// Archive entry name for `relative` inside the top-level folder `root`
pub fn archive_entry_name(root: &str, relative: &Path) -> String {
  format!("{}/{}", root, path_to_archive_format(relative))
}
