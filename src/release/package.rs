//! Release archive (`<name>_<X.Y.Z>.zip`)
//!
//! The archive is assembled in memory and handed back as bytes; writing it to disk
//! goes through [`SafeFileOps`](crate::core::fs_ops::SafeFileOps) like every other
//! mutation.

use crate::core::config::ReleaseSettings;
use crate::core::error::{ReleaseResult, ResultExt};
use crate::release::version::ReleaseVersion;
use crate::ui::progress::ArchiveProgress;
use crate::utils::{archive_entry_name, path_to_archive_format};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// File name suffixes never shipped (old packages, backups, editor leftovers)
const EXCLUDED_SUFFIXES: &[&str] = &[".zip", ".7z", "~"];

/// `<name>_<X.Y.Z>`, the archive's top-level folder and file stem
pub fn artifact_base_name(name: &str, version: &ReleaseVersion) -> String {
  format!("{}_{}", name, version.number())
}

/// `<name>_<X.Y.Z>.zip`
pub fn package_file_name(name: &str, version: &ReleaseVersion) -> String {
  format!("{}.zip", artifact_base_name(name, version))
}

/// `<name>_<vX.Y.Z>_backup.<ext>`
pub fn backup_file_name(name: &str, version: &ReleaseVersion, extension: &str) -> String {
  format!("{}_{}_backup.{}", name, version.tag(), extension)
}

/// Which parts of the project directory go into the package
#[derive(Debug, Clone)]
pub struct PackageFilter {
  vcs_dir: String,
  top_level_excludes: Vec<String>,
}

impl PackageFilter {
  pub fn new(settings: &ReleaseSettings) -> Self {
    Self {
      vcs_dir: settings.vcs_dir.clone(),
      top_level_excludes: vec![settings.scripts_dir.clone(), settings.tmp_dir.clone()],
    }
  }

  /// Whether a walked directory should be descended into
  fn keeps_dir(&self, entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if name == self.vcs_dir {
      return false;
    }
    !(entry.depth() == 1 && self.top_level_excludes.iter().any(|excluded| *excluded == name))
  }

  /// Whether a walked file is shipped
  fn keeps_file(&self, entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    !EXCLUDED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
  }

  /// Project-relative paths of every file to ship, sorted by entry name
  pub fn collect(&self, project_root: &Path) -> ReleaseResult<Vec<PathBuf>> {
    let walker = WalkDir::new(project_root)
      .min_depth(1)
      .follow_links(false)
      .into_iter()
      .filter_entry(|entry| !entry.file_type().is_dir() || self.keeps_dir(entry));

    let mut files = Vec::new();
    for entry in walker {
      let entry = entry.context("Failed to walk project directory")?;
      let file_type = entry.file_type();

      if file_type.is_symlink() {
        tracing::debug!(path = %entry.path().display(), "skipping symlink");
        continue;
      }
      if !file_type.is_file() || !self.keeps_file(&entry) {
        continue;
      }

      files.push(entry.path().strip_prefix(project_root)?.to_path_buf());
    }

    files.sort_by_key(|path| path_to_archive_format(path));
    Ok(files)
  }
}

/// A finished archive held in memory
#[derive(Debug, Clone)]
pub struct Package {
  pub bytes: Vec<u8>,
  /// Entry names in archive order
  pub entries: Vec<String>,
}

impl Package {
  /// Lowercase hex SHA-256 of the archive bytes
  pub fn sha256(&self) -> String {
    sha256_hex(&self.bytes)
  }
}

/// Build the release archive for `project_root`
///
/// Every entry is stored under `root_name/`.
pub fn build_package(
  project_root: &Path,
  root_name: &str,
  filter: &PackageFilter,
  show_progress: bool,
) -> ReleaseResult<Package> {
  let files = filter.collect(project_root)?;

  let mut progress = if show_progress && !files.is_empty() {
    Some(ArchiveProgress::new(files.len(), format!("Packaging {}", root_name)))
  } else {
    None
  };

  let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
  let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
  let mut entries = Vec::with_capacity(files.len());

  for relative in &files {
    let entry_name = archive_entry_name(root_name, relative);
    tracing::debug!(entry = %entry_name, "adding to package");

    let contents = fs::read(project_root.join(relative))
      .with_context(|| format!("Failed to read {}", relative.display()))?;
    writer.start_file(entry_name.as_str(), options)?;
    writer.write_all(&contents)?;
    entries.push(entry_name);

    if let Some(ref mut p) = progress {
      p.inc();
    }
  }

  let bytes = writer.finish()?.into_inner();
  Ok(Package { bytes, entries })
}

pub fn sha256_hex(bytes: &[u8]) -> String {
  Sha256::digest(bytes).iter().map(|b| format!("{:02x}", b)).collect()
}
