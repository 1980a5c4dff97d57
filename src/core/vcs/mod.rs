pub mod system_git;

pub use system_git::SystemGit;

use crate::core::error::ReleaseResult;

/// Read-only view of the repository's tags
///
/// The release only ever asks questions of version control. Anything that would
/// change it goes through the deferred command queue instead.
pub trait TagLookup {
  /// Whether `tag` exists in the local repository
  fn tag_exists(&self, tag: &str) -> ReleaseResult<bool>;
}
