//! Core engine for mod-release
//!
//! - **config**: release.toml parsing and the merged `ReleaseSettings`
//! - **containment**: canonical path resolution and boundary checks
//! - **error**: error types with contextual help messages
//! - **fs_ops**: the only code allowed to delete, create or write files
//! - **queue**: deferred commands the operator runs by hand
//! - **vcs**: read-only git queries (SystemGit)

pub mod config;
pub mod containment;
pub mod error;
pub mod fs_ops;
pub mod queue;
pub mod vcs;
