//! Release pipeline for a single mod directory
//!
//! # Invariants
//!
//! 1. **Versions agree before anything is touched**
//!    - `info.json` and the newest `changelog.txt` entry must name the same `vX.Y.Z`
//!
//! 2. **Only the file layer mutates the filesystem**
//!    - Package, notes and cleanup all go through `SafeFileOps`
//!    - The backup target is validated before the external archiver runs
//!
//! 3. **Nothing irreversible runs**
//!    - Tagging, pushing and publishing are queued and printed, never executed
//!
//! # Layout
//!
//! - **version / metadata / changelog**: inputs read during validation
//! - **package**: zip archive and artifact names
//! - **tools**: archiver, test launcher, prompt and tool availability check
//! - **pipeline**: the stage table and one function per stage

pub mod changelog;
pub mod metadata;
pub mod package;
pub mod pipeline;
pub mod tools;
pub mod version;

pub use pipeline::{Collaborators, ReleasePipeline, RunOutcome};
