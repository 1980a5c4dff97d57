//! CLI commands for mod-release
//!
//! - **release**: validate, package, snapshot and prepare the publish commands

pub mod release;

pub use release::{ReleaseOptions, run_release};
