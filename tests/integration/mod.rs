//! Integration tests for mod-release
//!
//! Each test builds a throwaway mod repository, puts fake `7z` and `gh` scripts on
//! PATH, and runs the compiled binary against it.

#![cfg(unix)]

mod helpers;
mod test_release;
mod test_safety;
