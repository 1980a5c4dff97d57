//! Diagnostic tracing for release runs
//!
//! Status lines for the operator are plain `println!` in the stages. This module only
//! covers debug output: per-file archive additions, stage transitions and every
//! file-layer mutation, written to stderr.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber
///
/// `RUST_LOG` wins when set. Otherwise `--verbose` selects `debug` and the default is
/// `warn`. Output: stderr, compact format.
///
/// ```bash
/// RUST_LOG=mod_release=trace mod-release --skip-test
/// ```
pub fn init(verbose: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(std::io::stderr).compact())
    .init();
}

fn default_directive(verbose: bool) -> &'static str {
  if verbose { "debug" } else { "warn" }
}
