mod commands;
mod core;
mod logging;
mod release;
mod ui;
mod utils;

use clap::Parser;
use core::error::{ReleaseError, print_error};
use std::path::PathBuf;

/// Package a mod, snapshot it, and print the commands that tag and publish the release
#[derive(Parser)]
#[command(name = "mod-release")]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
struct Cli {
  /// Mod directory containing info.json and changelog.txt (default: current directory)
  #[arg(long, value_name = "DIR")]
  project_dir: Option<PathBuf>,

  /// Executable launched for the manual test run
  #[arg(long, visible_alias = "factorio-path", value_name = "PATH")]
  test_executable: Option<PathBuf>,

  /// Skip the manual test run
  #[arg(long, visible_alias = "skip-factorio")]
  skip_test: bool,

  /// Keep the project directory intact after packaging
  #[arg(long)]
  skip_clean: bool,

  /// Config file (default: release.toml, .release.toml or .config/release.toml in the project)
  #[arg(long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Debug logging on stderr (RUST_LOG overrides)
  #[arg(short, long)]
  verbose: bool,
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  let cli = Cli::parse();
  logging::init(cli.verbose);

  let result = commands::run_release(commands::ReleaseOptions {
    project_dir: cli.project_dir,
    config: cli.config,
    test_executable: cli.test_executable,
    skip_test: cli.skip_test,
    skip_clean: cli.skip_clean,
  });

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: ReleaseError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
