//! Deferred command queue
//!
//! Tagging and publishing have effects nobody can take back, so the pipeline never runs
//! them. It records each one here instead, and the queue renders them as a transcript
//! the operator reads and pastes into a shell.
//!
//! ```text
//! Pipeline stage
//!   ↓ enqueue
//! CommandQueue (append-only, FIFO)
//!   ↓ render_all
//! Transcript on stdout
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

const BANNER_WIDTH: usize = 70;

/// Which external tool a deferred command belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
  /// Version control (`git`)
  Vcs,
  /// Release publisher (`gh`)
  Publisher,
}

impl CommandKind {
  /// Executable the operator will run
  pub fn program(self) -> &'static str {
    match self {
      CommandKind::Vcs => "git",
      CommandKind::Publisher => "gh",
    }
  }
}

impl fmt::Display for CommandKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program())
  }
}

/// One command the operator has to run by hand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedCommand {
  kind: CommandKind,
  arguments: Vec<String>,
  description: String,
}

impl QueuedCommand {
  pub fn new<I, S>(kind: CommandKind, arguments: I, description: impl Into<String>) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      kind,
      arguments: arguments.into_iter().map(Into::into).collect(),
      description: description.into(),
    }
  }

  /// Version-control command
  pub fn vcs<I, S>(arguments: I, description: impl Into<String>) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self::new(CommandKind::Vcs, arguments, description)
  }

  /// Publisher command
  pub fn publisher<I, S>(arguments: I, description: impl Into<String>) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self::new(CommandKind::Publisher, arguments, description)
  }

  pub fn kind(&self) -> CommandKind {
    self.kind
  }

  pub fn arguments(&self) -> &[String] {
    &self.arguments
  }

  pub fn description(&self) -> &str {
    &self.description
  }

  /// Shell-ready command line
  pub fn command_line(&self) -> String {
    std::iter::once(self.kind().program().to_string())
      .chain(self.arguments().iter().map(|arg| shell_quote(arg)))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

impl fmt::Display for QueuedCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.command_line())
  }
}

/// Append-only list of deferred commands, in the order they must run
#[derive(Debug, Clone)]
pub struct CommandQueue {
  working_dir: PathBuf,
  commands: Vec<QueuedCommand>,
}

impl CommandQueue {
  /// Create an empty queue whose commands run from `working_dir`
  pub fn new(working_dir: impl Into<PathBuf>) -> Self {
    Self {
      working_dir: working_dir.into(),
      commands: Vec::new(),
    }
  }

  /// Record a command; it is never executed by this process
  pub fn enqueue(&mut self, command: QueuedCommand) {
    self.commands.push(command);
  }

  pub fn commands(&self) -> &[QueuedCommand] {
    &self.commands
  }

  pub fn working_dir(&self) -> &Path {
    &self.working_dir
  }

  pub fn len(&self) -> usize {
    self.commands.len()
  }

  pub fn is_empty(&self) -> bool {
    self.commands.is_empty()
  }

  /// Render the transcript, oldest command first
  ///
  /// Pure formatting. An empty queue renders as an empty string.
  pub fn render_all(&self) -> String {
    if self.is_empty() {
      return String::new();
    }

    let banner = "=".repeat(BANNER_WIDTH);
    let mut output = String::new();

    output.push_str(&format!("{}\n", banner));
    output.push_str("REMOTE COMMANDS TO RUN MANUALLY:\n");
    output.push_str(&format!("{}\n\n", banner));
    output.push_str(&format!(
      "cd {}\n\n",
      shell_quote(&self.working_dir().to_string_lossy())
    ));

    for command in self.commands() {
      if !command.description().is_empty() {
        output.push_str(&format!("# {}\n", command.description()));
      }
      output.push_str(&format!("{}\n\n", command.command_line()));
    }

    output.push_str(&format!("{}\n", banner));
    output
  }
}

/// Quote an argument for POSIX shells when it needs it
fn shell_quote(arg: &str) -> String {
  let safe = !arg.is_empty()
    && arg
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':' | '@' | '%' | '+' | '=' | ','));

  if safe {
    arg.to_string()
  } else {
    format!("'{}'", arg.replace('\'', r"'\''"))
  }
}
