//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

pub const SEPARATOR: &str = "---------------------------------------------------------------------------------------------------";

const FAKE_7Z: &str = r#"#!/bin/sh
case "$1" in
  --help) exit 0 ;;
  a) printf 'fake 7z archive' > "$2"; exit 0 ;;
  *) exit 2 ;;
esac
"#;

const FAKE_GH: &str = "#!/bin/sh\nexit 0\n";

/// A mod repository inside `<tmp>/work`, with fake tools in `<tmp>/bin`
pub struct TestMod {
  _root: TempDir,
  pub path: PathBuf,
  pub output: PathBuf,
  bin: PathBuf,
}

impl TestMod {
  /// Create a mod with `info.json` at `version` and one changelog entry per version
  pub fn new(version: &str, changelog_versions: &[&str]) -> Result<Self> {
    let root = TempDir::new()?;
    let output = root.path().join("work");
    let path = output.join("mymod");
    let bin = root.path().join("bin");
    std::fs::create_dir_all(&path)?;
    std::fs::create_dir_all(&bin)?;

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;

    std::fs::write(
      path.join("info.json"),
      format!(
        r#"{{
  "name": "mymod",
  "version": "{}",
  "title": "My Mod",
  "factorio_version": "2.0"
}}
"#,
        version
      ),
    )?;

    let mut changelog = String::new();
    for v in changelog_versions {
      changelog.push_str(&format!(
        "{SEPARATOR}\nVersion: {v}\nDate: 2025-01-01\n  Features:\n    - Changes for {v}\n"
      ));
    }
    std::fs::write(path.join("changelog.txt"), changelog)?;
    std::fs::write(path.join("control.lua"), "script.on_init(function() end)\n")?;
    std::fs::create_dir_all(path.join("locale/en"))?;
    std::fs::write(path.join("locale/en/strings.cfg"), "[mod-name]\nmymod=My Mod\n")?;
    std::fs::create_dir_all(path.join("scripts"))?;
    std::fs::write(path.join("scripts/release.sh"), "#!/bin/sh\n")?;

    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "Initial mod"])?;

    let test_mod = Self {
      _root: root,
      path,
      output,
      bin,
    };
    test_mod.install_tool("7z", FAKE_7Z)?;
    test_mod.install_tool("gh", FAKE_GH)?;
    Ok(test_mod)
  }

  /// Put an executable script on the test PATH
  pub fn install_tool(&self, name: &str, script: &str) -> Result<()> {
    let tool = self.bin.join(name);
    std::fs::write(&tool, script)?;
    std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
  }

  /// Remove a fake tool again
  pub fn remove_tool(&self, name: &str) -> Result<()> {
    std::fs::remove_file(self.bin.join(name))?;
    Ok(())
  }

  /// Create a lightweight tag
  pub fn tag(&self, name: &str) -> Result<()> {
    git(&self.path, &["tag", name])?;
    Ok(())
  }

  /// Tags currently in the repository
  pub fn tags(&self) -> Result<Vec<String>> {
    let output = git(&self.path, &["tag", "-l"])?;
    Ok(
      String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(String::from)
        .collect(),
    )
  }

  /// Check if a file exists inside the mod
  pub fn file_exists(&self, path: &str) -> bool {
    self.path.join(path).exists()
  }

  /// Read a file inside the mod
  pub fn read_file(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }

  /// Names in the output directory, sorted
  pub fn output_entries(&self) -> Result<Vec<String>> {
    let mut names = std::fs::read_dir(&self.output)?
      .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
      .collect::<std::io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
  }

  /// Run mod-release against this mod, feeding `stdin`
  pub fn run(&self, args: &[&str], stdin: &str) -> Result<Output> {
    let path_var = match std::env::var_os("PATH") {
      Some(existing) => {
        let mut paths = vec![self.bin.clone()];
        paths.extend(std::env::split_paths(&existing));
        std::env::join_paths(paths)?
      }
      None => self.bin.clone().into_os_string(),
    };

    let mut child = Command::new(env!("CARGO_BIN_EXE_mod-release"))
      .current_dir(&self.path)
      .env("PATH", path_var)
      .env_remove("RUST_LOG")
      .args(args)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .context("Failed to run mod-release")?;

    // The binary may exit before reading anything (early validation failures)
    if let Some(mut input) = child.stdin.take()
      && let Err(e) = input.write_all(stdin.as_bytes())
      && e.kind() != std::io::ErrorKind::BrokenPipe
    {
      return Err(e.into());
    }

    Ok(child.wait_with_output()?)
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// stdout and stderr as strings
pub fn text(output: &Output) -> (String, String) {
  (
    String::from_utf8_lossy(&output.stdout).into_owned(),
    String::from_utf8_lossy(&output.stderr).into_owned(),
  )
}
