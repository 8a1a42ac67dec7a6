//! Shell command execution.
//!
//! Every external tool (git, cmake, gh, package managers) is invoked through an
//! [`Executor`]. Commands inherit the process environment with the executor's
//! [`EnvOverlay`] applied on top.

mod types;

pub use types::*;

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

/// Runs shell commands with an environment overlay.
#[derive(Debug, Clone, Default)]
pub struct Executor {
  shell: Option<String>,
  overlay: EnvOverlay,
}

impl Executor {
  /// Create an executor.
  ///
  /// `shell` overrides the default system shell (`/bin/sh` on Unix, `cmd.exe` on Windows).
  pub fn new(shell: Option<String>) -> Self {
    Self {
      shell,
      overlay: EnvOverlay::new(),
    }
  }

  /// A copy running commands with `shell` instead, sharing the overlay's current values.
  pub fn with_shell(&self, shell: impl Into<String>) -> Self {
    Self {
      shell: Some(shell.into()),
      overlay: self.overlay.clone(),
    }
  }

  pub fn shell(&self) -> Option<&str> {
    self.shell.as_deref()
  }

  pub fn overlay(&self) -> &EnvOverlay {
    &self.overlay
  }

  pub fn overlay_mut(&mut self) -> &mut EnvOverlay {
    &mut self.overlay
  }

  /// Run a command with output streamed to the terminal.
  pub async fn run(&self, cmd: &str, cwd: Option<&Path>) -> Result<(), ExecuteError> {
    info!(cmd = %cmd, "executing command");

    let status = self
      .command(cmd, cwd)
      .stdin(Stdio::null())
      .stdout(Stdio::inherit())
      .stderr(Stdio::inherit())
      .status()
      .await
      .map_err(|source| ExecuteError::Spawn {
        cmd: cmd.to_string(),
        source,
      })?;

    if !status.success() {
      return Err(ExecuteError::CmdFailed {
        cmd: cmd.to_string(),
        code: status.code(),
      });
    }

    Ok(())
  }

  /// Run a command and return its trimmed stdout.
  pub async fn output(&self, cmd: &str, cwd: Option<&Path>) -> Result<String, ExecuteError> {
    debug!(cmd = %cmd, "executing command");

    let output = self
      .command(cmd, cwd)
      .stdin(Stdio::null())
      .output()
      .await
      .map_err(|source| ExecuteError::Spawn {
        cmd: cmd.to_string(),
        source,
      })?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if !stderr.is_empty() {
        debug!(stderr = %stderr, "command stderr");
      }
      return Err(ExecuteError::CmdFailed {
        cmd: cmd.to_string(),
        code: output.status.code(),
      });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  fn command(&self, cmd: &str, cwd: Option<&Path>) -> Command {
    let (shell_cmd, shell_args) = get_shell(self.shell.as_deref());

    let mut command = Command::new(&shell_cmd);
    command.args(&shell_args);

    #[cfg(windows)]
    {
      command.raw_arg(cmd);
    }
    #[cfg(not(windows))]
    {
      command.arg(cmd);
    }

    if let Some(dir) = cwd {
      command.current_dir(dir);
    }
    for (key, value) in self.overlay.iter() {
      command.env(key, value);
    }

    debug!(shell = %shell_cmd, working_dir = ?cwd, "spawning process");
    command
  }
}

/// Get the shell command and arguments used to run a command string.
///
/// An explicit shell gets the argument style its name suggests; otherwise
/// the platform's default shell is used.
fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  if let Some(shell) = override_shell {
    let args = if shell.contains("powershell") || shell.contains("pwsh") {
      vec!["-NoProfile".to_string(), "-Command".to_string()]
    } else if shell.contains("cmd") {
      vec!["/C".to_string()]
    } else {
      // Assume Unix-style shell (bash, sh, zsh, etc.)
      vec!["-c".to_string()]
    };
    return (shell.to_string(), args);
  }

  #[cfg(unix)]
  {
    ("/bin/sh".to_string(), vec!["-c".to_string()])
  }

  #[cfg(windows)]
  {
    ("cmd.exe".to_string(), vec!["/C".to_string()])
  }
}

/// Check whether a program can be found on `PATH`.
pub fn command_exists(name: &str) -> bool {
  which::which(name).is_ok()
}
