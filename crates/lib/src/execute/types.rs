//! Types for command execution.

use std::collections::BTreeMap;
use std::env::JoinPathsError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// Command exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}")]
  CmdFailed { cmd: String, code: Option<i32> },

  /// Command could not be spawned.
  #[error("failed to spawn '{cmd}': {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  /// I/O error during execution.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Environment variables layered over the inherited process environment.
///
/// Values exported by earlier steps (for example the install prefix of a
/// dependency) are recorded here instead of mutating the process environment,
/// and applied to every command the [`Executor`](super::Executor) spawns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverlay {
  vars: BTreeMap<String, String>,
}

impl EnvOverlay {
  pub fn new() -> Self {
    Self::default()
  }

  /// Set (or replace) a variable.
  pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
    self.vars.insert(key.into(), value.into());
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.vars.get(key).map(String::as_str)
  }

  /// Put `dir` in front of the search path commands see.
  ///
  /// Starts from the overlay's `PATH` when one was set, the process `PATH` otherwise.
  pub fn prepend_path(&mut self, dir: &Path) -> Result<(), JoinPathsError> {
    let current = match self.get("PATH") {
      Some(path) => Some(OsString::from(path)),
      None => std::env::var_os("PATH"),
    };
    let mut dirs = vec![dir.to_path_buf()];
    if let Some(current) = current {
      dirs.extend(std::env::split_paths(&current).filter(|p| p.as_path() != dir));
    }
    let joined = std::env::join_paths(dirs.iter().map(PathBuf::as_path))?;
    self.set("PATH", joined.to_string_lossy().into_owned());
    Ok(())
  }

  pub fn is_empty(&self) -> bool {
    self.vars.is_empty()
  }

  /// Variables in key order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }
}
