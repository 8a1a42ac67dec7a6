use crate::consts::APP_NAME;
use std::path::{Path, PathBuf};

use super::BuildPlatform;

/// Returns the directory under which sources, build trees and install
/// prefixes are placed.
///
/// An explicit `root` input wins; otherwise a fixed per-platform location is used.
pub fn root_dir(platform: BuildPlatform, root: Option<&Path>) -> PathBuf {
  if let Some(root) = root {
    return root.to_path_buf();
  }
  match platform {
    BuildPlatform::Windows => PathBuf::from("C:/setupsdl"),
    BuildPlatform::MacOs | BuildPlatform::Linux => PathBuf::from("/tmp").join(APP_NAME),
  }
}

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var("USERPROFILE")
    .map(PathBuf::from)
    .unwrap_or_else(|_| std::env::temp_dir())
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var("HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| std::env::temp_dir())
}

/// Returns the directory for cache files for the application
#[cfg(windows)]
pub fn cache_dir() -> PathBuf {
  std::env::var("LOCALAPPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join("AppData").join("Local"))
    .join(APP_NAME)
    .join("Cache")
}

/// Returns the directory for cache files for the application
#[cfg(not(windows))]
pub fn cache_dir() -> PathBuf {
  let cache_home = std::env::var("XDG_CACHE_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".cache"));
  cache_home.join(APP_NAME)
}
