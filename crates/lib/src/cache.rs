//! Local install-tree cache.
//!
//! Each entry is a directory named after its cache key holding a copy of a
//! project's install prefix. An entry only counts once its completion marker
//! exists; entries are assembled in a temporary directory and renamed into
//! place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::platform::paths::cache_dir;

/// File marking a fully written cache entry.
pub const CACHE_COMPLETE_MARKER: &str = ".setup-sdl-complete";

const DATA_DIR: &str = "data";

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("cannot cache {}: directory does not exist", .0.display())]
  MissingSource(PathBuf),

  #[error("failed to walk {}: {source}", .path.display())]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("io error at {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> CacheError + '_ {
  move |source| CacheError::Io {
    path: path.to_path_buf(),
    source,
  }
}

/// A directory of cached install trees.
#[derive(Debug, Clone)]
pub struct LocalCache {
  dir: PathBuf,
}

impl LocalCache {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  /// The cache in the user's cache directory.
  pub fn default_cache() -> Self {
    Self::new(cache_dir())
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  fn entry_dir(&self, key: &str) -> PathBuf {
    self.dir.join(key)
  }

  /// Whether a complete entry exists for `key`.
  pub fn contains(&self, key: &str) -> bool {
    self.entry_dir(key).join(CACHE_COMPLETE_MARKER).is_file()
  }

  /// Copy the entry for `key` to `dest`, replacing it.
  ///
  /// Returns `false` on a cache miss, leaving `dest` untouched.
  pub fn restore(&self, key: &str, dest: &Path) -> Result<bool, CacheError> {
    if !self.contains(key) {
      debug!(key, "cache miss");
      return Ok(false);
    }

    if dest.exists() {
      fs::remove_dir_all(dest).map_err(io_err(dest))?;
    }
    copy_tree(&self.entry_dir(key).join(DATA_DIR), dest)?;
    info!(key, dest = %dest.display(), "restored from cache");
    Ok(true)
  }

  /// Store a copy of `src` under `key`, replacing any previous entry.
  pub fn save(&self, key: &str, src: &Path) -> Result<(), CacheError> {
    if !src.is_dir() {
      return Err(CacheError::MissingSource(src.to_path_buf()));
    }

    fs::create_dir_all(&self.dir).map_err(io_err(&self.dir))?;
    let staging = self.dir.join(format!("{}.tmp-{}", key, std::process::id()));
    if staging.exists() {
      fs::remove_dir_all(&staging).map_err(io_err(&staging))?;
    }

    if let Err(e) = stage_entry(key, src, &staging) {
      if let Err(cleanup) = fs::remove_dir_all(&staging) {
        debug!(staging = %staging.display(), error = %cleanup, "failed to remove staging directory");
      }
      return Err(e);
    }

    let entry = self.entry_dir(key);
    if entry.exists() {
      fs::remove_dir_all(&entry).map_err(io_err(&entry))?;
    }
    fs::rename(&staging, &entry).map_err(io_err(&entry))?;

    info!(key, size = dir_size(&entry), "saved to cache");
    Ok(())
  }
}

/// Fill a staging directory: the tree below `data/`, then the completion marker.
fn stage_entry(key: &str, src: &Path, staging: &Path) -> Result<(), CacheError> {
  copy_tree(src, &staging.join(DATA_DIR))?;
  let marker = staging.join(CACHE_COMPLETE_MARKER);
  fs::write(&marker, key).map_err(io_err(&marker))
}

/// Total size of the regular files below `path`.
pub fn dir_size(path: &Path) -> u64 {
  WalkDir::new(path)
    .into_iter()
    .filter_map(|e| e.ok())
    .filter(|e| e.file_type().is_file())
    .filter_map(|e| e.metadata().ok())
    .map(|m| m.len())
    .sum()
}

/// Recursively copy `src` to `dst`. Symlinks are recreated, not followed.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<(), CacheError> {
  fs::create_dir_all(dst).map_err(io_err(dst))?;

  for entry in WalkDir::new(src).min_depth(1) {
    let entry = entry.map_err(|source| CacheError::Walk {
      path: src.to_path_buf(),
      source,
    })?;
    let Ok(relative) = entry.path().strip_prefix(src) else {
      continue;
    };
    let target = dst.join(relative);
    let file_type = entry.file_type();

    if file_type.is_dir() {
      fs::create_dir_all(&target).map_err(io_err(&target))?;
    } else if file_type.is_symlink() {
      copy_symlink(entry.path(), &target)?;
    } else {
      fs::copy(entry.path(), &target).map_err(io_err(&target))?;
    }
  }
  Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<(), CacheError> {
  let link = fs::read_link(src).map_err(io_err(src))?;
  std::os::unix::fs::symlink(&link, dst).map_err(io_err(dst))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> Result<(), CacheError> {
  fs::copy(src, dst).map(|_| ()).map_err(io_err(dst))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn install_tree(root: &Path) {
    fs::create_dir_all(root.join("include/SDL3")).unwrap();
    fs::create_dir_all(root.join("lib/cmake")).unwrap();
    fs::write(root.join("include/SDL3/SDL_version.h"), "#define SDL_MAJOR_VERSION 3\n").unwrap();
    fs::write(root.join("lib/libSDL3.so.0"), b"\x7fELF").unwrap();
  }

  #[test]
  fn miss_leaves_destination_alone() {
    let temp = TempDir::new().unwrap();
    let cache = LocalCache::new(temp.path().join("cache"));
    let dest = temp.path().join("dest");
    fs::create_dir_all(&dest).unwrap();

    assert!(!cache.restore("setup-sdl-SDL-abc", &dest).unwrap());
    assert!(dest.exists());
  }

  #[test]
  fn save_then_restore() {
    let temp = TempDir::new().unwrap();
    let cache = LocalCache::new(temp.path().join("cache"));
    let package = temp.path().join("package");
    install_tree(&package);

    cache.save("setup-sdl-SDL-abc", &package).unwrap();
    assert!(cache.contains("setup-sdl-SDL-abc"));

    let dest = temp.path().join("restored");
    assert!(cache.restore("setup-sdl-SDL-abc", &dest).unwrap());
    assert_eq!(
      fs::read_to_string(dest.join("include/SDL3/SDL_version.h")).unwrap(),
      "#define SDL_MAJOR_VERSION 3\n"
    );
    assert!(dest.join("lib/cmake").is_dir());
    assert!(!dest.join(CACHE_COMPLETE_MARKER).exists());
  }

  #[test]
  fn restore_replaces_stale_files() {
    let temp = TempDir::new().unwrap();
    let cache = LocalCache::new(temp.path().join("cache"));
    let package = temp.path().join("package");
    install_tree(&package);
    cache.save("key", &package).unwrap();

    let dest = temp.path().join("dest");
    fs::create_dir_all(&dest).unwrap();
    fs::write(dest.join("stale.txt"), "old").unwrap();

    cache.restore("key", &dest).unwrap();
    assert!(!dest.join("stale.txt").exists());
  }

  #[test]
  fn incomplete_entry_is_a_miss() {
    let temp = TempDir::new().unwrap();
    let cache = LocalCache::new(temp.path());
    fs::create_dir_all(temp.path().join("key").join(DATA_DIR)).unwrap();
    assert!(!cache.contains("key"));
  }

  #[test]
  fn saving_again_replaces_the_entry() {
    let temp = TempDir::new().unwrap();
    let cache = LocalCache::new(temp.path().join("cache"));
    let package = temp.path().join("package");
    install_tree(&package);
    cache.save("key", &package).unwrap();

    fs::remove_file(package.join("lib/libSDL3.so.0")).unwrap();
    cache.save("key", &package).unwrap();

    let dest = temp.path().join("dest");
    cache.restore("key", &dest).unwrap();
    assert!(!dest.join("lib/libSDL3.so.0").exists());
  }

  #[test]
  fn missing_source_is_an_error() {
    let temp = TempDir::new().unwrap();
    let cache = LocalCache::new(temp.path());
    let err = cache.save("key", &temp.path().join("nope")).unwrap_err();
    assert!(matches!(err, CacheError::MissingSource(_)));
  }

  #[cfg(unix)]
  #[test]
  fn symlinks_are_preserved() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    install_tree(&src);
    std::os::unix::fs::symlink("libSDL3.so.0", src.join("lib/libSDL3.so")).unwrap();

    let dst = temp.path().join("dst");
    copy_tree(&src, &dst).unwrap();

    let link = dst.join("lib/libSDL3.so");
    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("libSDL3.so.0"));
  }

  #[cfg(unix)]
  #[test]
  fn failed_save_leaves_nothing_behind() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    install_tree(&src);
    // Sockets cannot be copied.
    let _socket = std::os::unix::net::UnixListener::bind(src.join("lib/agent.sock")).unwrap();

    let cache = LocalCache::new(temp.path().join("cache"));
    assert!(cache.save("key", &src).is_err());
    assert!(!cache.contains("key"));
    let leftovers: Vec<_> = fs::read_dir(cache.dir()).unwrap().collect();
    assert!(leftovers.is_empty());
  }

  #[test]
  fn size_counts_files() {
    let temp = TempDir::new().unwrap();
    install_tree(temp.path());
    assert_eq!(dir_size(temp.path()), 28 + 4);
  }
}
