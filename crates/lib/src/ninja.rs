//! The ninja build tool.
//!
//! Downloads the official release archive for the build platform once, keeps
//! the extracted binary under the cache directory and puts it on the `PATH`
//! of every command the executor runs.

use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::consts::{APP_NAME, NINJA_RELEASES_URL, NINJA_VERSION};
use crate::execute::EnvOverlay;
use crate::platform::BuildPlatform;

#[derive(Debug, Error)]
pub enum NinjaError {
  #[error("failed to download {url}: {source}")]
  Download {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("failed to download {url}: HTTP {status}")]
  Status { url: String, status: reqwest::StatusCode },

  #[error("invalid ninja archive: {0}")]
  Archive(#[from] zip::result::ZipError),

  #[error("ninja archive from {0} has no ninja executable")]
  MissingBinary(String),

  #[error("cannot add {} to PATH: {source}", .dir.display())]
  Path {
    dir: PathBuf,
    #[source]
    source: std::env::JoinPathsError,
  },

  #[error("io error at {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> NinjaError + '_ {
  move |source| NinjaError::Io {
    path: path.to_path_buf(),
    source,
  }
}

/// Name of the release archive for a platform.
pub fn archive_name(platform: BuildPlatform) -> &'static str {
  match platform {
    BuildPlatform::Linux => "ninja-linux.zip",
    BuildPlatform::MacOs => "ninja-mac.zip",
    BuildPlatform::Windows => "ninja-win.zip",
  }
}

/// Name of the executable inside the archive.
pub fn binary_name(platform: BuildPlatform) -> &'static str {
  match platform {
    BuildPlatform::Windows => "ninja.exe",
    BuildPlatform::Linux | BuildPlatform::MacOs => "ninja",
  }
}

/// Download URL of a ninja release archive.
pub fn download_url(base_url: &str, platform: BuildPlatform, version: &str) -> String {
  format!(
    "{}/v{}/{}",
    base_url.trim_end_matches('/'),
    version,
    archive_name(platform)
  )
}

/// Installs ninja on demand.
#[derive(Debug, Clone)]
pub struct NinjaInstaller {
  platform: BuildPlatform,
  version: String,
  base_url: String,
  dir: PathBuf,
}

impl NinjaInstaller {
  /// An installer keeping its binaries below `tools_dir`.
  pub fn new(platform: BuildPlatform, tools_dir: &Path) -> Self {
    Self {
      platform,
      version: NINJA_VERSION.to_string(),
      base_url: NINJA_RELEASES_URL.to_string(),
      dir: tools_dir.join("ninja").join(NINJA_VERSION),
    }
  }

  /// Download from a different host (mirrors, tests).
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }

  /// Directory holding the ninja executable.
  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn binary(&self) -> PathBuf {
    self.dir.join(binary_name(self.platform))
  }

  /// Make ninja available to commands run with `overlay`, downloading it
  /// unless a previous run already did.
  pub async fn install(&self, overlay: &mut EnvOverlay) -> Result<PathBuf, NinjaError> {
    if self.binary().is_file() {
      info!(version = %self.version, dir = %self.dir.display(), "using cached ninja");
    } else {
      let url = download_url(&self.base_url, self.platform, &self.version);
      info!(url = %url, "downloading ninja");
      let archive = download(&url).await?;
      extract_zip(&archive, &self.dir)?;
      if !self.binary().is_file() {
        return Err(NinjaError::MissingBinary(url));
      }
    }

    overlay.prepend_path(&self.dir).map_err(|source| NinjaError::Path {
      dir: self.dir.clone(),
      source,
    })?;
    Ok(self.binary())
  }
}

async fn download(url: &str) -> Result<Vec<u8>, NinjaError> {
  let download_err = |source| NinjaError::Download {
    url: url.to_string(),
    source,
  };
  let client = reqwest::Client::builder()
    .user_agent(format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION")))
    .build()
    .map_err(download_err)?;
  let response = client.get(url).send().await.map_err(download_err)?;
  let status = response.status();
  if !status.is_success() {
    return Err(NinjaError::Status {
      url: url.to_string(),
      status,
    });
  }
  let bytes = response.bytes().await.map_err(download_err)?;
  Ok(bytes.to_vec())
}

/// Unpack a zip archive held in memory into `dest`.
pub fn extract_zip(archive: &[u8], dest: &Path) -> Result<(), NinjaError> {
  let mut archive = zip::ZipArchive::new(Cursor::new(archive))?;
  fs::create_dir_all(dest).map_err(io_err(dest))?;

  for i in 0..archive.len() {
    let mut entry = archive.by_index(i)?;
    let Some(relative) = entry.enclosed_name() else {
      continue;
    };
    let target = dest.join(relative);

    if entry.is_dir() {
      fs::create_dir_all(&target).map_err(io_err(&target))?;
      continue;
    }
    if let Some(parent) = target.parent() {
      fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    let mut out = File::create(&target).map_err(io_err(&target))?;
    io::copy(&mut entry, &mut out).map_err(io_err(&target))?;

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      if let Some(mode) = entry.unix_mode() {
        fs::set_permissions(&target, fs::Permissions::from_mode(mode)).map_err(io_err(&target))?;
      }
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  use mockito::Server;
  use tempfile::TempDir;
  use zip::write::SimpleFileOptions;

  fn archive(binary: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
      .start_file(binary, SimpleFileOptions::default().unix_permissions(0o755))
      .unwrap();
    writer.write_all(b"#!/bin/sh\necho 1.12.1\n").unwrap();
    writer.finish().unwrap().into_inner()
  }

  #[test]
  fn archive_per_platform() {
    assert_eq!(
      download_url(NINJA_RELEASES_URL, BuildPlatform::Linux, "1.12.1"),
      "https://github.com/ninja-build/ninja/releases/download/v1.12.1/ninja-linux.zip"
    );
    assert_eq!(
      download_url("https://mirror/", BuildPlatform::MacOs, "1.11.0"),
      "https://mirror/v1.11.0/ninja-mac.zip"
    );
    assert_eq!(
      download_url(NINJA_RELEASES_URL, BuildPlatform::Windows, "1.12.1"),
      "https://github.com/ninja-build/ninja/releases/download/v1.12.1/ninja-win.zip"
    );
  }

  #[test]
  fn installer_keeps_versions_apart() {
    let installer = NinjaInstaller::new(BuildPlatform::Windows, Path::new("/cache"));
    assert_eq!(installer.dir(), Path::new("/cache/ninja").join(NINJA_VERSION));
    assert_eq!(installer.binary(), installer.dir().join("ninja.exe"));
  }

  #[test]
  fn extracts_executable() {
    let temp = TempDir::new().unwrap();
    extract_zip(&archive("ninja"), temp.path()).unwrap();

    let binary = temp.path().join("ninja");
    assert!(binary.is_file());
    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      let mode = fs::metadata(&binary).unwrap().permissions().mode();
      assert_eq!(mode & 0o111, 0o111);
    }
  }

  #[test]
  fn garbage_is_not_an_archive() {
    let temp = TempDir::new().unwrap();
    let err = extract_zip(b"not a zip", temp.path()).unwrap_err();
    assert!(matches!(err, NinjaError::Archive(_)));
  }

  #[tokio::test]
  async fn downloads_once_and_prepends_path() {
    let platform = BuildPlatform::Linux;
    let temp = TempDir::new().unwrap();
    let mut server = Server::new_async().await;
    let zip = server
      .mock("GET", format!("/v{}/ninja-linux.zip", NINJA_VERSION).as_str())
      .with_status(200)
      .with_body(archive(binary_name(platform)))
      .expect(1)
      .create_async()
      .await;

    let installer = NinjaInstaller::new(platform, temp.path()).with_base_url(server.url());
    let mut overlay = EnvOverlay::new();
    let binary = installer.install(&mut overlay).await.unwrap();
    assert_eq!(binary, installer.binary());
    assert!(binary.is_file());

    let path = std::ffi::OsString::from(overlay.get("PATH").unwrap());
    assert_eq!(std::env::split_paths(&path).next().as_deref(), Some(installer.dir()));

    let mut second = EnvOverlay::new();
    installer.install(&mut second).await.unwrap();
    zip.assert_async().await;
  }

  #[tokio::test]
  async fn missing_release_is_reported() {
    let temp = TempDir::new().unwrap();
    let mut server = Server::new_async().await;
    let _zip = server
      .mock("GET", format!("/v{}/ninja-mac.zip", NINJA_VERSION).as_str())
      .with_status(404)
      .create_async()
      .await;

    let installer = NinjaInstaller::new(BuildPlatform::MacOs, temp.path()).with_base_url(server.url());
    let err = installer.install(&mut EnvOverlay::new()).await.unwrap_err();
    assert!(matches!(err, NinjaError::Status { status, .. } if status == reqwest::StatusCode::NOT_FOUND));
    assert!(!installer.binary().exists());
  }

  #[tokio::test]
  async fn archive_without_binary_is_rejected() {
    let temp = TempDir::new().unwrap();
    let mut server = Server::new_async().await;
    let _zip = server
      .mock("GET", format!("/v{}/ninja-linux.zip", NINJA_VERSION).as_str())
      .with_status(200)
      .with_body(archive("README"))
      .create_async()
      .await;

    let installer = NinjaInstaller::new(BuildPlatform::Linux, temp.path()).with_base_url(server.url());
    let err = installer.install(&mut EnvOverlay::new()).await.unwrap_err();
    assert!(matches!(err, NinjaError::MissingBinary(_)));
  }
}
