//! Detect the installed version of a project from its headers.

use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use super::ProjectDescription;
use crate::version::Version;

#[derive(Debug, Error)]
pub enum ExtractError {
  #[error("cannot find {}", .0.display())]
  MissingHeader(PathBuf),

  #[error("failed to read {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("could not extract version from {}", .0.display())]
  NoVersion(PathBuf),

  #[error("invalid define pattern: {0}")]
  Pattern(#[from] regex::Error),
}

/// Reads `#define` lines of a project's version header.
#[derive(Debug, Clone)]
pub struct VersionExtractor {
  major: Regex,
  minor: Regex,
  patch: Regex,
  header_paths: &'static [&'static str],
  header_filenames: &'static [&'static str],
}

fn define_pattern(define: &str) -> Result<Regex, regex::Error> {
  Regex::new(&format!(r"#define[ \t]+{}[ \t]+([0-9]+)", define))
}

fn capture_number(pattern: &Regex, contents: &str) -> Option<u32> {
  pattern.captures(contents)?.get(1)?.as_str().parse().ok()
}

impl VersionExtractor {
  pub fn new(desc: &'static ProjectDescription) -> Result<Self, ExtractError> {
    Ok(Self {
      major: define_pattern(desc.major_define)?,
      minor: define_pattern(desc.minor_define)?,
      patch: define_pattern(desc.patch_define)?,
      header_paths: desc.header_paths,
      header_filenames: desc.header_filenames,
    })
  }

  /// Version in header text, `None` when any of the three defines is missing.
  pub fn extract_from_contents(&self, contents: &str) -> Option<Version> {
    Some(Version::new(
      capture_number(&self.major, contents)?,
      capture_number(&self.minor, contents)?,
      capture_number(&self.patch, contents)?,
    ))
  }

  /// Version defined in one header file.
  pub fn extract_from_header_path(&self, path: &Path) -> Result<Option<Version>, ExtractError> {
    if !path.exists() {
      return Err(ExtractError::MissingHeader(path.to_path_buf()));
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ExtractError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Ok(self.extract_from_contents(&contents))
  }

  /// Version installed under `prefix`: the first candidate header that defines one.
  pub fn extract_from_install_prefix(&self, prefix: &Path) -> Result<Version, ExtractError> {
    for infix in self.header_paths {
      for filename in self.header_filenames {
        let header = prefix.join(infix).join(filename);
        if !header.exists() {
          continue;
        }
        if let Some(version) = self.extract_from_header_path(&header)? {
          debug!(header = %header.display(), %version, "extracted installed version");
          return Ok(version);
        }
      }
    }
    Err(ExtractError::NoVersion(prefix.to_path_buf()))
  }
}
