//! Version-request parsing.
//!
//! Users ask for a version in one of these forms:
//!
//! | Input          | Meaning                                          |
//! |----------------|--------------------------------------------------|
//! | `2.26.5`       | exactly that release                             |
//! | `2-latest`     | newest release of the 2.x line                   |
//! | `2-any`        | any release of the 2.x line (newest is picked)   |
//! | `3-head`       | tip of the development branch of the 3.x line    |
//! | anything else  | a git branch, tag or commit hash, used verbatim  |
//!
//! A project-specific prefix (e.g. `sdl` in `SDL3.2.0`) is stripped
//! case-insensitively before parsing.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Version, parse_number};

const ANY_SUFFIX: &str = "-any";
const HEAD_SUFFIX: &str = "-head";
const LATEST_SUFFIX: &str = "-latest";

/// The kind of a version request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReleaseType {
  Any,
  Head,
  Latest,
  Exact,
  Commit,
}

impl ReleaseType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Any => "Any",
      Self::Head => "Head",
      Self::Latest => "Latest",
      Self::Exact => "Exact",
      Self::Commit => "Commit",
    }
  }
}

impl fmt::Display for ReleaseType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// A parsed version request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionRequest {
  /// Any release within the major line of the version.
  Any(Version),
  /// Development branch of the major line of the version.
  Head(Version),
  /// Newest release within the major line of the version.
  Latest(Version),
  /// Exactly this version.
  Exact(Version),
  /// Opaque git reference (branch, tag or commit hash), kept as typed by the user.
  Commit(String),
}

impl VersionRequest {
  pub fn release_type(&self) -> ReleaseType {
    match self {
      Self::Any(_) => ReleaseType::Any,
      Self::Head(_) => ReleaseType::Head,
      Self::Latest(_) => ReleaseType::Latest,
      Self::Exact(_) => ReleaseType::Exact,
      Self::Commit(_) => ReleaseType::Commit,
    }
  }

  /// The structured version, or `None` for a git reference.
  pub fn version(&self) -> Option<Version> {
    match self {
      Self::Any(v) | Self::Head(v) | Self::Latest(v) | Self::Exact(v) => Some(*v),
      Self::Commit(_) => None,
    }
  }
}

impl fmt::Display for VersionRequest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Any(v) => write!(f, "{}{}", v.major, ANY_SUFFIX),
      Self::Head(v) => write!(f, "{}{}", v.major, HEAD_SUFFIX),
      Self::Latest(v) => write!(f, "{}{}", v.major, LATEST_SUFFIX),
      Self::Exact(v) => write!(f, "{}", v),
      Self::Commit(reference) => write!(f, "{}", reference),
    }
  }
}

/// Parse a version request.
///
/// Never fails: input that is not a structured version becomes
/// [`VersionRequest::Commit`] holding the original, unmodified string, since
/// git branch and tag names are case-sensitive.
pub fn parse_version_request(request: &str, discarded_prefix: Option<&str>) -> VersionRequest {
  let lowered = request.to_lowercase();
  let mut stripped = lowered.as_str();
  if let Some(prefix) = discarded_prefix.map(str::to_lowercase)
    && !prefix.is_empty()
    && let Some(rest) = stripped.strip_prefix(prefix.as_str())
  {
    stripped = rest;
  }

  let parsed = if let Some(major) = stripped.strip_suffix(ANY_SUFFIX) {
    parse_number(major).map(|m| VersionRequest::Any(Version::major_only(m)))
  } else if let Some(major) = stripped.strip_suffix(HEAD_SUFFIX) {
    parse_number(major).map(|m| VersionRequest::Head(Version::major_only(m)))
  } else if let Some(major) = stripped.strip_suffix(LATEST_SUFFIX) {
    parse_number(major).map(|m| VersionRequest::Latest(Version::major_only(m)))
  } else {
    stripped.parse::<Version>().ok().map(VersionRequest::Exact)
  };

  parsed.unwrap_or_else(|| VersionRequest::Commit(request.to_string()))
}
