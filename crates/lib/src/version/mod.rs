//! Version values and version-request parsing.
//!
//! - [`Version`]: an immutable `MAJOR.MINOR.PATCH` triple
//! - [`request`]: turns user input such as `2-latest`, `SDL3.2.0` or a git
//!   reference into a typed [`VersionRequest`]

mod request;

pub use request::*;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A `MAJOR.MINOR.PATCH` version.
///
/// Ordering is lexicographic on `(major, minor, patch)`, so a higher version
/// compares greater. The release catalog sorts in reverse of this order to
/// put the best release first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
  pub major: u32,
  pub minor: u32,
  pub patch: u32,
}

/// Error returned when a string is not a `MAJOR.MINOR.PATCH` version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert version ({input}) to MAJOR.MINOR.PATCH: {reason}")]
pub struct ParseVersionError {
  pub input: String,
  pub reason: &'static str,
}

impl Version {
  pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
    Self { major, minor, patch }
  }

  /// A version naming only a major line (`N.0.0`).
  pub const fn major_only(major: u32) -> Self {
    Self::new(major, 0, 0)
  }
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
  }
}

impl FromStr for Version {
  type Err = ParseVersionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let err = |reason| ParseVersionError {
      input: s.to_string(),
      reason,
    };

    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() != 3 {
      return Err(err("expected exactly three components"));
    }

    let mut numbers = [0u32; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
      *slot = parse_number(part).ok_or_else(|| err("component is not a non-negative integer"))?;
    }

    Ok(Self::new(numbers[0], numbers[1], numbers[2]))
  }
}

/// Parse a plain run of ASCII digits. Signs, whitespace and empty input are rejected.
pub(crate) fn parse_number(s: &str) -> Option<u32> {
  if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  s.parse().ok()
}
