use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Operating systems setup-sdl can build on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BuildPlatform {
  Linux,
  #[serde(rename = "MacOS")]
  MacOs,
  Windows,
}

impl BuildPlatform {
  /// Detect the current operating system at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::MacOs),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  /// Returns the identifier for this platform, as recorded in state fingerprints
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "Linux",
      Self::MacOs => "MacOS",
      Self::Windows => "Windows",
    }
  }
}

impl fmt::Display for BuildPlatform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for BuildPlatform {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "linux" => Ok(Self::Linux),
      "macos" | "darwin" => Ok(Self::MacOs),
      "windows" | "win32" => Ok(Self::Windows),
      other => Err(format!("unsupported build platform: {}", other)),
    }
  }
}
