//! System package managers.
//!
//! A [`PackageManagerType`] selects the command templates; a
//! [`PackageManager`] runs them through an [`Executor`]. Command strings are
//! built by pure functions so they can be checked without running anything.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::execute::{ExecuteError, Executor, command_exists};
use crate::platform::BuildPlatform;

#[derive(Debug, Error)]
pub enum PmError {
  #[error("unknown package manager \"{0}\"")]
  Unknown(String),

  #[error("msys2-pacman requires the MSYSTEM environment variable")]
  MissingMsystem,

  #[error("invalid MSYSTEM={0}")]
  InvalidMsystem(String),

  #[error(transparent)]
  Execute(#[from] ExecuteError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageManagerType {
  Apk,
  AptGet,
  Brew,
  Dnf,
  Pacman,
  Msys2Pacman,
}

impl PackageManagerType {
  pub fn as_str(&self) -> &'static str {
    match self {
      PackageManagerType::Apk => "apk",
      PackageManagerType::AptGet => "apt-get",
      PackageManagerType::Brew => "brew",
      PackageManagerType::Dnf => "dnf",
      PackageManagerType::Pacman => "pacman",
      PackageManagerType::Msys2Pacman => "msys2-pacman",
    }
  }

  /// Whether commands may be elevated with `sudo`.
  fn uses_sudo(&self) -> bool {
    !matches!(self, PackageManagerType::Brew | PackageManagerType::Msys2Pacman)
  }
}

impl fmt::Display for PackageManagerType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PackageManagerType {
  type Err = PmError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "apk" | "alpine" => Ok(PackageManagerType::Apk),
      "aptget" | "apt-get" | "ubuntu" | "debian" => Ok(PackageManagerType::AptGet),
      "dnf" | "fedora" | "rhel" => Ok(PackageManagerType::Dnf),
      "pacman" | "arch" => Ok(PackageManagerType::Pacman),
      "brew" | "homebrew" | "macos" => Ok(PackageManagerType::Brew),
      "msys2" | "msys2-pacman" => Ok(PackageManagerType::Msys2Pacman),
      _ => Err(PmError::Unknown(s.to_string())),
    }
  }
}

/// Packages a project needs from one package manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packages {
  pub required: &'static [&'static str],
  /// Installed one by one; failures are tolerated.
  pub optional: &'static [&'static str],
}

/// Pick the package manager of the running system.
///
/// `exists` reports whether a program is on `PATH`.
pub fn detect_package_manager(
  platform: BuildPlatform,
  msystem: Option<&str>,
  exists: impl Fn(&str) -> bool,
) -> Option<PackageManagerType> {
  match platform {
    BuildPlatform::Windows => msystem
      .filter(|m| !m.is_empty())
      .map(|_| PackageManagerType::Msys2Pacman),
    BuildPlatform::MacOs => Some(PackageManagerType::Brew),
    BuildPlatform::Linux => [
      ("apt-get", PackageManagerType::AptGet),
      ("apk", PackageManagerType::Apk),
      ("pacman", PackageManagerType::Pacman),
      ("dnf", PackageManagerType::Dnf),
    ]
    .into_iter()
    .find(|(program, _)| exists(program))
    .map(|(_, kind)| kind),
  }
}

/// Package name prefix of an MSYS2 environment.
pub fn msys2_package_prefix(msystem: Option<&str>) -> Result<&'static str, PmError> {
  let msystem = msystem.filter(|m| !m.is_empty()).ok_or(PmError::MissingMsystem)?;
  match msystem.to_lowercase().as_str() {
    "mingw32" => Ok("mingw-w64-i686-"),
    "mingw64" => Ok("mingw-w64-x86_64-"),
    "clang32" => Ok("mingw-w64-clang-i686-"),
    "clang64" => Ok("mingw-w64-clang-x86_64-"),
    "ucrt64" => Ok("mingw-w64-ucrt-x86_64-"),
    _ => Err(PmError::InvalidMsystem(msystem.to_string())),
  }
}

/// A package manager ready to run commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManager {
  kind: PackageManagerType,
  sudo: bool,
  package_prefix: &'static str,
}

impl PackageManager {
  /// Create a package manager, elevating with `sudo` when it is available.
  ///
  /// `msystem` is only read for [`PackageManagerType::Msys2Pacman`].
  pub fn create(kind: PackageManagerType, msystem: Option<&str>) -> Result<Self, PmError> {
    let sudo = kind.uses_sudo() && command_exists("sudo");
    Self::with_sudo(kind, msystem, sudo)
  }

  /// Create a package manager with explicit `sudo` use.
  pub fn with_sudo(kind: PackageManagerType, msystem: Option<&str>, sudo: bool) -> Result<Self, PmError> {
    let package_prefix = match kind {
      PackageManagerType::Msys2Pacman => msys2_package_prefix(msystem)?,
      _ => "",
    };
    Ok(Self {
      kind,
      sudo: sudo && kind.uses_sudo(),
      package_prefix,
    })
  }

  pub fn kind(&self) -> PackageManagerType {
    self.kind
  }

  fn elevate(&self, cmd: String) -> String {
    if self.sudo { format!("sudo {}", cmd) } else { cmd }
  }

  /// The index refresh command, `None` when the manager needs none.
  pub fn update_command(&self) -> Option<String> {
    let cmd = match self.kind {
      PackageManagerType::AptGet => "apt-get update -y",
      PackageManagerType::Brew => "brew update",
      PackageManagerType::Pacman | PackageManagerType::Msys2Pacman => "pacman -Sy",
      PackageManagerType::Dnf | PackageManagerType::Apk => return None,
    };
    Some(self.elevate(cmd.to_string()))
  }

  /// The command installing `packages`.
  pub fn install_command<S: AsRef<str>>(&self, packages: &[S]) -> String {
    let names = packages
      .iter()
      .map(|p| format!("{}{}", self.package_prefix, p.as_ref()))
      .collect::<Vec<_>>()
      .join(" ");
    let cmd = match self.kind {
      PackageManagerType::AptGet => format!("apt-get install -y {}", names),
      PackageManagerType::Dnf => format!("dnf install -y {}", names),
      PackageManagerType::Apk => format!("apk add {}", names),
      PackageManagerType::Brew => format!("brew install {}", names),
      PackageManagerType::Pacman | PackageManagerType::Msys2Pacman => format!("pacman --noconfirm -S {}", names),
    };
    self.elevate(cmd)
  }

  pub async fn update(&self, executor: &Executor) -> Result<(), PmError> {
    if let Some(cmd) = self.update_command() {
      info!(manager = %self.kind, "updating package index");
      executor.run(&cmd, None).await?;
    }
    Ok(())
  }

  /// Install packages in one command. Nothing runs for an empty list.
  pub async fn install<S: AsRef<str>>(&self, executor: &Executor, packages: &[S]) -> Result<(), PmError> {
    if packages.is_empty() {
      return Ok(());
    }
    executor.run(&self.install_command(packages), None).await?;
    Ok(())
  }

  /// Install required packages together, then each optional package alone.
  pub async fn install_packages(&self, executor: &Executor, packages: &Packages) -> Result<(), PmError> {
    self.install(executor, packages.required).await?;
    for package in packages.optional {
      if let Err(e) = self.install(executor, &[package]).await {
        warn!(package = %package, error = %e, "optional package not installed");
      }
    }
    Ok(())
  }
}
