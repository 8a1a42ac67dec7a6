//! Configure, build and install a CMake project.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::execute::{ExecuteError, Executor};
use crate::util::args::command_arglist_to_string;

#[derive(Debug, Error)]
pub enum CmakeError {
  #[error("invalid build-type \"{0}\" (expected Release, Debug, MinSizeRel or RelWithDebInfo)")]
  InvalidBuildType(String),

  #[error(transparent)]
  Execute(#[from] ExecuteError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum BuildType {
  #[default]
  Release,
  Debug,
  MinSizeRel,
  RelWithDebInfo,
}

impl BuildType {
  pub fn as_str(&self) -> &'static str {
    match self {
      BuildType::Release => "Release",
      BuildType::Debug => "Debug",
      BuildType::MinSizeRel => "MinSizeRel",
      BuildType::RelWithDebInfo => "RelWithDebInfo",
    }
  }
}

impl fmt::Display for BuildType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for BuildType {
  type Err = CmakeError;

  /// Names are case-sensitive, as CMake expects them.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "Release" => Ok(BuildType::Release),
      "Debug" => Ok(BuildType::Debug),
      "MinSizeRel" => Ok(BuildType::MinSizeRel),
      "RelWithDebInfo" => Ok(BuildType::RelWithDebInfo),
      _ => Err(CmakeError::InvalidBuildType(s.to_string())),
    }
  }
}

/// Options shared by every project of a run.
#[derive(Debug, Clone, Default)]
pub struct CmakeOptions {
  pub build_type: BuildType,
  pub generator: Option<String>,
  pub toolchain_file: Option<PathBuf>,
  /// Already split extra configure arguments.
  pub extra_args: Vec<String>,
}

/// Source, build and install directories of one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDirs {
  pub source: PathBuf,
  pub build: PathBuf,
  pub package: PathBuf,
}

impl ProjectDirs {
  /// Directories below `base`.
  pub fn under(base: &Path) -> Self {
    Self {
      source: base.join("source"),
      build: base.join("build"),
      package: base.join("package"),
    }
  }
}

fn path_arg(path: &Path) -> String {
  path.display().to_string()
}

pub fn configure_command(dirs: &ProjectDirs, options: &CmakeOptions) -> String {
  let mut args = vec![
    "-S".to_string(),
    path_arg(&dirs.source),
    "-B".to_string(),
    path_arg(&dirs.build),
    format!("-DCMAKE_BUILD_TYPE={}", options.build_type),
    format!("-DCMAKE_INSTALL_PREFIX={}", path_arg(&dirs.package)),
  ];
  if let Some(generator) = &options.generator {
    args.push("-G".to_string());
    args.push(generator.clone());
  }
  if let Some(toolchain) = &options.toolchain_file {
    args.push(format!("-DCMAKE_TOOLCHAIN_FILE={}", path_arg(toolchain)));
  }
  args.extend(options.extra_args.iter().cloned());
  format!("cmake {}", command_arglist_to_string(&args))
}

pub fn build_command(dirs: &ProjectDirs, options: &CmakeOptions) -> String {
  let args = [
    "--build".to_string(),
    path_arg(&dirs.build),
    "--config".to_string(),
    options.build_type.to_string(),
    "--verbose".to_string(),
  ];
  format!("cmake {}", command_arglist_to_string(&args))
}

pub fn install_command(dirs: &ProjectDirs, options: &CmakeOptions) -> String {
  let args = [
    "--install".to_string(),
    path_arg(&dirs.build),
    "--prefix".to_string(),
    path_arg(&dirs.package),
    "--config".to_string(),
    options.build_type.to_string(),
  ];
  format!("cmake {}", command_arglist_to_string(&args))
}

/// Configure, build and install `name` into `dirs.package`.
pub async fn configure_build_install(
  executor: &Executor,
  name: &str,
  dirs: &ProjectDirs,
  options: &CmakeOptions,
) -> Result<(), CmakeError> {
  info!(project = name, "configuring (CMake)");
  executor.run(&configure_command(dirs, options), None).await?;
  info!(project = name, "building (CMake)");
  executor.run(&build_command(dirs, options), None).await?;
  info!(project = name, "installing (CMake)");
  executor.run(&install_command(dirs, options), None).await?;
  Ok(())
}
