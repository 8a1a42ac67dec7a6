//! State fingerprints.
//!
//! A fingerprint is the SHA-256 of a canonical list of `key=value` entries
//! describing everything that influences a build: selected environment
//! variables, pipeline inputs, the source revision and the fingerprints of
//! dependencies. Equal fingerprints mean an install tree can be reused.
//!
//! The canonical list has three sections, each introduced by its name:
//!
//! ```text
//! ENVIRONMENT##AR=undefined##CC=gcc##...##CMAKE_GENERATOR=Ninja
//! ##INPUTS##build-type=Release##ninja=false##...
//! ##MISC##GIT_HASH=...##build_platform=Linux##shell=...
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::consts::{APP_NAME, STATE_DELIMITER};
use crate::execute::EnvOverlay;
use crate::platform::BuildPlatform;
use crate::pm::PackageManagerType;
use crate::project::Project;
use crate::util::args::{SplitArgsError, command_arglist_to_string, split_args};
use crate::util::hash::{ContentHash, FileHashError, hash_bytes, hash_file};

/// Environment variables always recorded, in this order.
pub const ENV_KEYS: &[&str] = &[
  "AR",
  "CC",
  "CXX",
  "ARFLAGS",
  "CFLAGS",
  "CXXFLAGS",
  "INCLUDES",
  "LDFLAGS",
  "LIB",
  "LIBPATH",
  "CMAKE_PREFIX_PATH",
  "MSYSTEM",
  "PKG_CONFIG_PATH",
];

/// Every other variable starting with this prefix is recorded too, sorted by name.
pub const ENV_PREFIX: &str = "CMAKE_";

/// Value recorded for an unset variable.
const UNSET: &str = "undefined";

#[derive(Debug, Error)]
pub enum StateError {
  #[error("cannot find CMake toolchain file: {}", .0.display())]
  MissingToolchainFile(PathBuf),

  #[error(transparent)]
  Hash(#[from] FileHashError),

  #[error("invalid CMake arguments: {0}")]
  Args(#[from] SplitArgsError),
}

/// A copy of the environment variables a fingerprint may read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
  vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
  /// Snapshot the process environment. Variables that are not valid UTF-8 are skipped.
  pub fn capture() -> Self {
    std::env::vars_os()
      .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
      .collect()
  }

  /// Apply overlay values on top of the snapshot.
  pub fn with_overlay(mut self, overlay: &EnvOverlay) -> Self {
    for (key, value) in overlay.iter() {
      self.vars.insert(key.to_string(), value.to_string());
    }
    self
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.vars.get(key).map(String::as_str)
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvSnapshot {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self {
      vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
    }
  }
}

/// Everything besides the environment that goes into a fingerprint.
#[derive(Debug, Clone)]
pub struct StateInputs {
  /// Commit hash of the source checkout.
  pub git_hash: String,
  pub build_platform: BuildPlatform,
  pub shell: Option<String>,
  pub package_manager: Option<PackageManagerType>,
  pub build_type: String,
  pub cmake_toolchain_file: Option<PathBuf>,
  pub cmake_generator: Option<String>,
  pub ninja: bool,
  /// Extra arguments passed to the CMake configure step.
  pub cmake_arguments: Option<String>,
  pub discriminator: Option<String>,
  /// Fingerprints of already planned dependencies, in build order.
  pub dependencies: Vec<(Project, ContentHash)>,
}

impl StateInputs {
  pub fn new(git_hash: impl Into<String>, build_platform: BuildPlatform) -> Self {
    Self {
      git_hash: git_hash.into(),
      build_platform,
      shell: None,
      package_manager: None,
      build_type: "Release".to_string(),
      cmake_toolchain_file: None,
      cmake_generator: None,
      ninja: false,
      cmake_arguments: None,
      discriminator: None,
      dependencies: Vec::new(),
    }
  }
}

fn environment_entries(env: &EnvSnapshot) -> Vec<String> {
  let mut entries: Vec<String> = ENV_KEYS
    .iter()
    .map(|key| format!("{}={}", key, env.get(key).unwrap_or(UNSET)))
    .collect();

  entries.extend(
    env
      .vars
      .iter()
      .filter(|(key, _)| key.starts_with(ENV_PREFIX) && !ENV_KEYS.contains(&key.as_str()))
      .map(|(key, value)| format!("{}={}", key, value)),
  );
  entries
}

fn input_entries(inputs: &StateInputs) -> Vec<String> {
  let toolchain = inputs
    .cmake_toolchain_file
    .as_deref()
    .map(|p| p.display().to_string())
    .unwrap_or_default();

  vec![
    format!("build-type={}", inputs.build_type),
    format!("ninja={}", inputs.ninja),
    format!("cmake-toolchain-file={}", toolchain),
    format!("cmake-generator={}", inputs.cmake_generator.as_deref().unwrap_or_default()),
    format!("discriminator={}", inputs.discriminator.as_deref().unwrap_or_default()),
  ]
}

fn toolchain_hash(path: &Path) -> Result<ContentHash, StateError> {
  if !path.is_file() {
    return Err(StateError::MissingToolchainFile(path.to_path_buf()));
  }
  Ok(hash_file(path)?)
}

fn misc_entries(inputs: &StateInputs) -> Result<Vec<String>, StateError> {
  let mut entries = vec![
    format!("GIT_HASH={}", inputs.git_hash),
    format!("build_platform={}", inputs.build_platform),
    format!("shell={}", inputs.shell.as_deref().unwrap_or_default()),
  ];

  if let Some(pm) = inputs.package_manager {
    entries.push(format!("package_manager={}", pm));
  }

  if let Some(path) = inputs.cmake_toolchain_file.as_deref() {
    entries.push(format!("cmake_toolchain_file_hash={}", toolchain_hash(path)?));
  }

  let args = split_args(inputs.cmake_arguments.as_deref())?;
  if !args.is_empty() {
    entries.push(format!("cmake_arguments={}", command_arglist_to_string(&args)));
  }

  for (project, hash) in &inputs.dependencies {
    entries.push(format!("dependency_{}={}", project, hash));
  }
  Ok(entries)
}

/// The canonical entry list, section names included.
pub fn state_entries(inputs: &StateInputs, env: &EnvSnapshot) -> Result<Vec<String>, StateError> {
  let mut entries = vec!["ENVIRONMENT".to_string()];
  entries.extend(environment_entries(env));
  entries.push("INPUTS".to_string());
  entries.extend(input_entries(inputs));
  entries.push("MISC".to_string());
  entries.extend(misc_entries(inputs)?);
  Ok(entries)
}

/// Compute the fingerprint of a build.
///
/// Fails when a toolchain file is configured but does not exist.
pub fn compute_state_hash(inputs: &StateInputs, env: &EnvSnapshot) -> Result<ContentHash, StateError> {
  let state = state_entries(inputs, env)?.join(STATE_DELIMITER);
  debug!(state = %state, "canonical state");
  Ok(hash_bytes(state.as_bytes()))
}

/// Cache key of a project's install tree.
pub fn cache_key(project: Project, hash: &ContentHash) -> String {
  format!("{}-{}-{}", APP_NAME, project, hash)
}
