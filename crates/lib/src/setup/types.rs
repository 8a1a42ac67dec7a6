//! Types for a setup run.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::cache::CacheError;
use crate::cmake::{BuildType, CmakeError};
use crate::execute::ExecuteError;
use crate::msvc::{MsvcError, MsvcOptions};
use crate::ninja::NinjaError;
use crate::platform::BuildPlatform;
use crate::pm::{PackageManagerType, PmError};
use crate::project::{ExtractError, OrderError, Project};
use crate::release::ReleaseError;
use crate::repo::RepoError;
use crate::state::StateError;
use crate::util::args::SplitArgsError;
use crate::util::hash::ContentHash;
use crate::version::Version;

/// Errors of a setup run.
///
/// The first five variants classify failures of the inputs; the rest wrap
/// failures of external tools and the filesystem.
#[derive(Debug, Error)]
pub enum SetupError {
  /// A release tag, version or argument string does not follow its grammar.
  #[error("malformed input: {0}")]
  MalformedInput(String),

  /// No release matches a version request.
  #[error("could not find a matching {project} release for {request}")]
  UnresolvableVersion { project: Project, request: String },

  /// A git reference is neither a branch nor a commit.
  #[error(transparent)]
  UnresolvableReference(RepoError),

  /// The requested projects cannot be ordered.
  #[error(transparent)]
  CycleOrUnresolvable(#[from] OrderError),

  /// A required file or environment setting is absent or invalid.
  #[error("missing configuration: {0}")]
  MissingConfiguration(String),

  #[error(transparent)]
  Release(ReleaseError),

  #[error(transparent)]
  Repo(RepoError),

  #[error(transparent)]
  PackageManager(PmError),

  #[error(transparent)]
  Cmake(CmakeError),

  #[error(transparent)]
  Cache(#[from] CacheError),

  #[error(transparent)]
  Ninja(#[from] NinjaError),

  #[error(transparent)]
  Msvc(MsvcError),

  #[error(transparent)]
  Extract(#[from] ExtractError),

  #[error(transparent)]
  State(StateError),

  #[error(transparent)]
  Execute(#[from] ExecuteError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl From<ReleaseError> for SetupError {
  fn from(e: ReleaseError) -> Self {
    match e {
      ReleaseError::MalformedLine(_) | ReleaseError::MalformedTag(_) => SetupError::MalformedInput(e.to_string()),
      ReleaseError::Fetch { .. } => SetupError::Release(e),
    }
  }
}

impl From<RepoError> for SetupError {
  fn from(e: RepoError) -> Self {
    match e {
      RepoError::UnresolvableReference { .. } => SetupError::UnresolvableReference(e),
      _ => SetupError::Repo(e),
    }
  }
}

impl From<PmError> for SetupError {
  fn from(e: PmError) -> Self {
    match e {
      PmError::Unknown(_) => SetupError::MalformedInput(e.to_string()),
      PmError::MissingMsystem | PmError::InvalidMsystem(_) => SetupError::MissingConfiguration(e.to_string()),
      PmError::Execute(_) => SetupError::PackageManager(e),
    }
  }
}

impl From<CmakeError> for SetupError {
  fn from(e: CmakeError) -> Self {
    match e {
      CmakeError::InvalidBuildType(_) => SetupError::MalformedInput(e.to_string()),
      CmakeError::Execute(_) => SetupError::Cmake(e),
    }
  }
}

impl From<MsvcError> for SetupError {
  fn from(e: MsvcError) -> Self {
    match e {
      MsvcError::NotFound => SetupError::MissingConfiguration(e.to_string()),
      MsvcError::InvalidParameters(_) => SetupError::MalformedInput(e.to_string()),
      MsvcError::UnexpectedOutput | MsvcError::Execute(_) => SetupError::Msvc(e),
    }
  }
}

impl From<StateError> for SetupError {
  fn from(e: StateError) -> Self {
    match e {
      StateError::MissingToolchainFile(_) => SetupError::MissingConfiguration(e.to_string()),
      StateError::Args(_) => SetupError::MalformedInput(e.to_string()),
      StateError::Hash(_) => SetupError::State(e),
    }
  }
}

impl From<SplitArgsError> for SetupError {
  fn from(e: SplitArgsError) -> Self {
    SetupError::MalformedInput(e.to_string())
  }
}

/// Inputs of a setup run.
#[derive(Debug, Clone, Default)]
pub struct SetupConfig {
  /// Raw version request per project.
  pub requests: Vec<(Project, String)>,
  /// Allow pre-releases when matching releases.
  pub prerelease: bool,
  pub build_type: BuildType,
  pub cmake_toolchain_file: Option<PathBuf>,
  pub cmake_generator: Option<String>,
  /// Install ninja and use it as generator unless one is given.
  pub ninja: bool,
  /// Load the Visual C++ developer environment first (Windows only).
  pub msvc: Option<MsvcOptions>,
  /// Extra configure arguments, split with shell rules.
  pub cmake_arguments: Option<String>,
  /// Extra value mixed into every fingerprint.
  pub discriminator: Option<String>,
  pub install_linux_dependencies: bool,
  /// Package manager to use instead of the detected one.
  pub package_manager: Option<PackageManagerType>,
  pub shell: Option<String>,
  /// Directory for sources, build trees and install prefixes.
  pub root: Option<PathBuf>,
  /// Cache directory, the user cache directory when unset.
  pub cache_dir: Option<PathBuf>,
  pub github_token: Option<String>,
  /// GitHub API endpoint, the public API when unset.
  pub github_api_url: Option<String>,
}

/// Result of setting up one project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectOutcome {
  pub project: Project,
  /// Tag, branch or commit the request resolved to.
  pub git_reference: String,
  pub git_hash: String,
  pub state_hash: ContentHash,
  pub cache_key: String,
  pub cache_hit: bool,
  pub prefix: PathBuf,
  pub version: Version,
  /// Exported variable pointing at `prefix`.
  pub cmake_var: String,
}

/// Result of a setup run.
#[derive(Debug, Clone, Serialize)]
pub struct SetupResult {
  pub platform: BuildPlatform,
  pub package_manager: Option<PackageManagerType>,
  /// Outcomes in build order.
  pub projects: Vec<ProjectOutcome>,
}

impl SetupResult {
  pub fn get(&self, project: Project) -> Option<&ProjectOutcome> {
    self.projects.iter().find(|o| o.project == project)
  }

  /// Step outputs as `name`/`value` pairs.
  ///
  /// SDL reports `prefix` and `version`; every other project reports
  /// `<name>-prefix` and `<name>-version`.
  pub fn outputs(&self) -> Vec<(String, String)> {
    let mut outputs = Vec::new();
    for outcome in &self.projects {
      let (prefix_name, version_name) = match outcome.project {
        Project::Sdl => ("prefix".to_string(), "version".to_string()),
        project => (format!("{}-prefix", project), format!("{}-version", project)),
      };
      outputs.push((prefix_name, outcome.prefix.display().to_string()));
      outputs.push((version_name, outcome.version.to_string()));
    }
    outputs
  }

  /// Exported environment variables as `name`/`value` pairs.
  pub fn exports(&self) -> Vec<(String, String)> {
    self
      .projects
      .iter()
      .map(|o| (o.cmake_var.clone(), o.prefix.display().to_string()))
      .collect()
  }
}
