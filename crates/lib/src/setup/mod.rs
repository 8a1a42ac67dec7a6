//! The setup driver.
//!
//! A run goes through these steps:
//!
//! 1. Parse the version request of every project
//! 2. Order the projects so dependencies come first
//! 3. Optionally load the MSVC environment and install system packages
//! 4. Per project: resolve the request to a commit, fingerprint the build,
//!    then restore the install tree from the cache or build and cache it
//! 5. Export `<prefix><major><suffix>` for later projects and steps

mod types;

pub use types::*;

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::cache::LocalCache;
use crate::cmake::{CmakeOptions, ProjectDirs, configure_build_install};
use crate::execute::{Executor, command_exists};
use crate::msvc::setup_vc_environment;
use crate::ninja::NinjaInstaller;
use crate::platform::BuildPlatform;
use crate::platform::paths::root_dir;
use crate::pm::{PackageManager, PackageManagerType, detect_package_manager};
use crate::project::{Project, build_order};
use crate::release::ReleaseDb;
use crate::release::fetch::fetch_release_db;
use crate::repo::{GitHubClient, checkout_git_hash};
use crate::state::{EnvSnapshot, StateInputs, cache_key, compute_state_hash};
use crate::util::args::split_args;
use crate::util::hash::ContentHash;
use crate::version::{ReleaseType, VersionRequest, parse_version_request};

/// Parse the version request of every configured project.
pub fn parse_requests(config: &SetupConfig) -> Vec<(Project, VersionRequest)> {
  config
    .requests
    .iter()
    .map(|(project, raw)| {
      let request = parse_version_request(raw, project.description().discarded_prefix);
      debug!(project = %project, request = %request, "parsed version request");
      (*project, request)
    })
    .collect()
}

/// Whether a request is matched against the release catalog.
pub fn needs_release_db(request: &VersionRequest) -> bool {
  matches!(
    request.release_type(),
    ReleaseType::Any | ReleaseType::Latest | ReleaseType::Exact
  )
}

/// Pick the git reference to check out for a request.
///
/// `releases` is only consulted for catalog requests (see [`needs_release_db`]).
pub fn select_git_reference(
  project: Project,
  request: &VersionRequest,
  releases: Option<&ReleaseDb>,
  prerelease: bool,
) -> Result<String, SetupError> {
  let unresolvable = || SetupError::UnresolvableVersion {
    project,
    request: request.to_string(),
  };

  match request {
    VersionRequest::Commit(reference) => Ok(reference.clone()),
    VersionRequest::Head(version) => project
      .description()
      .head_branch(version.major)
      .map(str::to_string)
      .ok_or_else(unresolvable),
    VersionRequest::Any(version) | VersionRequest::Latest(version) | VersionRequest::Exact(version) => releases
      .and_then(|db| db.find(*version, prerelease, request.release_type()))
      .map(|release| release.tag.clone())
      .ok_or_else(unresolvable),
  }
}

/// Resolve the package manager for dependency installation.
fn resolve_package_manager(
  config: &SetupConfig,
  platform: BuildPlatform,
  msystem: Option<&str>,
) -> Result<Option<PackageManagerType>, SetupError> {
  if let Some(kind) = config.package_manager {
    return Ok(Some(kind));
  }
  if !config.install_linux_dependencies {
    return Ok(None);
  }
  match detect_package_manager(platform, msystem, command_exists) {
    Some(kind) => Ok(Some(kind)),
    None => Err(SetupError::MissingConfiguration(format!(
      "no supported package manager found on {}",
      platform
    ))),
  }
}

/// Run-wide settings derived from a [`SetupConfig`] and the host.
///
/// Every fingerprint of a run is built from these, so `setup` and anything
/// predicting its cache keys agree.
#[derive(Debug, Clone)]
pub struct RunSettings {
  pub platform: BuildPlatform,
  pub msystem: Option<String>,
  /// Canonical path of the toolchain file.
  pub toolchain_file: Option<PathBuf>,
  pub package_manager: Option<PackageManagerType>,
}

impl RunSettings {
  /// Check the run-wide inputs of `config` on the current host.
  pub fn prepare(config: &SetupConfig) -> Result<Self, SetupError> {
    let platform = BuildPlatform::current()
      .ok_or_else(|| SetupError::MissingConfiguration(format!("unsupported build platform {}", std::env::consts::OS)))?;
    let msystem = std::env::var("MSYSTEM").ok().filter(|m| !m.is_empty());
    Self::for_platform(config, platform, msystem)
  }

  fn for_platform(config: &SetupConfig, platform: BuildPlatform, msystem: Option<String>) -> Result<Self, SetupError> {
    let toolchain_file = match &config.cmake_toolchain_file {
      Some(toolchain) if !toolchain.is_file() => {
        return Err(SetupError::MissingConfiguration(format!(
          "cannot find CMake toolchain file {}",
          toolchain.display()
        )));
      }
      Some(toolchain) => Some(dunce::canonicalize(toolchain)?),
      None => None,
    };
    let package_manager = resolve_package_manager(config, platform, msystem.as_deref())?;

    Ok(Self {
      platform,
      msystem,
      toolchain_file,
      package_manager,
    })
  }

  /// Generator passed to CMake. `ninja` selects Ninja unless a generator is given.
  pub fn generator(&self, config: &SetupConfig) -> Option<String> {
    match (&config.cmake_generator, config.ninja) {
      (Some(generator), _) => Some(generator.clone()),
      (None, true) => Some("Ninja".to_string()),
      (None, false) => None,
    }
  }

  pub fn cmake_options(&self, config: &SetupConfig) -> Result<CmakeOptions, SetupError> {
    Ok(CmakeOptions {
      build_type: config.build_type,
      generator: self.generator(config),
      toolchain_file: self.toolchain_file.clone(),
      extra_args: split_args(config.cmake_arguments.as_deref())?,
    })
  }

  /// Fingerprint inputs of a project checked out at `git_hash`.
  pub fn state_inputs(
    &self,
    config: &SetupConfig,
    git_hash: impl Into<String>,
    dependencies: Vec<(Project, ContentHash)>,
  ) -> StateInputs {
    StateInputs {
      git_hash: git_hash.into(),
      build_platform: self.platform,
      shell: config.shell.clone(),
      package_manager: self.package_manager,
      build_type: config.build_type.to_string(),
      cmake_toolchain_file: self.toolchain_file.clone(),
      cmake_generator: config.cmake_generator.clone(),
      ninja: config.ninja,
      cmake_arguments: config.cmake_arguments.clone(),
      discriminator: config.discriminator.clone(),
      dependencies,
    }
  }
}

async fn install_dependencies(
  executor: &Executor,
  kind: PackageManagerType,
  msystem: Option<&str>,
  order: &[Project],
) -> Result<(), SetupError> {
  let pm = PackageManager::create(kind, msystem)?;
  let sets: Vec<_> = order
    .iter()
    .filter_map(|project| project.description().packages_for(kind))
    .collect();
  if sets.is_empty() {
    info!(manager = %kind, "no system packages needed");
    return Ok(());
  }

  pm.update(executor).await?;
  for packages in sets {
    pm.install_packages(executor, packages).await?;
  }
  Ok(())
}

/// Fingerprints of the direct dependencies of `project` that were already set up.
fn dependency_hashes(project: Project, done: &[ProjectOutcome]) -> Vec<(Project, ContentHash)> {
  done
    .iter()
    .filter(|outcome| project.deps().iter().any(|group| group.contains(&outcome.project)))
    .map(|outcome| (outcome.project, outcome.state_hash.clone()))
    .collect()
}

fn project_base_dir(root: &Path, project: Project, hash: &ContentHash) -> PathBuf {
  root.join(project.name()).join(&hash.0)
}

/// Run the whole setup.
///
/// Exported variables are added to the executor's overlay so later
/// commands (and later projects) see them.
pub async fn run_setup(config: &SetupConfig, executor: &mut Executor) -> Result<SetupResult, SetupError> {
  let requests = parse_requests(config);
  let projects: Vec<Project> = requests.iter().map(|(p, _)| *p).collect();
  let order = build_order(&projects)?;
  let names: Vec<&str> = order.iter().map(Project::name).collect();
  info!(order = ?names, "build order");

  let settings = RunSettings::prepare(config)?;
  let platform = settings.platform;
  info!(platform = %platform, "build platform");
  let cmake_options = settings.cmake_options(config)?;

  let root = root_dir(platform, config.root.as_deref());
  info!(root = %root.display(), "root directory");
  let cache = config
    .cache_dir
    .as_ref()
    .map(LocalCache::new)
    .unwrap_or_else(LocalCache::default_cache);

  if let Some(options) = &config.msvc {
    setup_vc_environment(executor, platform, options).await?;
  }

  if let Some(kind) = settings.package_manager
    && config.install_linux_dependencies
  {
    install_dependencies(executor, kind, settings.msystem.as_deref(), &order).await?;
  }

  let mut github = GitHubClient::new(config.github_token.clone())?;
  if let Some(url) = &config.github_api_url {
    github = github.with_api_url(url.clone());
  }

  let ninja = config.ninja.then(|| NinjaInstaller::new(platform, cache.dir()));
  let mut ninja_ready = false;
  let mut outcomes: Vec<ProjectOutcome> = Vec::with_capacity(order.len());

  for project in order {
    let Some((_, request)) = requests.iter().find(|(p, _)| *p == project) else {
      continue;
    };
    let desc = project.description();

    let releases = if needs_release_db(request) {
      Some(fetch_release_db(executor, desc.repo_owner, desc.repo_name).await?)
    } else {
      None
    };
    let git_reference = select_git_reference(project, request, releases.as_ref(), config.prerelease)?;
    let git_hash = github
      .resolve_reference(desc.repo_owner, desc.repo_name, &git_reference)
      .await?;

    let state_inputs = settings.state_inputs(config, git_hash.clone(), dependency_hashes(project, &outcomes));
    let env = EnvSnapshot::capture().with_overlay(executor.overlay());
    let state_hash = compute_state_hash(&state_inputs, &env)?;
    let key = cache_key(project, &state_hash);
    info!(project = %project, state = %state_hash, "fingerprint");

    let dirs = ProjectDirs::under(&project_base_dir(&root, project, &state_hash));
    let cache_hit = cache.restore(&key, &dirs.package)?;

    if !cache_hit {
      info!(project = %project, "no match found in cache, building from scratch");
      if let Some(installer) = &ninja
        && !ninja_ready
      {
        installer.install(executor.overlay_mut()).await?;
        ninja_ready = true;
      }
      if dirs.source.exists() {
        tokio::fs::remove_dir_all(&dirs.source).await?;
      }
      checkout_git_hash(executor, project.name(), desc.git_url, &git_hash, &dirs.source).await?;
      configure_build_install(executor, project.name(), &dirs, &cmake_options).await?;
      if let Err(e) = cache.save(&key, &dirs.package) {
        warn!(key = %key, error = %e, "failed to save cache entry");
      }
    }

    let version = desc.extractor()?.extract_from_install_prefix(&dirs.package)?;
    let cmake_var = desc.cmake_var_out(version.major);
    info!(project = %project, version = %version, var = %cmake_var, "installed");
    executor.overlay_mut().set(&cmake_var, dirs.package.display().to_string());

    outcomes.push(ProjectOutcome {
      project,
      git_reference,
      git_hash,
      state_hash,
      cache_key: key,
      cache_hit,
      prefix: dirs.package,
      version,
      cmake_var,
    });
  }

  Ok(SetupResult {
    platform,
    package_manager: settings.package_manager,
    projects: outcomes,
  })
}
