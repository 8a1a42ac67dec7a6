//! Command-line inputs.
//!
//! Every input can also be given through the environment, using the
//! `INPUT_<NAME>` variables GitHub Actions sets for action inputs. Empty values
//! count as unset.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use clap::builder::FalseyValueParser;

use setup_sdl_lib::cmake::BuildType;
use setup_sdl_lib::msvc::MsvcOptions;
use setup_sdl_lib::pm::PackageManagerType;
use setup_sdl_lib::project::Project;
use setup_sdl_lib::setup::SetupConfig;

use crate::output::OutputFormat;

fn non_empty(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Inputs that influence how a project is built, and so its fingerprint.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
  /// CMake build type (Release, Debug, MinSizeRel or RelWithDebInfo)
  #[arg(long, env = "INPUT_BUILD-TYPE")]
  pub build_type: Option<String>,

  /// CMake toolchain file
  #[arg(long, env = "INPUT_CMAKE-TOOLCHAIN-FILE")]
  pub cmake_toolchain_file: Option<String>,

  /// CMake generator
  #[arg(long, env = "INPUT_CMAKE-GENERATOR")]
  pub cmake_generator: Option<String>,

  /// Extra arguments for the CMake configure step, split with shell rules
  #[arg(long, env = "INPUT_CMAKE-ARGUMENTS", allow_hyphen_values = true)]
  pub cmake_arguments: Option<String>,

  /// Extra value mixed into the fingerprint
  #[arg(long, env = "INPUT_DISCRIMINATOR")]
  pub discriminator: Option<String>,

  /// Download ninja and build with it
  #[arg(long, env = "INPUT_NINJA", value_parser = FalseyValueParser::new())]
  pub ninja: bool,

  /// Shell used to run commands
  #[arg(long, env = "INPUT_SHELL")]
  pub shell: Option<String>,

  /// Install the system packages the projects need
  #[arg(long, env = "INPUT_INSTALL-LINUX-DEPENDENCIES", value_parser = FalseyValueParser::new())]
  pub install_linux_dependencies: bool,

  /// Package manager to use instead of the detected one
  #[arg(long, env = "INPUT_INSTALL-LINUX-DEPENDENCIES-MANAGER")]
  pub install_linux_dependencies_manager: Option<String>,
}

impl BuildArgs {
  pub fn build_type(&self) -> Result<BuildType> {
    match non_empty(&self.build_type) {
      Some(name) => Ok(name.parse()?),
      None => Ok(BuildType::default()),
    }
  }

  pub fn package_manager(&self) -> Result<Option<PackageManagerType>> {
    non_empty(&self.install_linux_dependencies_manager)
      .map(|name| name.parse::<PackageManagerType>())
      .transpose()
      .context("Invalid install-linux-dependencies-manager")
  }

  pub fn toolchain_file(&self) -> Option<PathBuf> {
    non_empty(&self.cmake_toolchain_file).map(PathBuf::from)
  }

  pub fn generator(&self) -> Option<String> {
    non_empty(&self.cmake_generator).map(str::to_string)
  }

  pub fn cmake_arguments(&self) -> Option<String> {
    non_empty(&self.cmake_arguments).map(str::to_string)
  }

  pub fn discriminator(&self) -> Option<String> {
    non_empty(&self.discriminator).map(str::to_string)
  }

  pub fn shell(&self) -> Option<String> {
    non_empty(&self.shell).map(str::to_string)
  }

  /// A config holding only these inputs.
  pub fn to_config(&self) -> Result<SetupConfig> {
    Ok(SetupConfig {
      build_type: self.build_type()?,
      cmake_toolchain_file: self.toolchain_file(),
      cmake_generator: self.generator(),
      ninja: self.ninja,
      cmake_arguments: self.cmake_arguments(),
      discriminator: self.discriminator(),
      install_linux_dependencies: self.install_linux_dependencies,
      package_manager: self.package_manager()?,
      shell: self.shell(),
      ..Default::default()
    })
  }
}

/// Visual C++ developer environment inputs.
#[derive(Args, Debug, Clone, Default)]
pub struct MsvcArgs {
  /// Load the Visual C++ developer environment before building (Windows)
  #[arg(long, env = "INPUT_MSVC", value_parser = FalseyValueParser::new())]
  pub msvc: bool,

  /// Target architecture passed to vcvarsall
  #[arg(long, env = "INPUT_MSVC-ARCH")]
  pub msvc_arch: Option<String>,

  /// Windows SDK version
  #[arg(long, env = "INPUT_VC-SDK")]
  pub vc_sdk: Option<String>,

  /// VC++ toolset version
  #[arg(long, env = "INPUT_VC-TOOLSET")]
  pub vc_toolset: Option<String>,

  /// Target the Universal Windows Platform
  #[arg(long, env = "INPUT_VC-UWP", value_parser = FalseyValueParser::new())]
  pub vc_uwp: bool,

  /// Use the Spectre-mitigated libraries
  #[arg(long, env = "INPUT_VC-SPECTRE", value_parser = FalseyValueParser::new())]
  pub vc_spectre: bool,

  /// Visual Studio year or version (e.g. 2022 or 17.0)
  #[arg(long, env = "INPUT_VC-VSVERSION")]
  pub vc_vsversion: Option<String>,
}

impl MsvcArgs {
  pub fn options(&self) -> Option<MsvcOptions> {
    if !self.msvc {
      return None;
    }
    let defaults = MsvcOptions::default();
    Some(MsvcOptions {
      arch: non_empty(&self.msvc_arch).map_or(defaults.arch, str::to_string),
      sdk: non_empty(&self.vc_sdk).map(str::to_string),
      toolset: non_empty(&self.vc_toolset).map(str::to_string),
      uwp: self.vc_uwp,
      spectre: self.vc_spectre,
      vs_version: non_empty(&self.vc_vsversion).map(str::to_string),
    })
  }
}

#[derive(Args, Debug)]
pub struct SetupArgs {
  /// Version of SDL (e.g. 2.30.8, 3-latest, 3-any, 3-head, or a git reference)
  #[arg(long = "version", id = "sdl_version", env = "INPUT_VERSION")]
  pub version: String,

  /// Version of SDL_image
  #[arg(long, env = "INPUT_VERSION-SDL-IMAGE")]
  pub version_sdl_image: Option<String>,

  /// Version of SDL_mixer
  #[arg(long, env = "INPUT_VERSION-SDL-MIXER")]
  pub version_sdl_mixer: Option<String>,

  /// Version of SDL_net
  #[arg(long, env = "INPUT_VERSION-SDL-NET")]
  pub version_sdl_net: Option<String>,

  /// Version of SDL_rtf
  #[arg(long, env = "INPUT_VERSION-SDL-RTF")]
  pub version_sdl_rtf: Option<String>,

  /// Version of SDL_ttf
  #[arg(long, env = "INPUT_VERSION-SDL-TTF")]
  pub version_sdl_ttf: Option<String>,

  /// Version of sdl2-compat
  #[arg(long, env = "INPUT_VERSION-SDL2-COMPAT")]
  pub version_sdl2_compat: Option<String>,

  /// Version of sdl12-compat
  #[arg(long, env = "INPUT_VERSION-SDL12-COMPAT")]
  pub version_sdl12_compat: Option<String>,

  /// Allow pre-releases when matching releases
  #[arg(long, env = "INPUT_PRE-RELEASE", value_parser = FalseyValueParser::new())]
  pub pre_release: bool,

  #[command(flatten)]
  pub build: BuildArgs,

  #[command(flatten)]
  pub msvc: MsvcArgs,

  /// Directory for sources, build trees and install prefixes
  #[arg(long, env = "INPUT_ROOT")]
  pub root: Option<String>,

  /// Directory holding cached install trees
  #[arg(long)]
  pub cache_dir: Option<PathBuf>,

  /// GitHub token for API requests
  #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
  pub token: Option<String>,

  /// GitHub API endpoint
  #[arg(long, env = "GITHUB_API_URL")]
  pub github_api_url: Option<String>,

  /// Output format of the summary
  #[arg(short = 'o', long, value_enum, default_value = "text")]
  pub output: OutputFormat,
}

impl SetupArgs {
  /// Version requests of all requested projects, SDL first.
  pub fn requests(&self) -> Vec<(Project, String)> {
    [
      (Project::Sdl, Some(&self.version)),
      (Project::SdlImage, self.version_sdl_image.as_ref()),
      (Project::SdlMixer, self.version_sdl_mixer.as_ref()),
      (Project::SdlNet, self.version_sdl_net.as_ref()),
      (Project::SdlRtf, self.version_sdl_rtf.as_ref()),
      (Project::SdlTtf, self.version_sdl_ttf.as_ref()),
      (Project::Sdl2Compat, self.version_sdl2_compat.as_ref()),
      (Project::Sdl12Compat, self.version_sdl12_compat.as_ref()),
    ]
    .into_iter()
    .filter_map(|(project, request)| {
      let request = request.map(|r| r.trim()).filter(|r| !r.is_empty())?;
      Some((project, request.to_string()))
    })
    .collect()
  }

  pub fn to_config(&self) -> Result<SetupConfig> {
    Ok(SetupConfig {
      requests: self.requests(),
      prerelease: self.pre_release,
      msvc: self.msvc.options(),
      root: non_empty(&self.root).map(PathBuf::from),
      cache_dir: self.cache_dir.clone(),
      github_token: non_empty(&self.token).map(str::to_string),
      github_api_url: non_empty(&self.github_api_url).map(str::to_string),
      ..self.build.to_config()?
    })
  }
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
  /// Project name (e.g. SDL, SDL_image, sdl2-compat)
  pub project: Project,

  /// Version request (e.g. 2.30.8, 3-latest, 3-head, or a git reference)
  pub request: String,

  /// Allow pre-releases
  #[arg(long)]
  pub pre_release: bool,

  /// Also look up the commit hash through the GitHub API
  #[arg(long)]
  pub commit: bool,

  /// GitHub token for API requests
  #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
  pub token: Option<String>,

  /// GitHub API endpoint
  #[arg(long, env = "GITHUB_API_URL")]
  pub github_api_url: Option<String>,

  /// Output format
  #[arg(short = 'o', long, value_enum, default_value = "text")]
  pub output: OutputFormat,
}

#[derive(Args, Debug)]
pub struct HashArgs {
  /// Project name
  pub project: Project,

  /// Commit hash of the source checkout
  pub git_hash: String,

  #[command(flatten)]
  pub build: BuildArgs,

  /// Fingerprints of dependencies as PROJECT=HASH
  #[arg(long = "dependency", value_name = "PROJECT=HASH")]
  pub dependencies: Vec<String>,

  /// Print the fingerprinted state lines
  #[arg(short, long)]
  pub verbose: bool,

  /// Output format
  #[arg(short = 'o', long, value_enum, default_value = "text")]
  pub output: OutputFormat,
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::Parser;
  use serial_test::serial;

  #[derive(Parser)]
  struct TestCli {
    #[command(flatten)]
    setup: SetupArgs,
  }

  fn parse(args: &[&str]) -> SetupArgs {
    TestCli::try_parse_from(std::iter::once("setup-sdl").chain(args.iter().copied()))
      .unwrap()
      .setup
  }

  #[test]
  #[serial]
  fn flags_build_a_config() {
    temp_env::with_vars_unset(["INPUT_VERSION-SDL-TTF", "GITHUB_TOKEN", "GITHUB_API_URL"], || {
      let args = parse(&[
        "--version",
        "3-latest",
        "--version-sdl-ttf",
        "3.2.0",
        "--build-type",
        "Debug",
        "--cmake-arguments",
        "-DSDL_STATIC=ON",
        "--install-linux-dependencies-manager",
        "ubuntu",
      ]);
      let config = args.to_config().unwrap();
      assert_eq!(
        config.requests,
        vec![
          (Project::Sdl, "3-latest".to_string()),
          (Project::SdlTtf, "3.2.0".to_string())
        ]
      );
      assert_eq!(config.build_type, BuildType::Debug);
      assert_eq!(config.cmake_arguments.as_deref(), Some("-DSDL_STATIC=ON"));
      assert_eq!(config.package_manager, Some(PackageManagerType::AptGet));
      assert!(config.github_token.is_none());
    });
  }

  #[test]
  #[serial]
  fn inputs_come_from_the_environment() {
    temp_env::with_vars(
      [
        ("INPUT_VERSION", Some("2.30.8")),
        ("INPUT_VERSION-SDL-IMAGE", Some("")),
        ("INPUT_PRE-RELEASE", Some("true")),
        ("INPUT_BUILD-TYPE", Some("")),
        ("INPUT_DISCRIMINATOR", Some("job-1")),
      ],
      || {
        let config = parse(&[]).to_config().unwrap();
        assert_eq!(config.requests, vec![(Project::Sdl, "2.30.8".to_string())]);
        assert!(config.prerelease);
        assert_eq!(config.build_type, BuildType::Release);
        assert_eq!(config.discriminator.as_deref(), Some("job-1"));
      },
    );
  }

  #[test]
  #[serial]
  fn false_boolean_input() {
    temp_env::with_vars(
      [
        ("INPUT_VERSION", Some("main")),
        ("INPUT_INSTALL-LINUX-DEPENDENCIES", Some("false")),
      ],
      || {
        assert!(!parse(&[]).build.install_linux_dependencies);
      },
    );
  }

  #[test]
  #[serial]
  fn ninja_and_msvc_inputs() {
    temp_env::with_vars(
      [
        ("INPUT_VERSION", Some("main")),
        ("INPUT_NINJA", Some("true")),
        ("INPUT_MSVC", Some("true")),
        ("INPUT_MSVC-ARCH", Some("")),
        ("INPUT_VC-VSVERSION", Some("2022")),
      ],
      || {
        let config = parse(&["--vc-spectre"]).to_config().unwrap();
        assert!(config.ninja);
        let msvc = config.msvc.unwrap();
        assert_eq!(msvc.arch, "x64");
        assert_eq!(msvc.vs_version.as_deref(), Some("2022"));
        assert!(msvc.spectre);
        assert!(!msvc.uwp);
      },
    );
  }

  #[test]
  #[serial]
  fn msvc_is_off_by_default() {
    temp_env::with_vars_unset(["INPUT_MSVC", "INPUT_NINJA"], || {
      let config = parse(&["--version", "main", "--msvc-arch", "arm64"]).to_config().unwrap();
      assert!(config.msvc.is_none());
      assert!(!config.ninja);
    });
  }

  #[test]
  #[serial]
  fn invalid_build_type_is_rejected() {
    temp_env::with_var_unset("INPUT_BUILD-TYPE", || {
      let args = parse(&["--version", "main", "--build-type", "fast"]);
      assert!(args.to_config().is_err());
    });
  }

  #[test]
  #[serial]
  fn unknown_package_manager_is_rejected() {
    temp_env::with_var_unset("INPUT_INSTALL-LINUX-DEPENDENCIES-MANAGER", || {
      let args = parse(&["--version", "main", "--install-linux-dependencies-manager", "zypper"]);
      assert!(args.to_config().is_err());
    });
  }
}
