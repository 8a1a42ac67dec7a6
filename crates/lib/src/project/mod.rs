//! Buildable projects and their static descriptions.

pub mod extract;
pub mod order;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::pm::{PackageManagerType, Packages};

pub use extract::{ExtractError, VersionExtractor};
pub use order::{OrderError, build_order, resolve_build_order};

/// A project this tool knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Project {
  #[serde(rename = "SDL")]
  Sdl,
  #[serde(rename = "SDL_image")]
  SdlImage,
  #[serde(rename = "SDL_mixer")]
  SdlMixer,
  #[serde(rename = "SDL_net")]
  SdlNet,
  #[serde(rename = "SDL_rtf")]
  SdlRtf,
  #[serde(rename = "SDL_ttf")]
  SdlTtf,
  #[serde(rename = "sdl2-compat")]
  Sdl2Compat,
  #[serde(rename = "sdl12-compat")]
  Sdl12Compat,
}

/// Static configuration of a project.
#[derive(Debug)]
pub struct ProjectDescription {
  /// Name of the input selecting this project's version.
  pub option_name: &'static str,
  /// Prefix stripped (case-insensitively) from version requests.
  pub discarded_prefix: Option<&'static str>,
  /// The exported CMake variable is `<prefix><major><suffix>`.
  pub cmake_var_out_prefix: &'static str,
  pub cmake_var_out_suffix: &'static str,
  /// Dependencies as OR-groups: each group is satisfied by any one of its members.
  pub deps: &'static [&'static [Project]],
  pub major_define: &'static str,
  pub minor_define: &'static str,
  /// Regex alternation, since the patch define was renamed between releases.
  pub patch_define: &'static str,
  pub header_paths: &'static [&'static str],
  pub header_filenames: &'static [&'static str],
  pub git_url: &'static str,
  pub repo_owner: &'static str,
  pub repo_name: &'static str,
  /// Development branch per major version.
  pub version_branch_map: &'static [(u32, &'static str)],
  /// System packages needed to build, per package manager.
  pub packages: &'static [(PackageManagerType, Packages)],
}

const SDL_BRANCHES: &[(u32, &str)] = &[(2, "SDL2"), (3, "main")];

static SDL: ProjectDescription = ProjectDescription {
  option_name: "version",
  discarded_prefix: Some("sdl"),
  cmake_var_out_prefix: "SDL",
  cmake_var_out_suffix: "_ROOT",
  deps: &[],
  major_define: "SDL_MAJOR_VERSION",
  minor_define: "SDL_MINOR_VERSION",
  patch_define: "(?:SDL_PATCHLEVEL|SDL_MICRO_VERSION)",
  header_paths: &["include/SDL3", "include/SDL2"],
  header_filenames: &["SDL_version.h"],
  git_url: "https://github.com/libsdl-org/SDL.git",
  repo_owner: "libsdl-org",
  repo_name: "SDL",
  version_branch_map: SDL_BRANCHES,
  packages: &[
    (
      PackageManagerType::AptGet,
      Packages {
        required: &[
          "cmake",
          "make",
          "ninja-build",
          "libasound2-dev",
          "libpulse-dev",
          "libaudio-dev",
          "libjack-dev",
          "libsndio-dev",
          "libusb-1.0-0-dev",
          "libx11-dev",
          "libxext-dev",
          "libxrandr-dev",
          "libxcursor-dev",
          "libxfixes-dev",
          "libxi-dev",
          "libxss-dev",
          "libwayland-dev",
          "libxkbcommon-dev",
          "libdrm-dev",
          "libgbm-dev",
          "libgl1-mesa-dev",
          "libgles2-mesa-dev",
          "libegl1-mesa-dev",
          "libdbus-1-dev",
          "libibus-1.0-dev",
          "libudev-dev",
          "fcitx-libs-dev",
        ],
        // Only available on newer distributions.
        optional: &["libpipewire-0.3-dev", "libdecor-0-dev"],
      },
    ),
    (
      PackageManagerType::Dnf,
      Packages {
        required: &[
          "cmake",
          "make",
          "ninja-build",
          "alsa-lib-devel",
          "dbus-devel",
          "ibus-devel",
          "libusb1-devel",
          "libX11-devel",
          "libXau-devel",
          "libXScrnSaver-devel",
          "libXcursor-devel",
          "libXext-devel",
          "libXfixes-devel",
          "libXi-devel",
          "libXrandr-devel",
          "libxkbcommon-devel",
          "libdecor-devel",
          "libglvnd-devel",
          "pipewire-devel",
          "pipewire-jack-audio-connection-kit-devel",
          "pulseaudio-libs-devel",
          "wayland-devel",
        ],
        optional: &[],
      },
    ),
  ],
};

static SDL_IMAGE: ProjectDescription = ProjectDescription {
  option_name: "version-sdl-image",
  discarded_prefix: None,
  cmake_var_out_prefix: "SDL",
  cmake_var_out_suffix: "_image_ROOT",
  deps: &[&[Project::Sdl]],
  major_define: "SDL_IMAGE_MAJOR_VERSION",
  minor_define: "SDL_IMAGE_MINOR_VERSION",
  patch_define: "(?:SDL_IMAGE_MICRO_VERSION|SDL_IMAGE_PATCHLEVEL)",
  header_paths: &["include/SDL3_image", "include/SDL2"],
  header_filenames: &["SDL_image.h"],
  git_url: "https://github.com/libsdl-org/SDL_image.git",
  repo_owner: "libsdl-org",
  repo_name: "SDL_image",
  version_branch_map: SDL_BRANCHES,
  packages: &[],
};

static SDL_MIXER: ProjectDescription = ProjectDescription {
  option_name: "version-sdl-mixer",
  discarded_prefix: None,
  cmake_var_out_prefix: "SDL",
  cmake_var_out_suffix: "_mixer_ROOT",
  deps: &[&[Project::Sdl]],
  major_define: "SDL_MIXER_MAJOR_VERSION",
  minor_define: "SDL_MIXER_MINOR_VERSION",
  patch_define: "(?:SDL_MIXER_MICRO_VERSION|SDL_MIXER_PATCHLEVEL)",
  header_paths: &["include/SDL3_mixer", "include/SDL2"],
  header_filenames: &["SDL_mixer.h"],
  git_url: "https://github.com/libsdl-org/SDL_mixer.git",
  repo_owner: "libsdl-org",
  repo_name: "SDL_mixer",
  version_branch_map: SDL_BRANCHES,
  packages: &[],
};

static SDL_NET: ProjectDescription = ProjectDescription {
  option_name: "version-sdl-net",
  discarded_prefix: None,
  cmake_var_out_prefix: "SDL",
  cmake_var_out_suffix: "_net_ROOT",
  deps: &[&[Project::Sdl]],
  major_define: "SDL_NET_MAJOR_VERSION",
  minor_define: "SDL_NET_MINOR_VERSION",
  patch_define: "(?:SDL_NET_MICRO_VERSION|SDL_NET_PATCHLEVEL)",
  header_paths: &["include/SDL3_net", "include/SDL2", "include"],
  header_filenames: &["SDL_net.h"],
  git_url: "https://github.com/libsdl-org/SDL_net.git",
  repo_owner: "libsdl-org",
  repo_name: "SDL_net",
  version_branch_map: SDL_BRANCHES,
  packages: &[],
};

static SDL_RTF: ProjectDescription = ProjectDescription {
  option_name: "version-sdl-rtf",
  discarded_prefix: None,
  cmake_var_out_prefix: "SDL",
  cmake_var_out_suffix: "_rtf_ROOT",
  deps: &[&[Project::Sdl], &[Project::SdlTtf]],
  major_define: "SDL_RTF_MAJOR_VERSION",
  minor_define: "SDL_RTF_MINOR_VERSION",
  patch_define: "(?:SDL_RTF_MICRO_VERSION|SDL_RTF_PATCHLEVEL)",
  header_paths: &["include/SDL3_rtf", "include/SDL2", "include"],
  header_filenames: &["SDL_rtf.h"],
  git_url: "https://github.com/libsdl-org/SDL_rtf.git",
  repo_owner: "libsdl-org",
  repo_name: "SDL_rtf",
  version_branch_map: SDL_BRANCHES,
  packages: &[],
};

static SDL_TTF: ProjectDescription = ProjectDescription {
  option_name: "version-sdl-ttf",
  discarded_prefix: None,
  cmake_var_out_prefix: "SDL",
  cmake_var_out_suffix: "_ttf_ROOT",
  deps: &[&[Project::Sdl]],
  major_define: "SDL_TTF_MAJOR_VERSION",
  minor_define: "SDL_TTF_MINOR_VERSION",
  patch_define: "(?:SDL_TTF_MICRO_VERSION|SDL_TTF_PATCHLEVEL)",
  header_paths: &["include/SDL3_ttf", "include/SDL2"],
  header_filenames: &["SDL_ttf.h"],
  git_url: "https://github.com/libsdl-org/SDL_ttf.git",
  repo_owner: "libsdl-org",
  repo_name: "SDL_ttf",
  version_branch_map: SDL_BRANCHES,
  packages: &[
    (
      PackageManagerType::AptGet,
      Packages {
        required: &["libfreetype-dev", "libharfbuzz-dev"],
        optional: &[],
      },
    ),
    (
      PackageManagerType::Dnf,
      Packages {
        required: &["freetype-devel", "harfbuzz-devel"],
        optional: &[],
      },
    ),
    (
      PackageManagerType::Msys2Pacman,
      Packages {
        required: &["freetype", "harfbuzz"],
        optional: &[],
      },
    ),
  ],
};

/// SDL2 API implemented on top of SDL3.
static SDL2_COMPAT: ProjectDescription = ProjectDescription {
  option_name: "version-sdl2-compat",
  discarded_prefix: None,
  cmake_var_out_prefix: "SDL",
  cmake_var_out_suffix: "_ROOT",
  deps: &[&[Project::Sdl]],
  major_define: "SDL_MAJOR_VERSION",
  minor_define: "SDL_MINOR_VERSION",
  patch_define: "(?:SDL_PATCHLEVEL|SDL_MICRO_VERSION)",
  header_paths: &["include/SDL2"],
  header_filenames: &["SDL_version.h"],
  git_url: "https://github.com/libsdl-org/sdl2-compat.git",
  repo_owner: "libsdl-org",
  repo_name: "sdl2-compat",
  version_branch_map: &[(2, "main")],
  packages: &[],
};

/// SDL 1.2 API implemented on top of SDL2, real or emulated by sdl2-compat.
static SDL12_COMPAT: ProjectDescription = ProjectDescription {
  option_name: "version-sdl12-compat",
  discarded_prefix: None,
  cmake_var_out_prefix: "SDL",
  cmake_var_out_suffix: "_ROOT",
  deps: &[&[Project::Sdl, Project::Sdl2Compat]],
  major_define: "SDL_MAJOR_VERSION",
  minor_define: "SDL_MINOR_VERSION",
  patch_define: "SDL_PATCHLEVEL",
  header_paths: &["include/SDL"],
  header_filenames: &["SDL_version.h"],
  git_url: "https://github.com/libsdl-org/sdl12-compat.git",
  repo_owner: "libsdl-org",
  repo_name: "sdl12-compat",
  version_branch_map: &[(1, "main")],
  packages: &[],
};

impl Project {
  /// All projects, in the order their inputs are read.
  pub const ALL: [Project; 8] = [
    Project::Sdl,
    Project::SdlImage,
    Project::SdlMixer,
    Project::SdlNet,
    Project::SdlRtf,
    Project::SdlTtf,
    Project::Sdl2Compat,
    Project::Sdl12Compat,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      Project::Sdl => "SDL",
      Project::SdlImage => "SDL_image",
      Project::SdlMixer => "SDL_mixer",
      Project::SdlNet => "SDL_net",
      Project::SdlRtf => "SDL_rtf",
      Project::SdlTtf => "SDL_ttf",
      Project::Sdl2Compat => "sdl2-compat",
      Project::Sdl12Compat => "sdl12-compat",
    }
  }

  pub fn description(&self) -> &'static ProjectDescription {
    match self {
      Project::Sdl => &SDL,
      Project::SdlImage => &SDL_IMAGE,
      Project::SdlMixer => &SDL_MIXER,
      Project::SdlNet => &SDL_NET,
      Project::SdlRtf => &SDL_RTF,
      Project::SdlTtf => &SDL_TTF,
      Project::Sdl2Compat => &SDL2_COMPAT,
      Project::Sdl12Compat => &SDL12_COMPAT,
    }
  }

  /// Dependency OR-groups of this project.
  pub fn deps(&self) -> &'static [&'static [Project]] {
    self.description().deps
  }
}

impl ProjectDescription {
  /// Development branch tracking `major`, if the project has one.
  pub fn head_branch(&self, major: u32) -> Option<&'static str> {
    self
      .version_branch_map
      .iter()
      .find(|(m, _)| *m == major)
      .map(|(_, branch)| *branch)
  }

  /// Name of the exported CMake variable for an installed `major` version.
  pub fn cmake_var_out(&self, major: u32) -> String {
    format!("{}{}{}", self.cmake_var_out_prefix, major, self.cmake_var_out_suffix)
  }

  /// System packages for a package manager, if any are declared.
  pub fn packages_for(&self, kind: PackageManagerType) -> Option<&'static Packages> {
    self.packages.iter().find(|(k, _)| *k == kind).map(|(_, packages)| packages)
  }

  pub fn extractor(&'static self) -> Result<VersionExtractor, ExtractError> {
    VersionExtractor::new(self)
  }
}

impl fmt::Display for Project {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Error returned for an unknown project name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown project: {0}")]
pub struct UnknownProject(pub String);

impl FromStr for Project {
  type Err = UnknownProject;

  /// Names match case-insensitively, with `-` and `_` interchangeable.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let normalize = |name: &str| name.trim().to_ascii_lowercase().replace('-', "_");
    let wanted = normalize(s);
    Project::ALL
      .into_iter()
      .find(|project| normalize(project.name()) == wanted)
      .ok_or_else(|| UnknownProject(s.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn names_round_trip() {
    for project in Project::ALL {
      assert_eq!(project.name().parse::<Project>().unwrap(), project);
      assert_eq!(project.to_string(), project.name());
    }
  }

  #[test]
  fn names_are_lenient() {
    assert_eq!("sdl_image".parse::<Project>().unwrap(), Project::SdlImage);
    assert_eq!("SDL-TTF".parse::<Project>().unwrap(), Project::SdlTtf);
    assert_eq!("sdl2_compat".parse::<Project>().unwrap(), Project::Sdl2Compat);
    assert!("SDL_sound".parse::<Project>().is_err());
  }

  #[test]
  fn option_names_are_unique() {
    let mut names: Vec<_> = Project::ALL.iter().map(|p| p.description().option_name).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), Project::ALL.len());
  }

  #[test]
  fn head_branches() {
    assert_eq!(Project::Sdl.description().head_branch(2), Some("SDL2"));
    assert_eq!(Project::Sdl.description().head_branch(3), Some("main"));
    assert_eq!(Project::Sdl.description().head_branch(1), None);
    assert_eq!(Project::Sdl12Compat.description().head_branch(1), Some("main"));
  }

  #[test]
  fn exported_cmake_variables() {
    assert_eq!(Project::Sdl.description().cmake_var_out(3), "SDL3_ROOT");
    assert_eq!(Project::SdlTtf.description().cmake_var_out(2), "SDL2_ttf_ROOT");
    assert_eq!(Project::Sdl2Compat.description().cmake_var_out(2), "SDL2_ROOT");
  }

  #[test]
  fn package_lists() {
    let ttf = Project::SdlTtf.description();
    let apt = ttf.packages_for(PackageManagerType::AptGet).unwrap();
    assert_eq!(apt.required, &["libfreetype-dev", "libharfbuzz-dev"]);
    assert!(ttf.packages_for(PackageManagerType::Brew).is_none());

    let sdl = Project::Sdl.description().packages_for(PackageManagerType::AptGet).unwrap();
    assert!(sdl.required.contains(&"libx11-dev"));
    assert_eq!(sdl.optional, &["libpipewire-0.3-dev", "libdecor-0-dev"]);
  }

  #[test]
  fn dependencies_only_reference_other_projects() {
    for project in Project::ALL {
      for group in project.deps() {
        assert!(!group.is_empty());
        assert!(!group.contains(&project), "{} depends on itself", project);
      }
    }
  }
}
