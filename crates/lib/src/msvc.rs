//! Visual C++ developer environment.
//!
//! Windows builds with the MSVC toolchain need the variables `vcvarsall.bat`
//! sets (`PATH`, `INCLUDE`, `LIB`, ...). The batch file is located with
//! `vswhere` or in the standard install locations, run once from `cmd`, and
//! every variable it changed is copied into the executor's overlay.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::execute::{ExecuteError, Executor};
use crate::platform::BuildPlatform;

/// Visual Studio release years and their version numbers.
const VS_YEAR_VERSIONS: &[(&str, &str)] = &[
  ("2022", "17.0"),
  ("2019", "16.0"),
  ("2017", "15.0"),
  ("2015", "14.0"),
  ("2013", "12.0"),
];

/// Years searched in the standard locations, newest first.
const YEARS: &[&str] = &["2022", "2019", "2017"];

const EDITIONS: &[&str] = &["Enterprise", "Professional", "Community"];

/// Variables holding `;`-separated lists.
const PATH_VARIABLES: &[&str] = &["PATH", "INCLUDE", "LIB", "LIBPATH"];

const VCVARSALL: &str = r"VC\Auxiliary\Build\vcvarsall.bat";

const FORM_FEED: char = '\u{c}';

#[derive(Debug, Error)]
pub enum MsvcError {
  #[error("Microsoft Visual Studio not found")]
  NotFound,

  #[error("invalid vcvarsall parameters: {0}")]
  InvalidParameters(String),

  #[error("unexpected vcvarsall output")]
  UnexpectedOutput,

  #[error(transparent)]
  Execute(#[from] ExecuteError),
}

/// How `vcvarsall.bat` is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsvcOptions {
  /// Target architecture, e.g. `x64`, `x86`, `arm64` or an alias like `win64`.
  pub arch: String,
  /// Windows SDK version.
  pub sdk: Option<String>,
  /// VC++ toolset version, passed as `-vcvars_ver`.
  pub toolset: Option<String>,
  /// Build for the Universal Windows Platform.
  pub uwp: bool,
  /// Link against the Spectre-mitigated libraries.
  pub spectre: bool,
  /// Visual Studio year or version number, the newest install when unset.
  pub vs_version: Option<String>,
}

impl Default for MsvcOptions {
  fn default() -> Self {
    Self {
      arch: "x64".to_string(),
      sdk: None,
      toolset: None,
      uwp: false,
      spectre: false,
      vs_version: None,
    }
  }
}

/// Map architecture aliases to the names vcvarsall accepts. Case is ignored.
pub fn normalize_arch(arch: &str) -> String {
  match arch.to_lowercase().as_str() {
    "win32" => "x86".to_string(),
    "win64" | "x86_64" | "x86-64" => "x64".to_string(),
    _ => arch.to_string(),
  }
}

/// Version number for a Visual Studio year (`2019` → `16.0`); anything else is kept.
pub fn vs_version_number(vs_version: &str) -> &str {
  VS_YEAR_VERSIONS
    .iter()
    .find(|(year, _)| *year == vs_version)
    .map_or(vs_version, |(_, number)| *number)
}

/// Year of a Visual Studio version number (`16.0` → `2019`); anything else is kept.
pub fn vs_year(vs_version: &str) -> &str {
  VS_YEAR_VERSIONS
    .iter()
    .find(|(_, number)| *number == vs_version)
    .map_or(vs_version, |(year, _)| *year)
}

/// Arguments passed to `vcvarsall.bat`.
pub fn vcvars_arguments(options: &MsvcOptions) -> Vec<String> {
  let mut args = vec![normalize_arch(&options.arch)];
  if options.uwp {
    args.push("uwp".to_string());
  }
  if let Some(sdk) = &options.sdk {
    args.push(sdk.clone());
  }
  if let Some(toolset) = &options.toolset {
    args.push(format!("-vcvars_ver={}", toolset));
  }
  if options.spectre {
    args.push("-vcvars_spectre_libs=spectre".to_string());
  }
  args
}

/// `vswhere` query printing the installation path of a matching Visual Studio.
pub fn vswhere_command(vs_version: Option<&str>) -> String {
  let pattern = match vs_version {
    Some(version) => {
      let number = vs_version_number(version);
      let major = number.split('.').next().unwrap_or(number);
      format!("-version \"{},{}.9\"", number, major)
    }
    None => "-latest".to_string(),
  };
  format!("vswhere -products * {} -prerelease -property installationPath", pattern)
}

/// Standard `vcvarsall.bat` locations below the given program directories.
pub fn standard_locations(program_files: &[PathBuf], vs_version: Option<&str>) -> Vec<PathBuf> {
  let years: Vec<&str> = match vs_version {
    Some(version) => vec![vs_year(version)],
    None => YEARS.to_vec(),
  };

  let mut locations = Vec::new();
  for dir in program_files {
    for year in &years {
      for edition in EDITIONS {
        locations.push(
          dir
            .join("Microsoft Visual Studio")
            .join(year)
            .join(edition)
            .join(VCVARSALL),
        );
      }
    }
  }
  locations
}

fn program_files() -> Vec<PathBuf> {
  ["ProgramFiles(x86)", "ProgramFiles"]
    .into_iter()
    .filter_map(std::env::var_os)
    .map(PathBuf::from)
    .collect()
}

async fn find_vcvarsall(executor: &Executor, vs_version: Option<&str>) -> Result<PathBuf, MsvcError> {
  let dirs = program_files();

  let mut vswhere = executor.clone();
  if let Some(x86) = std::env::var_os("ProgramFiles(x86)") {
    let installer = Path::new(&x86).join("Microsoft Visual Studio").join("Installer");
    if let Err(e) = vswhere.overlay_mut().prepend_path(&installer) {
      debug!(error = %e, "cannot add vswhere to PATH");
    }
  }
  match vswhere.output(&vswhere_command(vs_version), None).await {
    Ok(install) if !install.is_empty() => {
      let path = Path::new(&install).join(VCVARSALL);
      if path.is_file() {
        info!(path = %path.display(), "found vcvarsall with vswhere");
        return Ok(path);
      }
    }
    Ok(_) => {}
    Err(e) => warn!(error = %e, "vswhere failed"),
  }

  if let Some(path) = standard_locations(&dirs, vs_version).into_iter().find(|p| p.is_file()) {
    info!(path = %path.display(), "found vcvarsall in a standard location");
    return Ok(path);
  }

  // Visual C++ 2015 Build Tools
  if let Some(x86) = dirs.first() {
    let path = x86.join("Microsoft Visual C++ Build Tools").join("vcbuildtools.bat");
    if path.is_file() {
      info!(path = %path.display(), "found Visual C++ 2015 build tools");
      return Ok(path);
    }
  }
  Err(MsvcError::NotFound)
}

/// Remove repeated entries of a `;`-separated list, keeping the first.
pub fn dedup_path_list(value: &str) -> String {
  let mut seen = Vec::new();
  for entry in value.split(';') {
    if !seen.contains(&entry) {
      seen.push(entry);
    }
  }
  seen.join(";")
}

fn parse_environment(block: &str) -> BTreeMap<&str, &str> {
  block.lines().filter_map(|line| line.split_once('=')).collect()
}

/// Variables changed by vcvarsall, from the output of
/// `set && cls && vcvarsall ... && cls && set`.
///
/// `cls` separates the three parts with a form feed.
pub fn parse_vcvars_output(output: &str) -> Result<BTreeMap<String, String>, MsvcError> {
  let mut parts = output.split(FORM_FEED);
  let (Some(before), Some(messages), Some(after)) = (parts.next(), parts.next(), parts.next()) else {
    return Err(MsvcError::UnexpectedOutput);
  };

  // vcvarsall reports bad arguments on stdout and still succeeds.
  let errors: Vec<&str> = messages
    .lines()
    .filter(|line| line.starts_with("[ERROR") && !line.ends_with("Error in script usage. The correct usage is:"))
    .collect();
  if !errors.is_empty() {
    return Err(MsvcError::InvalidParameters(errors.join("\n")));
  }

  let before = parse_environment(before);
  let mut changed = BTreeMap::new();
  for (key, value) in parse_environment(after) {
    if value.is_empty() || before.get(key) == Some(&value) {
      continue;
    }
    let value = if PATH_VARIABLES.contains(&key.to_uppercase().as_str()) {
      dedup_path_list(value)
    } else {
      value.to_string()
    };
    changed.insert(key.to_string(), value);
  }
  Ok(changed)
}

/// Load the Visual C++ developer environment into the executor's overlay.
///
/// Does nothing on other platforms. Returns the number of variables set.
pub async fn setup_vc_environment(
  executor: &mut Executor,
  platform: BuildPlatform,
  options: &MsvcOptions,
) -> Result<usize, MsvcError> {
  if platform != BuildPlatform::Windows {
    info!(platform = %platform, "not a Windows build, skipping MSVC environment");
    return Ok(0);
  }

  let vcvarsall = find_vcvarsall(executor, options.vs_version.as_deref()).await?;
  let cmd = format!(
    "set && cls && \"{}\" {} && cls && set",
    vcvarsall.display(),
    vcvars_arguments(options).join(" ")
  );
  debug!(cmd = %cmd, "vcvars command");

  let output = executor.with_shell("cmd.exe").output(&cmd, None).await?;
  let changed = parse_vcvars_output(&output)?;
  for (key, value) in &changed {
    debug!(var = %key, "setting");
    executor.overlay_mut().set(key, value);
  }
  info!(vars = changed.len(), "configured Developer Command Prompt");
  Ok(changed.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn vcvars_output(messages: &str) -> String {
    let before = "ComSpec=C:\\Windows\\system32\\cmd.exe\r\nPATH=C:\\bin;C:\\tools\r\nTEMP=C:\\Temp\r\n";
    let after = "ComSpec=C:\\Windows\\system32\\cmd.exe\r\n\
                 INCLUDE=C:\\VC\\include;C:\\SDK\\include;C:\\VC\\include\r\n\
                 PATH=C:\\VC\\bin;C:\\bin;C:\\VC\\bin;C:\\tools\r\n\
                 TEMP=C:\\Temp\r\n\
                 VSCMD_VER=17.9.0\r\n\
                 EMPTY=\r\n";
    format!("{}{}{}{}{}", before, FORM_FEED, messages, FORM_FEED, after)
  }

  #[test]
  fn arch_aliases() {
    assert_eq!(normalize_arch("Win64"), "x64");
    assert_eq!(normalize_arch("x86_64"), "x64");
    assert_eq!(normalize_arch("win32"), "x86");
    assert_eq!(normalize_arch("arm64"), "arm64");
  }

  #[test]
  fn years_and_version_numbers() {
    assert_eq!(vs_version_number("2019"), "16.0");
    assert_eq!(vs_version_number("16.0"), "16.0");
    assert_eq!(vs_year("17.0"), "2022");
    assert_eq!(vs_year("2017"), "2017");
  }

  #[test]
  fn vcvars_argument_order() {
    let options = MsvcOptions {
      arch: "win64".to_string(),
      sdk: Some("10.0.22621.0".to_string()),
      toolset: Some("14.29".to_string()),
      uwp: true,
      spectre: true,
      vs_version: None,
    };
    assert_eq!(
      vcvars_arguments(&options),
      vec![
        "x64",
        "uwp",
        "10.0.22621.0",
        "-vcvars_ver=14.29",
        "-vcvars_spectre_libs=spectre"
      ]
    );
    assert_eq!(vcvars_arguments(&MsvcOptions::default()), vec!["x64"]);
  }

  #[test]
  fn vswhere_version_range() {
    assert_eq!(
      vswhere_command(None),
      "vswhere -products * -latest -prerelease -property installationPath"
    );
    assert_eq!(
      vswhere_command(Some("2019")),
      "vswhere -products * -version \"16.0,16.9\" -prerelease -property installationPath"
    );
  }

  #[test]
  fn standard_locations_newest_first() {
    let dirs = vec![PathBuf::from("C:/Program Files (x86)"), PathBuf::from("C:/Program Files")];
    let all = standard_locations(&dirs, None);
    assert_eq!(all.len(), 2 * YEARS.len() * EDITIONS.len());
    assert_eq!(
      all[0],
      Path::new("C:/Program Files (x86)/Microsoft Visual Studio/2022/Enterprise").join(VCVARSALL)
    );

    let pinned = standard_locations(&dirs[1..], Some("16.0"));
    assert_eq!(pinned.len(), EDITIONS.len());
    assert!(pinned.iter().all(|p| p.starts_with("C:/Program Files/Microsoft Visual Studio/2019")));
  }

  #[test]
  fn changed_variables_are_exported() {
    let changed = parse_vcvars_output(&vcvars_output("** Visual Studio 2022 Developer Command Prompt\r\n")).unwrap();
    assert_eq!(
      changed.keys().map(String::as_str).collect::<Vec<_>>(),
      vec!["INCLUDE", "PATH", "VSCMD_VER"]
    );
    assert_eq!(changed["PATH"], "C:\\VC\\bin;C:\\bin;C:\\tools");
    assert_eq!(changed["INCLUDE"], "C:\\VC\\include;C:\\SDK\\include");
    assert_eq!(changed["VSCMD_VER"], "17.9.0");
  }

  #[test]
  fn reported_errors_fail() {
    let output = vcvars_output(
      "[ERROR:vcvarsall.bat] Invalid argument found : amd65\r\n\
       [ERROR:vcvarsall.bat] Error in script usage. The correct usage is:\r\n",
    );
    let err = parse_vcvars_output(&output).unwrap_err();
    assert!(matches!(err, MsvcError::InvalidParameters(ref msg) if msg.contains("amd65") && !msg.contains("usage")));
  }

  #[test]
  fn missing_sections_are_unexpected() {
    let err = parse_vcvars_output("PATH=C:\\bin\r\n").unwrap_err();
    assert!(matches!(err, MsvcError::UnexpectedOutput));
  }

  #[cfg(not(windows))]
  #[tokio::test]
  async fn other_platforms_are_left_alone() {
    let mut executor = Executor::default();
    let platform = BuildPlatform::current().unwrap();
    let count = setup_vc_environment(&mut executor, platform, &MsvcOptions::default())
      .await
      .unwrap();
    assert_eq!(count, 0);
    assert!(executor.overlay().is_empty());
  }
}
