use anyhow::Result;
use serde::Serialize;

use setup_sdl_lib::execute::command_exists;
use setup_sdl_lib::platform::BuildPlatform;
use setup_sdl_lib::platform::paths::{cache_dir, root_dir};
use setup_sdl_lib::pm::{PackageManagerType, detect_package_manager};

use crate::output::{OutputFormat, print_json, print_stat};

#[derive(Debug, Serialize)]
struct SystemInfo {
  platform: Option<BuildPlatform>,
  arch: &'static str,
  package_manager: Option<PackageManagerType>,
  root: Option<String>,
  cache: String,
}

pub fn cmd_info(output: OutputFormat) -> Result<()> {
  let platform = BuildPlatform::current();
  let msystem = std::env::var("MSYSTEM").ok();
  let info = SystemInfo {
    platform,
    arch: std::env::consts::ARCH,
    package_manager: platform.and_then(|p| detect_package_manager(p, msystem.as_deref(), command_exists)),
    root: platform.map(|p| root_dir(p, None).display().to_string()),
    cache: cache_dir().display().to_string(),
  };

  if output.is_json() {
    return print_json(&info);
  }

  println!("System:");
  match info.platform {
    Some(platform) => print_stat("Platform", &format!("{}-{}", info.arch, platform)),
    None => print_stat("Platform", "unsupported"),
  }
  print_stat(
    "Package manager",
    &info
      .package_manager
      .map(|pm| pm.to_string())
      .unwrap_or_else(|| "none".to_string()),
  );
  if let Some(root) = &info.root {
    print_stat("Root", root);
  }
  print_stat("Cache", &info.cache);
  Ok(())
}
