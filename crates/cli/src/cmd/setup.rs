//! Implementation of the `setup-sdl setup` command.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::info;

use setup_sdl_lib::execute::Executor;
use setup_sdl_lib::setup::run_setup;

use super::SetupArgs;
use crate::output::{emit_pairs, print_json, print_stat, print_success, symbols, truncate_hash};

/// Execute the setup command.
///
/// Resolves every requested project, restores or builds it, then writes the
/// step outputs to `GITHUB_OUTPUT` and the exported variables to `GITHUB_ENV`.
pub fn cmd_setup(args: SetupArgs) -> Result<()> {
  let config = args.to_config()?;
  let mut executor = Executor::new(config.shell.clone());

  let started = Instant::now();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = rt
    .block_on(run_setup(&config, &mut executor))
    .context("Setup failed")?;
  let elapsed = Duration::from_secs(started.elapsed().as_secs());
  info!(elapsed = %humantime::format_duration(elapsed), "setup complete");

  emit_pairs("GITHUB_OUTPUT", &result.outputs())?;
  emit_pairs("GITHUB_ENV", &result.exports())?;

  if args.output.is_json() {
    return print_json(&result);
  }

  println!();
  print_success(&format!("Set up {} project(s)", result.projects.len()));
  for outcome in &result.projects {
    let source = if outcome.cache_hit { "cached" } else { "built" };
    println!(
      "  {} {} {} ({} {}, {})",
      symbols::INFO,
      outcome.project,
      outcome.version,
      outcome.git_reference,
      truncate_hash(&outcome.git_hash),
      source
    );
    print_stat(&outcome.cmake_var, &outcome.prefix.display().to_string());
  }

  Ok(())
}
