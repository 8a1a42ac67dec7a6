//! Implementation of the `setup-sdl hash` command.
//!
//! Prints the fingerprint `setup` would compute for a project at a given
//! commit, using the current environment. Useful to find out why a cache
//! entry was not reused. Variables exported by earlier projects of a run are
//! not known here; pass their fingerprints with `--dependency`.

use anyhow::{Context, Result, anyhow};
use serde::Serialize;

use setup_sdl_lib::project::Project;
use setup_sdl_lib::setup::RunSettings;
use setup_sdl_lib::state::{EnvSnapshot, cache_key, compute_state_hash, state_entries};
use setup_sdl_lib::util::hash::ContentHash;

use super::HashArgs;
use crate::output::{print_json, print_stat, print_success};

#[derive(Debug, Serialize)]
struct HashReport {
  project: Project,
  state_hash: ContentHash,
  cache_key: String,
  entries: Vec<String>,
}

fn parse_dependency(entry: &str) -> Result<(Project, ContentHash)> {
  let (name, hash) = entry
    .split_once('=')
    .ok_or_else(|| anyhow!("Invalid dependency '{}', expected PROJECT=HASH", entry))?;
  Ok((name.parse::<Project>()?, ContentHash(hash.to_string())))
}

pub fn cmd_hash(args: HashArgs) -> Result<()> {
  let config = args.build.to_config()?;
  let settings = RunSettings::prepare(&config)?;
  let dependencies = args
    .dependencies
    .iter()
    .map(|entry| parse_dependency(entry.as_str()))
    .collect::<Result<_>>()?;
  let inputs = settings.state_inputs(&config, args.git_hash.clone(), dependencies);

  let env = EnvSnapshot::capture();
  let state_hash = compute_state_hash(&inputs, &env).context("Failed to compute fingerprint")?;
  let report = HashReport {
    project: args.project,
    cache_key: cache_key(args.project, &state_hash),
    entries: state_entries(&inputs, &env)?,
    state_hash,
  };

  if args.output.is_json() {
    return print_json(&report);
  }

  print_success(&report.state_hash.to_string());
  print_stat("Cache key", &report.cache_key);
  if args.verbose {
    println!();
    for entry in &report.entries {
      println!("  {}", entry);
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dependency_arguments() {
    let (project, hash) = parse_dependency("SDL_ttf=abc123").unwrap();
    assert_eq!(project, Project::SdlTtf);
    assert_eq!(hash, ContentHash("abc123".to_string()));

    assert!(parse_dependency("SDL_ttf").is_err());
    assert!(parse_dependency("SDL_sound=abc").is_err());
  }
}
