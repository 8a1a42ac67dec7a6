//! Implementation of the `setup-sdl resolve` command.

use anyhow::{Context, Result};
use serde::Serialize;

use setup_sdl_lib::execute::Executor;
use setup_sdl_lib::project::Project;
use setup_sdl_lib::release::fetch::fetch_release_db;
use setup_sdl_lib::repo::GitHubClient;
use setup_sdl_lib::setup::{needs_release_db, select_git_reference};
use setup_sdl_lib::version::{VersionRequest, parse_version_request};

use super::ResolveArgs;
use crate::output::{print_json, print_stat, print_success};

#[derive(Debug, Serialize)]
struct Resolution {
  project: Project,
  request: VersionRequest,
  git_reference: String,
  git_hash: Option<String>,
}

pub fn cmd_resolve(args: ResolveArgs) -> Result<()> {
  let desc = args.project.description();
  let request = parse_version_request(&args.request, desc.discarded_prefix);

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let resolution = rt.block_on(async {
    let releases = if needs_release_db(&request) {
      let executor = Executor::default();
      Some(fetch_release_db(&executor, desc.repo_owner, desc.repo_name).await?)
    } else {
      None
    };
    let git_reference = select_git_reference(args.project, &request, releases.as_ref(), args.pre_release)?;

    let git_hash = if args.commit {
      let mut github = GitHubClient::new(args.token.clone().filter(|t| !t.is_empty()))?;
      if let Some(url) = args.github_api_url.clone().filter(|u| !u.is_empty()) {
        github = github.with_api_url(url);
      }
      Some(
        github
          .resolve_reference(desc.repo_owner, desc.repo_name, &git_reference)
          .await?,
      )
    } else {
      None
    };

    anyhow::Ok(Resolution {
      project: args.project,
      request: request.clone(),
      git_reference,
      git_hash,
    })
  })?;

  if args.output.is_json() {
    return print_json(&resolution);
  }

  print_success(&format!(
    "{} {} {}",
    resolution.project,
    resolution.request.release_type(),
    resolution.git_reference
  ));
  if let Some(hash) = &resolution.git_hash {
    print_stat("Commit", hash);
  }
  Ok(())
}
