//! Retrieve a project's release listing with the GitHub CLI.

use tracing::{debug, info};

use super::{GitHubRelease, ReleaseDb, ReleaseError};
use crate::consts::RELEASE_LIST_LIMIT;
use crate::execute::Executor;

/// Build the `gh` command that lists the releases of `owner/repo`.
pub fn release_list_command(owner: &str, repo: &str) -> String {
  format!("gh release list -R {}/{} -L {}", owner, repo, RELEASE_LIST_LIMIT)
}

/// Fetch the raw listing entries of `owner/repo`.
pub async fn fetch_github_releases(
  executor: &Executor,
  owner: &str,
  repo: &str,
) -> Result<Vec<GitHubRelease>, ReleaseError> {
  let cmd = release_list_command(owner, repo);
  info!(repo = %format!("{}/{}", owner, repo), "fetching release listing");

  let text = executor
    .output(&cmd, None)
    .await
    .map_err(|source| ReleaseError::Fetch {
      repo: format!("{}/{}", owner, repo),
      source,
    })?;

  let releases = GitHubRelease::from_gh_output(&text)?;
  debug!(count = releases.len(), "parsed release listing");
  Ok(releases)
}

/// Fetch the listing of `owner/repo` and build its catalog.
pub async fn fetch_release_db(executor: &Executor, owner: &str, repo: &str) -> Result<ReleaseDb, ReleaseError> {
  ReleaseDb::create(&fetch_github_releases(executor, owner, repo).await?)
}
