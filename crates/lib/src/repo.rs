//! Git revisions: reference lookup through the GitHub API and shallow checkouts.

use std::path::Path;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::consts::{APP_NAME, GITHUB_API_URL};
use crate::execute::{ExecuteError, Executor};

#[derive(Debug, Error)]
pub enum RepoError {
  #[error("unable to convert {reference} into a git hash of {owner}/{repo}")]
  UnresolvableReference {
    owner: String,
    repo: String,
    reference: String,
  },

  #[error("GitHub request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error(transparent)]
  Execute(#[from] ExecuteError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

#[derive(Debug, Deserialize)]
struct BranchResponse {
  commit: CommitResponse,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
  sha: String,
}

/// Minimal GitHub REST client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
  http: reqwest::Client,
  api_url: String,
  token: Option<String>,
}

impl GitHubClient {
  /// Create a client. A token raises the API rate limit.
  pub fn new(token: Option<String>) -> Result<Self, RepoError> {
    let http = reqwest::Client::builder()
      .user_agent(format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self {
      http,
      api_url: GITHUB_API_URL.to_string(),
      token: token.filter(|t| !t.is_empty()),
    })
  }

  /// Use a different API endpoint (GitHub Enterprise, tests).
  pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
    self.api_url = api_url.into().trim_end_matches('/').to_string();
    self
  }

  /// GET a JSON document. `None` when GitHub answers with an error status.
  async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<Option<T>, RepoError> {
    let url = format!("{}{}", self.api_url, path);
    let mut request = self
      .http
      .get(&url)
      .header(reqwest::header::ACCEPT, "application/vnd.github+json");
    if let Some(token) = &self.token {
      request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
      debug!(url = %url, status = %status, "GitHub lookup failed");
      if status == StatusCode::UNAUTHORIZED {
        info!("GitHub rejected the token");
      }
      return Ok(None);
    }
    Ok(Some(response.json().await?))
  }

  /// Commit hash at the tip of a branch.
  pub async fn branch_commit(&self, owner: &str, repo: &str, branch: &str) -> Result<Option<String>, RepoError> {
    let branch: Option<BranchResponse> = self.get(&format!("/repos/{}/{}/branches/{}", owner, repo, branch)).await?;
    Ok(branch.map(|b| b.commit.sha))
  }

  /// Full hash of the commit a reference (tag, short or full hash) points at.
  pub async fn commit_sha(&self, owner: &str, repo: &str, reference: &str) -> Result<Option<String>, RepoError> {
    let commit: Option<CommitResponse> = self.get(&format!("/repos/{}/{}/commits/{}", owner, repo, reference)).await?;
    Ok(commit.map(|c| c.sha))
  }

  /// Resolve a branch, tag or commit to a commit hash. Branches are tried first.
  pub async fn resolve_reference(&self, owner: &str, repo: &str, reference: &str) -> Result<String, RepoError> {
    info!(repo = %format!("{}/{}", owner, repo), reference, "calculating git hash");

    if let Some(sha) = self.branch_commit(owner, repo, reference).await? {
      debug!(reference, "reference is a branch");
      info!(git_hash = %sha, "resolved");
      return Ok(sha);
    }
    if let Some(sha) = self.commit_sha(owner, repo, reference).await? {
      debug!(reference, "reference is a commit");
      info!(git_hash = %sha, "resolved");
      return Ok(sha);
    }

    Err(RepoError::UnresolvableReference {
      owner: owner.to_string(),
      repo: repo.to_string(),
      reference: reference.to_string(),
    })
  }
}

/// Commands fetching exactly one revision into an empty directory.
pub fn checkout_commands(remote: &str, git_url: &str, git_hash: &str) -> Vec<String> {
  vec![
    "git init".to_string(),
    format!("git remote add {} {}", remote, git_url),
    format!("git fetch --depth 1 {} {}", remote, git_hash),
    "git checkout FETCH_HEAD".to_string(),
  ]
}

/// Shallow-checkout `git_hash` of `git_url` into `directory`.
pub async fn checkout_git_hash(
  executor: &Executor,
  remote: &str,
  git_url: &str,
  git_hash: &str,
  directory: &Path,
) -> Result<(), RepoError> {
  info!(git_hash, directory = %directory.display(), "checking out");
  tokio::fs::create_dir_all(directory).await?;
  for cmd in checkout_commands(remote, git_url, git_hash) {
    executor.run(&cmd, Some(directory)).await?;
  }
  Ok(())
}
