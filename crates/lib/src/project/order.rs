//! Build-order resolution.
//!
//! Projects are ordered in layers: every pass moves all projects whose
//! dependencies were ordered before the pass started. A dependency is an
//! OR-group and is met when any member of the group is ordered.

use std::fmt::Display;

use thiserror::Error;
use tracing::debug;

use super::Project;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
  /// A full pass made no progress: a dependency is missing or cyclic.
  #[error("unable to order projects, unresolved: {}", .remaining.join(", "))]
  Unresolvable { remaining: Vec<String> },
}

/// Order `requested` so that every project comes after its dependencies.
///
/// `deps` returns the dependency OR-groups of a project. Only requested
/// projects take part: a dependency that is not requested is never met.
/// Duplicates in `requested` are ignored.
pub fn resolve_build_order<'a, P, F>(requested: &[P], deps: F) -> Result<Vec<P>, OrderError>
where
  P: Copy + Eq + Display + 'a,
  F: Fn(P) -> &'a [&'a [P]],
{
  let mut remaining: Vec<P> = Vec::with_capacity(requested.len());
  for project in requested {
    if !remaining.contains(project) {
      remaining.push(*project);
    }
  }

  let mut ordered: Vec<P> = Vec::with_capacity(remaining.len());
  let mut pass = 0usize;

  while !remaining.is_empty() {
    pass += 1;
    let (ready, blocked): (Vec<P>, Vec<P>) = remaining.iter().partition(|project| {
      deps(**project)
        .iter()
        .all(|group| group.iter().any(|dep| ordered.contains(dep)))
    });

    if ready.is_empty() {
      return Err(OrderError::Unresolvable {
        remaining: blocked.iter().map(ToString::to_string).collect(),
      });
    }

    debug!(pass, ready = %join(&ready), "ordered build layer");
    ordered.extend(ready);
    remaining = blocked;
  }

  Ok(ordered)
}

/// Build order of the given projects.
pub fn build_order(requested: &[Project]) -> Result<Vec<Project>, OrderError> {
  resolve_build_order(requested, |project| project.deps())
}

fn join<P: Display>(items: &[P]) -> String {
  items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
