//! Release catalog and release matching.
//!
//! The catalog is built from the tab-separated listing printed by
//! `gh release list`:
//!
//! ```text
//! 2.28.0\tLatest\trelease-2.28.0\t2023-06-20T18:45:17Z
//! 2.28.0 RC1\tPre-release\tprerelease-2.27.1\t2023-06-14T03:59:14Z
//! ```
//!
//! Releases are sorted once, best first, and [`ReleaseDb::find`] returns the
//! first release that satisfies a request.

pub mod fetch;

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;
use std::time::SystemTime;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::execute::ExecuteError;
use crate::version::{ReleaseType, Version, parse_number};

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^(release-|prerelease-)?([0-9]+(?:\.[0-9]+){0,2})(?:-RC([0-9]+))?$").expect("valid tag pattern")
});

/// Errors that can occur while building the release catalog.
#[derive(Debug, Error)]
pub enum ReleaseError {
  /// A listing line does not have four tab-separated fields.
  #[error("malformed release listing line (expected 4 tab-separated fields): {0:?}")]
  MalformedLine(String),

  /// A release tag does not follow the release naming scheme.
  #[error("invalid tag: {0}")]
  MalformedTag(String),

  /// Retrieving the release listing failed.
  #[error("failed to list releases of {repo}: {source}")]
  Fetch {
    repo: String,
    #[source]
    source: ExecuteError,
  },
}

/// One line of a GitHub release listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubRelease {
  pub name: String,
  /// Whether GitHub classifies the release as a pre-release.
  pub prerelease: bool,
  pub tag: String,
  /// Publication time, `None` when the timestamp could not be parsed.
  pub time: Option<SystemTime>,
}

impl GitHubRelease {
  pub fn new(name: impl Into<String>, prerelease: bool, tag: impl Into<String>, time: Option<SystemTime>) -> Self {
    Self {
      name: name.into(),
      prerelease,
      tag: tag.into(),
      time,
    }
  }

  /// Parse the output of `gh release list`. Blank lines are skipped.
  pub fn from_gh_output(text: &str) -> Result<Vec<Self>, ReleaseError> {
    text
      .lines()
      .map(|line| line.trim_end_matches('\r'))
      .filter(|line| !line.trim().is_empty())
      .map(Self::from_line)
      .collect()
  }

  fn from_line(line: &str) -> Result<Self, ReleaseError> {
    let fields: Vec<&str> = line.split('\t').collect();
    let [name, classification, tag, timestamp] = fields.as_slice() else {
      return Err(ReleaseError::MalformedLine(line.to_string()));
    };

    let time = humantime::parse_rfc3339_weak(timestamp.trim()).ok();
    if time.is_none() {
      debug!(tag, timestamp, "unparseable release timestamp");
    }

    Ok(Self::new(
      *name,
      classification.trim().eq_ignore_ascii_case("pre-release"),
      *tag,
      time,
    ))
  }
}

/// A release of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Release {
  pub version: Version,
  /// `None` for a final release. Otherwise 1 for a `prerelease-` tag and
  /// `n + 1` for a `-RCn` tag.
  pub prerelease: Option<u32>,
  pub tag: String,
}

impl Release {
  pub fn new(version: Version, prerelease: Option<u32>, tag: impl Into<String>) -> Self {
    Self {
      version,
      prerelease,
      tag: tag.into(),
    }
  }

  /// Build a release from a listing entry.
  pub fn from_github_release(gh_release: &GitHubRelease) -> Result<Self, ReleaseError> {
    let malformed = || ReleaseError::MalformedTag(gh_release.tag.clone());

    let captures = TAG_PATTERN.captures(&gh_release.tag).ok_or_else(malformed)?;

    let mut numbers = [0u32; 3];
    for (slot, part) in numbers.iter_mut().zip(captures[2].split('.')) {
      *slot = parse_number(part).ok_or_else(malformed)?;
    }
    let version = Version::new(numbers[0], numbers[1], numbers[2]);

    let is_prerelease_tag = captures.get(1).is_some_and(|m| m.as_str() == "prerelease-");
    let rc = captures.get(3).map(|m| parse_number(m.as_str()).ok_or_else(malformed)).transpose()?;

    let prerelease = if is_prerelease_tag {
      Some(1)
    } else if let Some(rc) = rc {
      Some(rc.saturating_add(1))
    } else if gh_release.prerelease {
      // Classified as pre-release on GitHub although the tag looks final.
      Some(1)
    } else {
      None
    };

    Ok(Self::new(version, prerelease, gh_release.tag.clone()))
  }

  pub fn is_prerelease(&self) -> bool {
    self.prerelease.is_some()
  }

  /// Catalog order: `Less` means `self` is listed before `other`.
  ///
  /// Higher versions come first. For equal versions a final release comes
  /// before any pre-release, and among pre-releases the higher rank (the later
  /// release candidate) comes first.
  pub fn catalog_cmp(&self, other: &Self) -> Ordering {
    other
      .version
      .cmp(&self.version)
      .then_with(|| match (self.prerelease, other.prerelease) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => b.cmp(&a),
      })
  }
}

impl fmt::Display for Release {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.prerelease {
      Some(rank) => write!(f, "{} (tag {}, pre-release {})", self.version, self.tag, rank),
      None => write!(f, "{} (tag {})", self.version, self.tag),
    }
  }
}

/// The sorted release catalog of one project.
#[derive(Debug, Clone, Default)]
pub struct ReleaseDb {
  releases: Vec<Release>,
}

impl ReleaseDb {
  /// Build the catalog from listing entries. Fails on the first malformed tag.
  pub fn create(github_releases: &[GitHubRelease]) -> Result<Self, ReleaseError> {
    let mut releases = github_releases
      .iter()
      .map(Release::from_github_release)
      .collect::<Result<Vec<_>, _>>()?;
    releases.sort_by(Release::catalog_cmp);
    Ok(Self { releases })
  }

  /// Parse `gh release list` output and build the catalog.
  pub fn from_gh_output(text: &str) -> Result<Self, ReleaseError> {
    Self::create(&GitHubRelease::from_gh_output(text)?)
  }

  /// Releases, best first.
  pub fn releases(&self) -> &[Release] {
    &self.releases
  }

  pub fn is_empty(&self) -> bool {
    self.releases.is_empty()
  }

  /// Find the best release for a request.
  ///
  /// - `Exact`: the first release whose version equals `version`
  /// - `Latest` / `Any`: the first release in the major line of `version`
  /// - `Head` / `Commit`: never matched here, they name branches or refs
  ///
  /// Pre-releases are skipped unless `prerelease` is set.
  pub fn find(&self, version: Version, prerelease: bool, release_type: ReleaseType) -> Option<&Release> {
    self
      .releases
      .iter()
      .filter(|release| prerelease || !release.is_prerelease())
      .find(|release| match release_type {
        ReleaseType::Exact => release.version == version,
        ReleaseType::Latest | ReleaseType::Any => release.version.major == version.major,
        ReleaseType::Head | ReleaseType::Commit => false,
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const GH_RELEASE_OUTPUT: &str = "\
3.1.1\tLatest\tprerelease-3.1.1\t2023-12-25T18:45:17Z
2.28.0\tLatest\trelease-2.28.0\t2023-06-20T18:45:17Z
2.28.0 RC1\tPre-release\tprerelease-2.27.1\t2023-06-14T03:59:14Z
2.26.5\t\trelease-2.26.5\t2023-04-05T19:35:40Z
2.26.4\t\trelease-2.26.4\t2023-03-07T00:17:02Z
2.26.3\t\trelease-2.26.3\t2023-02-06T23:31:56Z
2.26.2\t\trelease-2.26.2\t2023-01-03T15:08:11Z
2.26.1\t\trelease-2.26.1\t2022-12-01T20:33:11Z
2.26.0\t\trelease-2.26.0\t2022-11-22T00:28:26Z
2.26.0 RC1\tPre-release\tprerelease-2.25.1\t2022-11-17T17:49:02Z
2.24.2\t\trelease-2.24.2\t2022-11-01T13:39:15Z
2.24.1\t\trelease-2.24.1\t2022-10-05T00:16:33Z
2.24.0\t\trelease-2.24.0\t2022-08-19T16:04:03Z
2.0.22\t\trelease-2.0.22\t2022-04-25T19:20:25Z
2.0.20\t\trelease-2.0.20\t2022-01-11T01:03:58Z
2.0.18\t\trelease-2.0.18\t2021-11-30T17:15:42Z
2.0.16\t\trelease-2.0.16\t2021-08-10T16:03:15Z
2.0.14\t\trelease-2.0.14\t2021-07-08T17:14:16Z
2.0.12\t\trelease-2.0.12\t2022-05-24T22:37:24Z
2.0.10\t\trelease-2.0.10\t2022-05-24T22:35:08Z
2.0.9\t\trelease-2.0.9\t2022-05-24T22:33:03Z
2.0.8\t\trelease-2.0.8\t2022-05-23T22:20:21Z
";

  fn release_db() -> ReleaseDb {
    ReleaseDb::from_gh_output(GH_RELEASE_OUTPUT).unwrap()
  }

  fn gh(tag: &str) -> GitHubRelease {
    GitHubRelease::new(tag, false, tag, None)
  }

  mod listing {
    use super::*;

    #[test]
    fn parses_all_fields() {
      let releases = GitHubRelease::from_gh_output(GH_RELEASE_OUTPUT).unwrap();
      assert_eq!(releases.len(), 22);

      let rc = &releases[2];
      assert_eq!(rc.name, "2.28.0 RC1");
      assert!(rc.prerelease);
      assert_eq!(rc.tag, "prerelease-2.27.1");
      assert!(rc.time.is_some());

      assert!(!releases[3].prerelease);
    }

    #[test]
    fn classification_is_case_insensitive() {
      let releases = GitHubRelease::from_gh_output("x\tPRE-RELEASE\trelease-1.0.0\t2020-01-01T00:00:00Z").unwrap();
      assert!(releases[0].prerelease);
    }

    #[test]
    fn skips_blank_lines_and_crlf() {
      let text = "\n2.26.5\t\trelease-2.26.5\t2023-04-05T19:35:40Z\r\n\n";
      let releases = GitHubRelease::from_gh_output(text).unwrap();
      assert_eq!(releases.len(), 1);
      assert!(releases[0].time.is_some());
    }

    #[test]
    fn rejects_short_lines() {
      let err = GitHubRelease::from_gh_output("2.26.5\trelease-2.26.5").unwrap_err();
      assert!(matches!(err, ReleaseError::MalformedLine(_)));
    }

    #[test]
    fn bad_timestamp_is_tolerated() {
      let releases = GitHubRelease::from_gh_output("a\t\trelease-1.2.3\tyesterday").unwrap();
      assert_eq!(releases[0].time, None);
    }
  }

  mod tags {
    use super::*;

    #[test]
    fn final_release_tag() {
      let release = Release::from_github_release(&gh("release-2.26.5")).unwrap();
      assert_eq!(release.version, Version::new(2, 26, 5));
      assert_eq!(release.prerelease, None);
    }

    #[test]
    fn prerelease_tag_has_rank_one() {
      let release = Release::from_github_release(&gh("prerelease-3.1.1")).unwrap();
      assert_eq!(release.version, Version::new(3, 1, 1));
      assert_eq!(release.prerelease, Some(1));
    }

    #[test]
    fn release_candidate_rank_is_ordinal_plus_one() {
      let release = Release::from_github_release(&gh("release-2.26.0-RC1")).unwrap();
      assert_eq!(release.version, Version::new(2, 26, 0));
      assert_eq!(release.prerelease, Some(2));

      let release = Release::from_github_release(&gh("release-2.26.0-RC0")).unwrap();
      assert_eq!(release.prerelease, Some(1));
    }

    #[test]
    fn bare_and_short_versions() {
      let release = Release::from_github_release(&gh("2.30")).unwrap();
      assert_eq!(release.version, Version::new(2, 30, 0));
      assert_eq!(release.prerelease, None);
    }

    #[test]
    fn classification_marks_untagged_prerelease() {
      let release = Release::from_github_release(&GitHubRelease::new("x", true, "release-3.0.0", None)).unwrap();
      assert_eq!(release.prerelease, Some(1));
    }

    #[test]
    fn malformed_tags_are_rejected() {
      for tag in ["preview-3.0.0", "v2.26.5", "release-2.26.5-beta", "release-", "2.26.5.1", "release-2.x.0"] {
        let err = Release::from_github_release(&gh(tag)).unwrap_err();
        assert!(matches!(err, ReleaseError::MalformedTag(ref t) if t == tag), "{}", tag);
      }
    }

    #[test]
    fn one_malformed_tag_fails_the_catalog() {
      let err = ReleaseDb::create(&[gh("release-2.26.5"), gh("nightly")]).unwrap_err();
      assert!(matches!(err, ReleaseError::MalformedTag(_)));
    }
  }

  mod ordering {
    use super::*;

    #[test]
    fn catalog_is_sorted_best_first() {
      let db = release_db();
      let versions: Vec<Version> = db.releases().iter().map(|r| r.version).collect();
      assert!(versions.windows(2).all(|w| w[0] >= w[1]));
      assert_eq!(db.releases()[0].tag, "prerelease-3.1.1");
    }

    #[test]
    fn final_release_precedes_prereleases_of_same_version() {
      let mut releases = vec![
        Release::new(Version::new(2, 26, 0), Some(2), "release-2.26.0-RC1"),
        Release::new(Version::new(2, 26, 0), None, "release-2.26.0"),
      ];
      releases.sort_by(Release::catalog_cmp);
      assert_eq!(releases[0].tag, "release-2.26.0");
    }

    #[test]
    fn later_release_candidate_precedes_earlier_one() {
      let rc1 = Release::new(Version::new(2, 26, 0), Some(2), "release-2.26.0-RC1");
      let rc2 = Release::new(Version::new(2, 26, 0), Some(3), "release-2.26.0-RC2");
      let pre = Release::new(Version::new(2, 26, 0), Some(1), "prerelease-2.26.0");

      assert_eq!(rc2.catalog_cmp(&rc1), Ordering::Less);
      assert_eq!(rc1.catalog_cmp(&rc2), Ordering::Greater);
      assert_eq!(rc1.catalog_cmp(&pre), Ordering::Less);
      assert_eq!(rc1.catalog_cmp(&rc1), Ordering::Equal);

      let db = ReleaseDb::create(&[
        gh("release-2.26.0-RC1"),
        gh("prerelease-2.26.0"),
        gh("release-2.26.0-RC2"),
      ])
      .unwrap();
      let tags: Vec<&str> = db.releases().iter().map(|r| r.tag.as_str()).collect();
      assert_eq!(tags, vec!["release-2.26.0-RC2", "release-2.26.0-RC1", "prerelease-2.26.0"]);

      let found = db.find(Version::new(2, 0, 0), true, ReleaseType::Latest).unwrap();
      assert_eq!(found.tag, "release-2.26.0-RC2");
    }

    #[test]
    fn higher_version_beats_final_status() {
      let pre = Release::new(Version::new(2, 27, 1), Some(1), "prerelease-2.27.1");
      let fin = Release::new(Version::new(2, 26, 5), None, "release-2.26.5");
      assert_eq!(pre.catalog_cmp(&fin), Ordering::Less);
    }
  }

  mod find {
    use super::*;

    #[test]
    fn exact_2_0_22() {
      let db = release_db();
      let v = Version::new(2, 0, 22);
      let rel = db.find(v, true, ReleaseType::Exact).unwrap();
      assert_eq!(rel.version, v);
      assert!(!rel.is_prerelease());
    }

    #[test]
    fn exact_2_26_1() {
      let db = release_db();
      let v = Version::new(2, 26, 1);
      let rel = db.find(v, true, ReleaseType::Exact).unwrap();
      assert_eq!(rel.version, v);
      assert!(!rel.is_prerelease());
    }

    #[test]
    fn latest_2_with_prereleases() {
      let db = release_db();
      let rel = db.find(Version::new(2, 0, 0), true, ReleaseType::Latest).unwrap();
      assert!(rel.version > Version::new(2, 26, 4));
      assert_eq!(rel.version.major, 2);
    }

    #[test]
    fn latest_2_without_prereleases() {
      let db = release_db();
      let rel = db.find(Version::new(2, 0, 0), false, ReleaseType::Latest).unwrap();
      assert!(rel.version > Version::new(2, 26, 4));
      assert_eq!(rel.version.major, 2);
      assert!(!rel.is_prerelease());
      assert_eq!(rel.tag, "release-2.28.0");
    }

    #[test]
    fn prereleases_are_never_returned_when_disallowed() {
      let db = release_db();
      for major in [2, 3] {
        for release_type in [ReleaseType::Latest, ReleaseType::Any] {
          if let Some(rel) = db.find(Version::new(major, 0, 0), false, release_type) {
            assert!(!rel.is_prerelease());
          }
        }
      }
      assert!(db.find(Version::new(2, 27, 1), false, ReleaseType::Exact).is_none());
      assert!(db.find(Version::new(2, 27, 1), true, ReleaseType::Exact).is_some());
    }

    #[test]
    fn any_2() {
      let db = release_db();
      let rel = db.find(Version::new(2, 0, 0), true, ReleaseType::Any).unwrap();
      assert_eq!(rel.version.major, 2);
    }

    #[test]
    fn any_3_only_has_a_prerelease() {
      let db = release_db();
      let rel = db.find(Version::new(3, 0, 0), true, ReleaseType::Any).unwrap();
      assert_eq!(rel.version.major, 3);
      assert!(rel.version >= Version::new(3, 0, 0));

      assert!(db.find(Version::new(3, 0, 0), false, ReleaseType::Any).is_none());
    }

    #[test]
    fn no_match_returns_none() {
      let db = release_db();
      assert!(db.find(Version::new(4, 0, 0), true, ReleaseType::Latest).is_none());
      assert!(db.find(Version::new(2, 26, 99), true, ReleaseType::Exact).is_none());
    }

    #[test]
    fn head_and_commit_are_not_catalog_lookups() {
      let db = release_db();
      assert!(db.find(Version::new(2, 0, 0), true, ReleaseType::Head).is_none());
      assert!(db.find(Version::new(2, 0, 0), true, ReleaseType::Commit).is_none());
    }
  }
}
