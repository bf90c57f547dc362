//! Build identifiers and build families.

use serde::Serialize;

/// Base branch of repos whose history is compared against a fixed branch.
const BASE_REPO_BRANCHES: &[(&str, &str)] = &[("mattermost-server", "master")];

/// Branch used when a repo has no configured base branch.
pub const DEFAULT_BASE_BRANCH: &str = "master";

/// Parts of a build string of the form `pipelineID-imageTag-buildSuffix`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub pipeline_id: String,
    pub image_tag: String,
    /// Everything after the second hyphen; may itself contain hyphens.
    pub build_suffix: String,
}

impl BuildInfo {
    /// Decompose a build string. Returns `None` when fewer than three parts are present.
    pub fn parse(build: &str) -> Option<Self> {
        let mut parts = build.splitn(3, '-');
        let pipeline_id = parts.next()?;
        let image_tag = parts.next()?;
        let build_suffix = parts.next()?;

        Some(BuildInfo {
            pipeline_id: pipeline_id.to_string(),
            image_tag: image_tag.to_string(),
            build_suffix: build_suffix.to_string(),
        })
    }

    /// Build suffix of `build`, or `fallback` when the build cannot be decomposed.
    pub fn suffix_or(build: &str, fallback: &str) -> String {
        Self::parse(build)
            .map(|info| info.build_suffix)
            .filter(|suffix| !suffix.is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Base branch whose history a repo's cycles are compared against.
pub fn base_branch(repo: &str) -> &'static str {
    BASE_REPO_BRANCHES
        .iter()
        .find(|(name, _)| *name == repo)
        .map(|(_, branch)| *branch)
        .unwrap_or(DEFAULT_BASE_BRANCH)
}

/// Builds sharing a repo, a branch and a build suffix; history is only compared within one family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildFamily {
    pub repo: String,
    pub branch: String,
    pub build_suffix: String,
}

impl BuildFamily {
    pub fn new(
        repo: impl Into<String>,
        branch: impl Into<String>,
        build_suffix: impl Into<String>,
    ) -> Self {
        Self {
            repo: repo.into(),
            branch: branch.into(),
            build_suffix: build_suffix.into(),
        }
    }

    /// Family of a cycle identified by its repo, branch and build string.
    pub fn of_build(repo: &str, branch: &str, build: &str, fallback_suffix: &str) -> Self {
        Self::new(repo, branch, BuildInfo::suffix_or(build, fallback_suffix))
    }
}
