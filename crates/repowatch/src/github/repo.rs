//! Repository-scoped endpoints.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

use super::client::GitHubClient;
use super::error::{FetchError, Result};
use super::pagination::{Paginated, fetch_all};
use super::types::{Branch, CommitItem, IssueItem, PullItem, ReviewItem};
use crate::entity::pull_request_state::PullRequestState;

/// A validated `owner/repo` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoName {
    owner: String,
    name: String,
}

impl RepoName {
    /// Parse `owner/repo`. Both halves must be non-empty and free of
    /// whitespace and further slashes.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let invalid = || FetchError::InvalidRequest(format!("expected owner/repo, got {raw:?}"));

        let (owner, name) = raw.split_once('/').ok_or_else(invalid)?;
        let valid_part = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        if !valid_part(owner) || !valid_part(name) {
            return Err(invalid());
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// `/repos/{owner}/{repo}{suffix}`.
    pub fn path(&self, suffix: &str) -> String {
        format!("/repos/{}/{}{}", self.owner, self.name, suffix)
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

fn since_param(since: DateTime<Utc>) -> String {
    since.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Query parameters for a branch's commits since `since`.
pub fn commit_params(branch: &str, since: DateTime<Utc>) -> Vec<(&'static str, String)> {
    vec![("sha", branch.to_string()), ("since", since_param(since))]
}

/// Query parameters for pull requests in `state`, most recently updated first.
pub fn pull_params(state: PullRequestState) -> Vec<(&'static str, String)> {
    vec![
        ("state", state.as_query().to_string()),
        ("sort", "updated".to_string()),
        ("direction", "desc".to_string()),
    ]
}

/// Query parameters for issues updated since `since`.
pub fn issue_params(since: DateTime<Utc>) -> Vec<(&'static str, String)> {
    vec![
        ("sort", "updated".to_string()),
        ("direction", "desc".to_string()),
        ("since", since_param(since)),
    ]
}

pub async fn list_branches(client: &GitHubClient, repo: &RepoName) -> Paginated<Branch> {
    fetch_all(client, &repo.path("/branches"), &[]).await
}

pub async fn list_commits(
    client: &GitHubClient,
    repo: &RepoName,
    branch: &str,
    since: DateTime<Utc>,
) -> Paginated<CommitItem> {
    fetch_all(client, &repo.path("/commits"), &commit_params(branch, since)).await
}

pub async fn list_pulls(
    client: &GitHubClient,
    repo: &RepoName,
    state: PullRequestState,
) -> Paginated<PullItem> {
    fetch_all(client, &repo.path("/pulls"), &pull_params(state)).await
}

pub async fn list_issues(
    client: &GitHubClient,
    repo: &RepoName,
    since: DateTime<Utc>,
) -> Paginated<IssueItem> {
    fetch_all(client, &repo.path("/issues"), &issue_params(since)).await
}

pub async fn list_reviews(
    client: &GitHubClient,
    repo: &RepoName,
    number: i64,
) -> Paginated<ReviewItem> {
    fetch_all(client, &repo.path(&format!("/pulls/{number}/reviews")), &[]).await
}
