//! Activity records as they flow from the upstream API into the store.
//!
//! Each record kind has a natural key: the fields that identify the same
//! real-world event across repeated fetches. Dedup, collapse and idempotent
//! re-sync all compare natural keys, never internal row ids.

use std::fmt::Debug;
use std::hash::Hash;

use chrono::{DateTime, SubsecRound, Utc};
use sea_orm::Set;
use serde::Serialize;

use crate::entity::prelude::*;

/// Retention horizon and default watermark window, in days.
pub const RETENTION_DAYS: i64 = 30;

/// The four kinds of activity the pipeline ingests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Commit,
    PullRequest,
    Issue,
    Review,
}

impl RecordKind {
    pub const ALL: [RecordKind; 4] = [
        RecordKind::Commit,
        RecordKind::PullRequest,
        RecordKind::Issue,
        RecordKind::Review,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Commit => "commit",
            RecordKind::PullRequest => "pull_request",
            RecordKind::Issue => "issue",
            RecordKind::Review => "review",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Timestamps ──────────────────────────────────────────────────────────────

/// Current time truncated to whole seconds.
///
/// Every timestamp written or compared by the pipeline goes through this (or
/// [`normalize_timestamp`]) so stored values and cutoffs share one precision.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Normalize an upstream ISO-8601 timestamp to UTC with second precision.
///
/// Missing or unparseable values become [`now`].
pub fn normalize_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc).trunc_subsecs(0))
        .unwrap_or_else(now)
}

// ─── Natural keys ────────────────────────────────────────────────────────────

/// Something that can be deduplicated by natural key.
pub trait NaturalKey {
    type Key: Eq + Hash + Clone + Debug + Send + Sync + 'static;

    fn natural_key(&self) -> Self::Key;

    /// A second identity that matches stored rows which predate the primary
    /// key (commits stored without a SHA).
    fn fallback_key(&self) -> Option<Self::Key> {
        None
    }
}

/// Identity of a commit on a branch.
///
/// Rows carrying the upstream SHA are keyed by it. Rows without one fall back
/// to the composite (message, author, time) identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommitKey {
    Sha {
        repository_id: i32,
        sha: String,
        branch: String,
    },
    Content {
        repository_id: i32,
        message: String,
        author: String,
        committed_at: DateTime<Utc>,
        branch: String,
    },
}

impl CommitKey {
    fn new(
        repository_id: i32,
        sha: Option<&str>,
        message: &str,
        author: &str,
        committed_at: DateTime<Utc>,
        branch: &str,
    ) -> Self {
        match sha.filter(|s| !s.is_empty()) {
            Some(sha) => CommitKey::Sha {
                repository_id,
                sha: sha.to_string(),
                branch: branch.to_string(),
            },
            None => CommitKey::Content {
                repository_id,
                message: message.to_string(),
                author: author.to_string(),
                committed_at,
                branch: branch.to_string(),
            },
        }
    }
}

/// (repository, number) identity shared by pull requests and issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NumberKey {
    pub repository_id: i32,
    pub number: i64,
}

/// (repository, upstream review id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReviewKey {
    pub repository_id: i32,
    pub review_id: i64,
}

// ─── Fetched records ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommit {
    pub repository_id: i32,
    pub sha: Option<String>,
    pub message: String,
    pub author: String,
    pub committed_at: DateTime<Utc>,
    pub branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    pub repository_id: i32,
    pub number: i64,
    pub title: String,
    pub author: String,
    pub state: PullRequestState,
    pub created_at: DateTime<Utc>,
    /// Upstream last-update time. Not stored; selects review candidates.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub repository_id: i32,
    pub number: i64,
    pub title: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub repository_id: i32,
    pub review_id: i64,
    pub pr_number: i64,
    pub author: String,
    pub comment: String,
    pub submitted_at: DateTime<Utc>,
}

impl NaturalKey for NewCommit {
    type Key = CommitKey;

    fn natural_key(&self) -> CommitKey {
        CommitKey::new(
            self.repository_id,
            self.sha.as_deref(),
            &self.message,
            &self.author,
            self.committed_at,
            &self.branch,
        )
    }

    fn fallback_key(&self) -> Option<CommitKey> {
        self.sha.as_ref().filter(|s| !s.is_empty())?;
        Some(CommitKey::new(
            self.repository_id,
            None,
            &self.message,
            &self.author,
            self.committed_at,
            &self.branch,
        ))
    }
}

impl NaturalKey for CommitModel {
    type Key = CommitKey;

    fn natural_key(&self) -> CommitKey {
        CommitKey::new(
            self.repository_id,
            self.sha.as_deref(),
            &self.message,
            &self.author,
            self.committed_at,
            &self.branch,
        )
    }
}

impl NaturalKey for NewPullRequest {
    type Key = NumberKey;

    fn natural_key(&self) -> NumberKey {
        NumberKey {
            repository_id: self.repository_id,
            number: self.number,
        }
    }
}

impl NaturalKey for PullRequestModel {
    type Key = NumberKey;

    fn natural_key(&self) -> NumberKey {
        NumberKey {
            repository_id: self.repository_id,
            number: self.number,
        }
    }
}

impl NaturalKey for NewIssue {
    type Key = NumberKey;

    fn natural_key(&self) -> NumberKey {
        NumberKey {
            repository_id: self.repository_id,
            number: self.number,
        }
    }
}

impl NaturalKey for IssueModel {
    type Key = NumberKey;

    fn natural_key(&self) -> NumberKey {
        NumberKey {
            repository_id: self.repository_id,
            number: self.number,
        }
    }
}

impl NaturalKey for NewReview {
    type Key = ReviewKey;

    fn natural_key(&self) -> ReviewKey {
        ReviewKey {
            repository_id: self.repository_id,
            review_id: self.review_id,
        }
    }
}

impl NaturalKey for ReviewModel {
    type Key = ReviewKey;

    fn natural_key(&self) -> ReviewKey {
        ReviewKey {
            repository_id: self.repository_id,
            review_id: self.review_id,
        }
    }
}

// ─── Active model conversion ─────────────────────────────────────────────────

impl NewCommit {
    pub fn into_active_model(self, ingested_at: DateTime<Utc>) -> CommitActiveModel {
        CommitActiveModel {
            repository_id: Set(self.repository_id),
            sha: Set(self.sha),
            message: Set(self.message),
            author: Set(self.author),
            committed_at: Set(self.committed_at),
            branch: Set(self.branch),
            ingested_at: Set(ingested_at),
            ..Default::default()
        }
    }
}

impl NewPullRequest {
    pub fn into_active_model(self, ingested_at: DateTime<Utc>) -> PullRequestActiveModel {
        PullRequestActiveModel {
            repository_id: Set(self.repository_id),
            number: Set(self.number),
            title: Set(self.title),
            author: Set(self.author),
            state: Set(self.state),
            created_at: Set(self.created_at),
            ingested_at: Set(ingested_at),
            ..Default::default()
        }
    }
}

impl NewIssue {
    pub fn into_active_model(self, ingested_at: DateTime<Utc>) -> IssueActiveModel {
        IssueActiveModel {
            repository_id: Set(self.repository_id),
            number: Set(self.number),
            title: Set(self.title),
            author: Set(self.author),
            created_at: Set(self.created_at),
            ingested_at: Set(ingested_at),
            ..Default::default()
        }
    }
}

impl NewReview {
    pub fn into_active_model(self, ingested_at: DateTime<Utc>) -> ReviewActiveModel {
        ReviewActiveModel {
            repository_id: Set(self.repository_id),
            review_id: Set(self.review_id),
            pr_number: Set(self.pr_number),
            author: Set(self.author),
            comment: Set(self.comment),
            submitted_at: Set(self.submitted_at),
            ingested_at: Set(ingested_at),
            ..Default::default()
        }
    }
}
