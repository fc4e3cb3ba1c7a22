//! Sync options, per-repository reports and cycle results.

use serde::Serialize;

use crate::activity::{RETENTION_DAYS, RecordKind};
use crate::store::{DEFAULT_INSERT_BATCH_SIZE, PruneReport, REVIEW_INSERT_BATCH_SIZE};

use super::error::SyncError;

/// Default number of branches whose commits are fetched at once.
pub const DEFAULT_BRANCH_CONCURRENCY: usize = 4;

/// Pull requests whose reviews are fetched together between quota checks.
pub const DEFAULT_REVIEW_BATCH_SIZE: usize = 5;

/// Options for a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Maximum concurrent per-branch commit fetches.
    pub branch_concurrency: usize,
    /// Pull requests per concurrent review-fetch batch.
    pub review_batch_size: usize,
    /// Rows per bulk insert for commits, pull requests and issues.
    pub insert_batch_size: usize,
    /// Rows per bulk insert for reviews.
    pub review_insert_batch_size: usize,
    /// Retention horizon and minimum rescan window.
    pub retention_days: i64,
    /// Update title and state of already-stored pull requests.
    pub refresh_pr_state: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            branch_concurrency: DEFAULT_BRANCH_CONCURRENCY,
            review_batch_size: DEFAULT_REVIEW_BATCH_SIZE,
            insert_batch_size: DEFAULT_INSERT_BATCH_SIZE,
            review_insert_batch_size: REVIEW_INSERT_BATCH_SIZE,
            retention_days: RETENTION_DAYS,
            refresh_pr_state: true,
        }
    }
}

/// Counts for one record kind within one repository sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    /// Records returned by the upstream API and inside the sync window.
    pub fetched: usize,
    /// Records not already stored.
    pub new: usize,
    pub inserted: usize,
    pub failed: usize,
    /// Stored pull requests whose state or title was refreshed.
    pub updated: usize,
}

/// Result of syncing one repository.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepoSyncReport {
    pub repository: String,
    pub repository_id: i32,
    pub pruned: PruneReport,
    /// Duplicate rows removed by maintenance before ingestion.
    pub collapsed: u64,
    pub commits: KindCounts,
    pub pull_requests: KindCounts,
    pub issues: KindCounts,
    pub reviews: KindCounts,
    /// Non-fatal problems: fetches that ended early, failed tasks.
    pub errors: Vec<String>,
}

impl RepoSyncReport {
    pub fn counts(&self, kind: RecordKind) -> &KindCounts {
        match kind {
            RecordKind::Commit => &self.commits,
            RecordKind::PullRequest => &self.pull_requests,
            RecordKind::Issue => &self.issues,
            RecordKind::Review => &self.reviews,
        }
    }

    pub fn inserted(&self) -> usize {
        RecordKind::ALL
            .iter()
            .map(|kind| self.counts(*kind).inserted)
            .sum()
    }

    /// True when every upstream fetch ran to completion.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Outcome for one repository of a cycle.
#[derive(Debug)]
pub struct RepoOutcome {
    pub repository: String,
    pub result: Result<RepoSyncReport, SyncError>,
}

/// Result of one pass over a list of repositories.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub outcomes: Vec<RepoOutcome>,
    /// Set when the cycle stopped early on a shutdown request.
    pub cancelled: bool,
}

impl CycleReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &RepoSyncReport> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &SyncError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.repository.as_str(), e)))
    }

    pub fn inserted(&self) -> usize {
        self.succeeded().map(RepoSyncReport::inserted).sum()
    }
}
