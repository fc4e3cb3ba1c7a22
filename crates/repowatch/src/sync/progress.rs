//! Progress reporting types for sync operations.
//!
//! The engine emits these through an optional callback; the CLI turns them
//! into log lines, tests count them.

use crate::activity::RecordKind;
use crate::store::PruneReport;

/// Progress events emitted during a sync cycle.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// Starting a pass over the tracked repositories.
    CycleStarted {
        /// Number of repositories in the cycle.
        repositories: usize,
    },

    /// Starting one repository.
    RepositoryStarted { repository: String },

    /// Retention pruning finished.
    Pruned {
        repository: String,
        report: PruneReport,
    },

    /// Duplicate rows collapsed during maintenance.
    Collapsed {
        repository: String,
        kind: RecordKind,
        deleted: u64,
    },

    /// Branch list fetched; per-branch commit fetches follow.
    FetchingBranches {
        repository: String,
        branches: usize,
        concurrency: usize,
    },

    /// All records of one kind fetched and filtered to the sync window.
    Fetched {
        repository: String,
        kind: RecordKind,
        /// Records inside the sync window.
        count: usize,
        /// Records not already stored.
        new: usize,
    },

    /// Starting one batch of concurrent review fetches.
    ReviewBatch {
        repository: String,
        /// 1-indexed batch number.
        batch: usize,
        total_batches: usize,
        pr_numbers: Vec<i64>,
    },

    /// New records of one kind written.
    Persisted {
        repository: String,
        kind: RecordKind,
        inserted: usize,
        failed: usize,
    },

    /// Repository finished (possibly with non-fatal errors).
    RepositoryComplete {
        repository: String,
        inserted: usize,
        errors: usize,
    },

    /// Repository aborted; the cycle continues with the next one.
    RepositoryFailed { repository: String, error: String },

    /// Cycle finished.
    CycleComplete {
        succeeded: usize,
        failed: usize,
        cancelled: bool,
    },

    /// Warning message (non-fatal).
    Warning { message: String },
}

/// Callback for progress updates during sync operations.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_with_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let callback: ProgressCallback = Box::new(move |_event| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        emit(Some(&callback), SyncProgress::CycleStarted { repositories: 2 });
        emit(
            Some(&callback),
            SyncProgress::RepositoryStarted {
                repository: "octo/cat".to_string(),
            },
        );

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_emit_without_callback() {
        emit(
            None,
            SyncProgress::Warning {
                message: "ignored".to_string(),
            },
        );
    }

    #[test]
    fn test_sync_progress_debug() {
        let event = SyncProgress::ReviewBatch {
            repository: "rust-lang/rust".to_string(),
            batch: 1,
            total_batches: 3,
            pr_numbers: vec![10, 11],
        };

        let debug_str = format!("{:?}", event);
        assert!(debug_str.contains("ReviewBatch"));
        assert!(debug_str.contains("rust-lang/rust"));
    }
}
