//! Progress reporting for sync operations.
//!
//! Every [`SyncProgress`] event becomes one structured `tracing` call:
//! per-batch detail at `debug`, stage and repository results at `info`,
//! problems at `warn`/`error`.

use repowatch::sync::{ProgressCallback, SyncProgress};

/// Logging reporter using tracing for structured output.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    /// Box the reporter as a sync progress callback.
    pub fn callback(self) -> ProgressCallback {
        Box::new(move |event| self.handle(event))
    }

    pub fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::CycleStarted { repositories } => {
                tracing::info!(repositories, "Starting sync cycle");
            }

            SyncProgress::RepositoryStarted { repository } => {
                tracing::info!(repo = %repository, "Syncing repository");
            }

            SyncProgress::Pruned { repository, report } => {
                if report.total() > 0 {
                    tracing::info!(
                        repo = %repository,
                        commits = report.commits,
                        pull_requests = report.pull_requests,
                        issues = report.issues,
                        reviews = report.reviews,
                        "Pruned old records"
                    );
                }
            }

            SyncProgress::Collapsed {
                repository,
                kind,
                deleted,
            } => {
                tracing::info!(repo = %repository, kind = %kind, deleted, "Collapsed duplicates");
            }

            SyncProgress::FetchingBranches {
                repository,
                branches,
                concurrency,
            } => {
                tracing::debug!(repo = %repository, branches, concurrency, "Fetching commits per branch");
            }

            SyncProgress::Fetched {
                repository,
                kind,
                count,
                new,
            } => {
                tracing::info!(repo = %repository, kind = %kind, count, new, "Fetched");
            }

            SyncProgress::ReviewBatch {
                repository,
                batch,
                total_batches,
                pr_numbers,
            } => {
                tracing::debug!(
                    repo = %repository,
                    batch,
                    total_batches,
                    pr_numbers = ?pr_numbers,
                    "Fetching review batch"
                );
            }

            SyncProgress::Persisted {
                repository,
                kind,
                inserted,
                failed,
            } => {
                if failed > 0 {
                    tracing::warn!(repo = %repository, kind = %kind, inserted, failed, "Persisted with failures");
                } else {
                    tracing::info!(repo = %repository, kind = %kind, inserted, "Persisted");
                }
            }

            SyncProgress::RepositoryComplete {
                repository,
                inserted,
                errors,
            } => {
                if errors > 0 {
                    tracing::warn!(repo = %repository, inserted, errors, "Repository synced with errors");
                } else {
                    tracing::info!(repo = %repository, inserted, "Repository synced");
                }
            }

            SyncProgress::RepositoryFailed { repository, error } => {
                tracing::error!(repo = %repository, error = %error, "Repository sync failed");
            }

            SyncProgress::CycleComplete {
                succeeded,
                failed,
                cancelled,
            } => {
                tracing::info!(succeeded, failed, cancelled, "Sync cycle complete");
            }

            SyncProgress::Warning { message } => {
                tracing::warn!("{}", message);
            }

            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_event_is_accepted_without_a_subscriber() {
        let reporter = LoggingReporter::new();
        let callback = reporter.callback();
        callback(SyncProgress::CycleStarted { repositories: 2 });
        callback(SyncProgress::RepositoryFailed {
            repository: "o/r".into(),
            error: "boom".into(),
        });
        callback(SyncProgress::CycleComplete {
            succeeded: 1,
            failed: 1,
            cancelled: false,
        });
    }
}
