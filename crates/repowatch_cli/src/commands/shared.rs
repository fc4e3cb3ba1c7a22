use std::error::Error;
use std::time::Duration;

use console::style;
use repowatch::github::{ApiRateLimiter, GitHubClient};
use repowatch::sync::{CycleReport, SyncOptions, sync_all_until};
use repowatch::tracked::TrackedRepositories;
use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::progress::LoggingReporter;
use crate::shutdown;

/// Build the upstream client from config. A token is mandatory.
pub(crate) fn build_client(config: &Config) -> Result<GitHubClient, Box<dyn Error>> {
    let token = config.github_token().ok_or(
        "GitHub token is required. Set REPOWATCH_GITHUB_TOKEN (or GITHUB_TOKEN), \
         or `token` under [github] in the config file.",
    )?;
    let client = GitHubClient::new(&token)?
        .with_base_url(&config.github.api_url)
        .with_rate_limiter(maybe_rate_limiter(config.github.requests_per_second));
    Ok(client)
}

/// Create a rate limiter unless pacing is disabled (`rps == 0`).
pub(crate) fn maybe_rate_limiter(rps: u32) -> Option<ApiRateLimiter> {
    (rps > 0).then(|| ApiRateLimiter::new(rps))
}

pub(crate) fn tracked(config: &Config) -> TrackedRepositories {
    TrackedRepositories::new(&config.tracking.file)
}

/// One sync cycle over `repositories`, logging progress and stopping early on
/// a shutdown request.
pub(crate) async fn run_cycle(
    client: &GitHubClient,
    db: &DatabaseConnection,
    repositories: &[String],
    options: &SyncOptions,
) -> CycleReport {
    let reporter = LoggingReporter::new().callback();
    sync_all_until(
        client,
        db,
        repositories,
        options,
        shutdown::flag(),
        Some(&reporter),
    )
    .await
}

/// Print a per-repository summary of a cycle (TTY only; otherwise the
/// progress log already carries it).
pub(crate) fn display_cycle_summary(cycle: &CycleReport, is_tty: bool) {
    if !is_tty {
        return;
    }

    println!();
    for outcome in &cycle.outcomes {
        match &outcome.result {
            Ok(report) => {
                let mark = if report.is_complete() {
                    style("✓").green()
                } else {
                    style("!").yellow()
                };
                println!(
                    "{} {}  commits +{}  pull requests +{} ({} updated)  issues +{}  reviews +{}",
                    mark,
                    style(&report.repository).bold(),
                    report.commits.inserted,
                    report.pull_requests.inserted,
                    report.pull_requests.updated,
                    report.issues.inserted,
                    report.reviews.inserted,
                );
                for error in report.errors.iter().take(5) {
                    println!("    {}", style(error).dim());
                }
            }
            Err(e) => {
                println!("{} {}  {}", style("✗").red(), style(&outcome.repository).bold(), e);
            }
        }
    }
    if cycle.cancelled {
        println!("{}", style("Cycle stopped early on shutdown request.").yellow());
    }
}

/// Display final rate limit status with a timeout to avoid hangs.
pub(crate) async fn display_final_rate_limit(client: &GitHubClient, is_tty: bool) {
    let rate_limit = tokio::time::timeout(Duration::from_secs(5), client.rate_limit()).await;

    match rate_limit {
        Ok(Ok(final_rate)) => {
            if is_tty {
                println!(
                    "\nRate limit after sync: {}/{} remaining",
                    final_rate.remaining, final_rate.limit
                );
            } else {
                tracing::info!(
                    remaining = final_rate.remaining,
                    limit = final_rate.limit,
                    "Rate limit after sync"
                );
            }
        }
        Ok(Err(e)) => tracing::debug!(error = %e, "Could not read final rate limit"),
        Err(_) => tracing::debug!("Timed out reading final rate limit"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rps_disables_pacing() {
        assert!(maybe_rate_limiter(0).is_none());
        assert!(maybe_rate_limiter(10).is_some());
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = build_client(&Config::default())
            .err()
            .expect("token is required");
        assert!(err.to_string().contains("GitHub token is required"));
    }
}
