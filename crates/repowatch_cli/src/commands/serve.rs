use std::error::Error;
use std::sync::Arc;

use repowatch::api::{self, AppState};
use repowatch::connect_and_migrate;
use repowatch::github::GitHubClient;
use repowatch::sync::SyncOptions;
use repowatch::tracked::TrackedRepositories;
use sea_orm::DatabaseConnection;
use tokio::net::TcpListener;

use crate::ServeArgs;
use crate::commands::shared::{build_client, run_cycle, tracked};
use crate::config::Config;
use crate::shutdown;

/// Everything a cycle needs, shared with the background scheduler.
struct Pipeline {
    client: GitHubClient,
    db: DatabaseConnection,
    tracked: TrackedRepositories,
    options: SyncOptions,
}

impl Pipeline {
    /// Sync every tracked repository. The list is re-read each time.
    async fn cycle(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let repositories = self.tracked.load().await?;
        let cycle = run_cycle(&self.client, &self.db, &repositories, &self.options).await;
        tracing::info!(
            repositories = cycle.outcomes.len(),
            inserted = cycle.inserted(),
            failed = cycle.failed().count(),
            "Ingestion cycle finished"
        );
        Ok(())
    }
}

/// Initial ingestion, then the query API until shutdown.
///
/// A tracking file that cannot be read at startup is fatal; during later
/// background cycles it is logged and retried on the next tick.
pub(crate) async fn handle_serve(
    args: ServeArgs,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn Error>> {
    let pipeline = Arc::new(Pipeline {
        client: build_client(config)?,
        db: connect_and_migrate(database_url).await?,
        tracked: tracked(config),
        options: config.sync.options(),
    });

    if args.skip_initial_sync {
        tracing::info!("Skipping initial ingestion");
    } else {
        pipeline.cycle().await.map_err(|e| e as Box<dyn Error>)?;
    }

    let scheduler = config.sync.interval().map(|interval| {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            // the first tick fires immediately and the startup cycle already ran
            tick.tick().await;
            loop {
                tick.tick().await;
                if shutdown::is_shutdown_requested() {
                    break;
                }
                if let Err(e) = pipeline.cycle().await {
                    tracing::error!(error = %e, "Scheduled ingestion failed");
                }
            }
        })
    });

    let state = Arc::new(AppState {
        db: pipeline.db.clone(),
        client: pipeline.client.clone(),
        options: pipeline.options.clone(),
        tracked: Some(pipeline.tracked.clone()),
    });

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let listener = TcpListener::bind((host.as_str(), port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "Server running");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown::wait_for_shutdown())
        .await?;

    if let Some(handle) = scheduler {
        handle.abort();
    }
    pipeline.db.clone().close().await?;
    tracing::info!("Server stopped");
    Ok(())
}
