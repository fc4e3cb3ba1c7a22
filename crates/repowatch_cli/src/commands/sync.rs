use std::error::Error;

use console::Term;
use repowatch::connect_and_migrate;

use crate::commands::shared::{
    build_client, display_cycle_summary, display_final_rate_limit, run_cycle, tracked,
};
use crate::config::Config;

/// One sync cycle over `repositories`, or over the tracked list when none
/// are given. Fails if any repository failed.
pub(crate) async fn handle_sync(
    repositories: Vec<String>,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn Error>> {
    let is_tty = Term::stdout().is_term();
    let client = build_client(config)?;

    let repositories = if repositories.is_empty() {
        tracked(config).load().await?
    } else {
        repositories
    };
    if repositories.is_empty() {
        println!("No repositories to sync. Add one with: repowatch repos add owner/repo");
        return Ok(());
    }

    let db = connect_and_migrate(database_url).await?;
    let cycle = run_cycle(&client, &db, &repositories, &config.sync.options()).await;

    display_cycle_summary(&cycle, is_tty);
    display_final_rate_limit(&client, is_tty).await;
    db.close().await?;

    let failed = cycle.failed().count();
    if failed > 0 {
        return Err(format!(
            "{failed} of {} repositories failed to sync",
            cycle.outcomes.len()
        )
        .into());
    }
    Ok(())
}
