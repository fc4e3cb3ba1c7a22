use std::error::Error;

use console::style;
use repowatch::github::RepoName;

use crate::ReposAction;
use crate::commands::shared::{build_client, tracked};
use crate::config::Config;

/// Manage the tracked-repository file.
///
/// Removing a repository stops future syncs; its stored activity stays
/// until retention prunes it.
pub(crate) async fn handle_repos(action: ReposAction, config: &Config) -> Result<(), Box<dyn Error>> {
    let tracked = tracked(config);

    match action {
        ReposAction::List => {
            let names = tracked.load().await?;
            if names.is_empty() {
                println!("No repositories tracked in {}", tracked.path().display());
            }
            for name in names {
                println!("{name}");
            }
        }
        ReposAction::Add { name, no_verify } => {
            let repo = RepoName::parse(&name)
                .map_err(|_| format!("Invalid repository name '{name}'. Use owner/repo."))?;
            let full_name = repo.full_name();

            if !no_verify {
                let client = build_client(config)?;
                if client.get_repository(&repo).await?.is_none() {
                    return Err(format!("Repository {full_name} not found on GitHub").into());
                }
            }

            if tracked.add(&full_name).await? {
                println!(
                    "{} Tracking {} in {}",
                    style("✓").green(),
                    style(&full_name).bold(),
                    tracked.path().display()
                );
            } else {
                println!("{full_name} is already tracked");
            }
        }
        ReposAction::Remove { name } => {
            if tracked.remove(name.trim()).await? {
                println!("{} Stopped tracking {}", style("✓").green(), style(name.trim()).bold());
            } else {
                return Err(format!("{} is not tracked", name.trim()).into());
            }
        }
    }

    Ok(())
}
