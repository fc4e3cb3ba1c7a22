//! Repowatch CLI - ingestion runner and query API server.

mod commands;
mod config;
mod progress;
mod shutdown;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::limits::OutputFormat;

#[derive(Parser)]
#[command(name = "repowatch")]
#[command(version)]
#[command(about = "GitHub activity ingestion and query API")]
#[command(
    long_about = "Repowatch polls the GitHub API for commits, pull requests, issues and reviews \
of a list of tracked repositories, keeps a rolling window of that activity in a \
local database and serves it to a dashboard over a small JSON API."
)]
#[command(after_long_help = r#"EXAMPLES
    Track a repository and run the server:
        $ repowatch repos add rust-lang/rust
        $ repowatch serve

    One-off sync of two repositories:
        $ repowatch sync tokio-rs/tokio tokio-rs/axum

    Generate shell completions:
        $ repowatch completions bash > ~/.local/share/bash-completion/completions/repowatch

CONFIGURATION
    Repowatch reads configuration from:
      1. ~/.config/repowatch/config.toml (or $XDG_CONFIG_HOME/repowatch/config.toml)
      2. ./repowatch.toml
      3. Environment variables (REPOWATCH_* prefix, nested keys with __)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    REPOWATCH_DATABASE_URL    Database connection string (default: ~/.local/state/repowatch/repowatch.db)
    REPOWATCH_GITHUB_TOKEN    GitHub personal access token (GITHUB_TOKEN also works)
    REPOWATCH_SERVER__PORT    API port (PORT also works, default 3000)
    RUST_LOG                  Log filter (default: repowatch=info,repowatch_cli=info)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync tracked repositories, then serve the query API
    Serve(ServeArgs),
    /// Run one sync cycle and exit
    Sync {
        /// Repositories to sync (owner/repo); defaults to the tracked list
        repositories: Vec<String>,
    },
    /// Manage the tracked-repository list
    Repos {
        #[command(subcommand)]
        action: ReposAction,
    },
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Show current GitHub rate limit status
    Limits {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Clone, Args)]
struct ServeArgs {
    /// Address to bind (default from config or 0.0.0.0)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (default from config or 3000)
    #[arg(short, long)]
    port: Option<u16>,

    /// Start serving without the startup ingestion cycle
    #[arg(long)]
    skip_initial_sync: bool,
}

#[derive(Subcommand)]
enum ReposAction {
    /// List tracked repositories
    List,
    /// Start tracking a repository
    Add {
        /// Repository as owner/repo
        name: String,

        /// Don't check that the repository exists on GitHub
        #[arg(long)]
        no_verify: bool,
    },
    /// Stop tracking a repository
    Remove {
        /// Repository as owner/repo
        name: String,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("repowatch=info,repowatch_cli=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Commands that need neither configuration nor a database
    if let Commands::Completions { shell } = &cli.command {
        commands::meta::handle_completions(*shell)?;
        return Ok(());
    }

    let config = config::Config::load();

    match cli.command {
        Commands::Repos { action } => commands::repos::handle_repos(action, &config).await?,
        Commands::Limits { output } => commands::limits::handle_limits(output, &config).await?,
        Commands::Serve(args) => {
            shutdown::setup_shutdown_handler();
            let database_url = prepare_database(&config)?;
            commands::serve::handle_serve(args, &config, &database_url).await?;
        }
        Commands::Sync { repositories } => {
            shutdown::setup_shutdown_handler();
            let database_url = prepare_database(&config)?;
            commands::sync::handle_sync(repositories, &config, &database_url).await?;
        }
        Commands::Migrate { action } => {
            let database_url = prepare_database(&config)?;
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Resolve the database URL and, for SQLite, make sure its directory exists.
fn prepare_database(config: &config::Config) -> Result<String, Box<dyn std::error::Error>> {
    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL; set REPOWATCH_DATABASE_URL")?;

    if database_url.starts_with("sqlite://") {
        let db_path = database_url.trim_start_matches("sqlite://");
        // Strip query parameters (e.g., ?mode=rwc) before path operations
        let db_path = db_path.split('?').next().unwrap_or(db_path);
        let db_path = std::path::Path::new(db_path);

        if db_path.is_relative() && !db_path.as_os_str().is_empty() {
            tracing::warn!(
                "Database path '{}' is relative - behavior depends on current directory. \
                 Consider using an absolute path.",
                db_path.display()
            );
        }

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
    }

    Ok(database_url)
}
