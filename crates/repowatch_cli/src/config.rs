//! Configuration file support for repowatch.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `REPOWATCH_`)
//! 3. Config file (./repowatch.toml, then ~/.config/repowatch/config.toml)
//! 4. Built-in defaults
//!
//! Nested keys use a double underscore in the environment
//! (`REPOWATCH_SYNC__RETENTION_DAYS=14`). The two most common settings also
//! have flat names, `REPOWATCH_DATABASE_URL` and `REPOWATCH_GITHUB_TOKEN`, and
//! the unprefixed `GITHUB_TOKEN` and `PORT` are honoured when nothing else
//! sets those values.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "postgres://localhost/repowatch"  # default: sqlite file in the XDG state dir
//!
//! [github]
//! token = "ghp_..."
//! api_url = "https://api.github.com"
//! requests_per_second = 10  # 0 disables proactive pacing
//!
//! [sync]
//! branch_concurrency = 4
//! review_batch_size = 5
//! insert_batch_size = 500
//! retention_days = 30
//! interval_minutes = 0  # 0 syncs once at startup only
//! refresh_pr_state = true
//!
//! [server]
//! host = "0.0.0.0"
//! port = 3000
//!
//! [tracking]
//! file = "config.properties"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config as ConfigBuilder, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use repowatch::github::{DEFAULT_API_URL, GITHUB_DEFAULT_RPS};
use repowatch::sync::SyncOptions;
use repowatch::tracked::DEFAULT_TRACKING_FILE;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub github: GitHubConfig,
    pub sync: SyncConfig,
    pub server: ServerConfig,
    pub tracking: TrackingConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Supports sqlite:// and postgres:// schemes.
    pub url: Option<String>,
}

/// GitHub configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub token: Option<String>,
    /// API root, for GitHub Enterprise.
    pub api_url: String,
    /// Proactive request pacing. 0 disables it.
    pub requests_per_second: u32,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: DEFAULT_API_URL.to_string(),
            requests_per_second: GITHUB_DEFAULT_RPS,
        }
    }
}

/// Ingestion settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub branch_concurrency: usize,
    pub review_batch_size: usize,
    pub insert_batch_size: usize,
    pub retention_days: i64,
    /// Minutes between background cycles while serving. 0 disables them.
    pub interval_minutes: u64,
    pub refresh_pr_state: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let options = SyncOptions::default();
        Self {
            branch_concurrency: options.branch_concurrency,
            review_batch_size: options.review_batch_size,
            insert_batch_size: options.insert_batch_size,
            retention_days: options.retention_days,
            interval_minutes: 0,
            refresh_pr_state: options.refresh_pr_state,
        }
    }
}

impl SyncConfig {
    pub fn options(&self) -> SyncOptions {
        SyncOptions {
            branch_concurrency: self.branch_concurrency.max(1),
            review_batch_size: self.review_batch_size.max(1),
            insert_batch_size: self.insert_batch_size.max(1),
            retention_days: self.retention_days,
            refresh_pr_state: self.refresh_pr_state,
            ..SyncOptions::default()
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        (self.interval_minutes > 0).then(|| Duration::from_secs(self.interval_minutes * 60))
    }
}

/// API server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Location of the tracked-repository list.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub file: PathBuf,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_TRACKING_FILE),
        }
    }
}

/// Flat environment names and the keys they set. Earlier entries win.
const ENV_ALIASES: [(&str, &str); 4] = [
    ("REPOWATCH_DATABASE_URL", "database.url"),
    ("REPOWATCH_GITHUB_TOKEN", "github.token"),
    ("GITHUB_TOKEN", "github.token"),
    ("PORT", "server.port"),
];

/// Apply [`ENV_ALIASES`] on top of `builder`, skipping keys the prefixed
/// nested form already set.
fn apply_env_aliases(
    mut builder: config::ConfigBuilder<DefaultState>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<config::ConfigBuilder<DefaultState>, ConfigError> {
    let mut claimed: Vec<&str> = Vec::new();
    for (var, key) in ENV_ALIASES {
        if claimed.contains(&key) {
            continue;
        }
        let nested = format!("REPOWATCH_{}", key.to_uppercase().replace('.', "__"));
        if lookup(&nested).is_some() {
            claimed.push(key);
            continue;
        }
        if let Some(value) = lookup(var).filter(|v| !v.is_empty()) {
            builder = builder.set_override(key, value)?;
            claimed.push(key);
        }
    }
    Ok(builder)
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// A config that fails to build or deserialize is logged and replaced by
    /// the defaults.
    pub fn load() -> Self {
        match Self::try_load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}", e);
                Config::default()
            }
        }
    }

    fn try_load() -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("repowatch.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./repowatch.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // REPOWATCH_SYNC__RETENTION_DAYS -> sync.retention_days
        builder = builder.add_source(
            Environment::with_prefix("REPOWATCH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        builder = apply_env_aliases(builder, |var| std::env::var(var).ok())?;

        builder.build()?.try_deserialize::<Config>()
    }

    /// The database URL, falling back to a SQLite file in the state directory.
    ///
    /// `mode=rwc` creates the file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("repowatch.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    pub fn github_token(&self) -> Option<String> {
        self.github.token.clone().filter(|t| !t.trim().is_empty())
    }

    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "repowatch").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// On Linux, this is `$XDG_STATE_HOME/repowatch` or `~/.local/state/repowatch`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "repowatch").map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_toml(content: &str) -> Config {
        ConfigBuilder::builder()
            .add_source(config::File::from_str(content, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    fn with_env(vars: &[(&str, &str)]) -> Config {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        apply_env_aliases(ConfigBuilder::builder(), |var| env.get(var).cloned())
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.database.url.is_none());
        assert!(config.github.token.is_none());
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.sync.retention_days, 30);
        assert_eq!(config.sync.interval_minutes, 0);
        assert_eq!(config.tracking.file, PathBuf::from("config.properties"));
    }

    #[test]
    fn test_config_builder_partial_override() {
        let config = from_toml(
            r#"
            [sync]
            retention_days = 14
            interval_minutes = 15
        "#,
        );

        assert_eq!(config.sync.retention_days, 14);
        assert_eq!(config.sync.interval(), Some(Duration::from_secs(900)));
        // Other values should be defaults
        assert_eq!(config.sync.branch_concurrency, 4);
        assert!(config.sync.refresh_pr_state);
    }

    #[test]
    fn test_full_config_parsing() {
        let config = from_toml(
            r#"
            [database]
            url = "sqlite:///tmp/test.db"

            [github]
            token = "ghp_test123"
            api_url = "https://ghe.example.com/api/v3"
            requests_per_second = 0

            [sync]
            branch_concurrency = 2
            review_batch_size = 3
            refresh_pr_state = false

            [server]
            host = "127.0.0.1"
            port = 8080

            [tracking]
            file = "/etc/repowatch/repos.properties"
        "#,
        );

        assert_eq!(config.database_url().as_deref(), Some("sqlite:///tmp/test.db"));
        assert_eq!(config.github_token().as_deref(), Some("ghp_test123"));
        assert_eq!(config.github.requests_per_second, 0);
        assert_eq!(config.server.port, 8080);

        let options = config.sync.options();
        assert_eq!(options.branch_concurrency, 2);
        assert_eq!(options.review_batch_size, 3);
        assert!(!options.refresh_pr_state);
        assert_eq!(options.review_insert_batch_size, 20);
    }

    #[test]
    fn test_zero_batch_sizes_are_clamped() {
        let config = from_toml(
            r#"
            [sync]
            branch_concurrency = 0
            review_batch_size = 0
        "#,
        );
        let options = config.sync.options();
        assert_eq!(options.branch_concurrency, 1);
        assert_eq!(options.review_batch_size, 1);
    }

    #[test]
    fn test_legacy_env_names() {
        let config = with_env(&[("GITHUB_TOKEN", "legacy"), ("PORT", "8081")]);
        assert_eq!(config.github_token().as_deref(), Some("legacy"));
        assert_eq!(config.server.port, 8081);
    }

    #[test]
    fn test_prefixed_env_beats_legacy() {
        let config = with_env(&[
            ("REPOWATCH_GITHUB_TOKEN", "prefixed"),
            ("GITHUB_TOKEN", "legacy"),
        ]);
        assert_eq!(config.github_token().as_deref(), Some("prefixed"));
    }

    #[test]
    fn test_blank_token_is_absent() {
        let config = from_toml(
            r#"
            [github]
            token = "  "
        "#,
        );
        assert!(config.github_token().is_none());
    }
}
