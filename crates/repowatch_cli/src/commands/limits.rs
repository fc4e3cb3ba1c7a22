use std::error::Error;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use console::style;
use repowatch::github::RateLimitInfo;
use serde::Serialize;

use crate::commands::shared::build_client;
use crate::config::Config;

/// Output format for rate limit display.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable summary (default)
    #[default]
    Text,
    /// Display as JSON
    Json,
}

/// The core quota, ready for display.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct RateLimitDisplay {
    pub limit: usize,
    pub used: usize,
    pub remaining: usize,
    pub usage_percent: f64,
    pub reset_at: DateTime<Utc>,
    pub reset_in: String,
}

impl RateLimitDisplay {
    pub(crate) fn new(info: &RateLimitInfo, now: DateTime<Utc>) -> Self {
        let usage_percent = if info.limit > 0 {
            (info.used as f64 / info.limit as f64) * 100.0
        } else {
            0.0
        };
        let reset_duration = info.reset_at.signed_duration_since(now);
        let reset_in = if reset_duration.num_seconds() > 0 {
            format_duration(reset_duration)
        } else {
            "now".to_string()
        };

        Self {
            limit: info.limit,
            used: info.used,
            remaining: info.remaining,
            usage_percent: (usage_percent * 10.0).round() / 10.0,
            reset_at: info.reset_at,
            reset_in,
        }
    }

    fn print(&self, format: OutputFormat) -> Result<(), Box<dyn Error>> {
        match format {
            OutputFormat::Text => {
                let remaining = if self.remaining == 0 {
                    style(self.remaining.to_string()).red()
                } else {
                    style(self.remaining.to_string()).green()
                };
                println!("Core rate limit");
                println!("  Limit:      {}", self.limit);
                println!("  Used:       {} ({:.1}%)", self.used, self.usage_percent);
                println!("  Remaining:  {}", remaining);
                println!(
                    "  Resets at:  {} (in {})",
                    self.reset_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    self.reset_in
                );
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(self)?);
            }
        }
        Ok(())
    }
}

fn format_duration(duration: chrono::Duration) -> String {
    let total = duration.num_seconds();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Print the current core rate limit.
pub(crate) async fn handle_limits(output: OutputFormat, config: &Config) -> Result<(), Box<dyn Error>> {
    let client = build_client(config)?;
    let info = client.rate_limit().await?;
    RateLimitDisplay::new(&info, Utc::now()).print(output)
}
