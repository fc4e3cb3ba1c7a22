//! The tracked-repository list.
//!
//! A properties-style file: each line `owner/repo=<anything>` tracks one
//! repository, keyed by the text before the first `=`. Lines without `=`
//! and lines starting with `#` are ignored. The list is read wholesale on
//! every use so edits made while the server runs are picked up by the next
//! cycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

/// File name used when no path is configured.
pub const DEFAULT_TRACKING_FILE: &str = "config.properties";

#[derive(Debug, Error)]
pub enum TrackedError {
    #[error("Tracking file {} not found", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, TrackedError>;

/// Repository names listed in properties-file `content`, in file order,
/// without duplicates.
pub fn parse(content: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for line in content.lines().map(str::trim) {
        if line.starts_with('#') {
            continue;
        }
        let Some((key, _)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if !key.is_empty() && !names.iter().any(|n| n == key) {
            names.push(key.to_string());
        }
    }
    names
}

fn line_key(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.starts_with('#') {
        return None;
    }
    line.split_once('=').map(|(key, _)| key.trim())
}

/// Handle to the tracking file. Clones share a lock so concurrent writers
/// in one process do not interleave.
#[derive(Debug, Clone)]
pub struct TrackedRepositories {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl TrackedRepositories {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> TrackedError {
        TrackedError::Io {
            path: self.path.clone(),
            source,
        }
    }

    async fn read(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Every tracked repository. A missing file is an error.
    pub async fn load(&self) -> Result<Vec<String>> {
        match self.read().await? {
            Some(content) => Ok(parse(&content)),
            None => Err(TrackedError::NotFound {
                path: self.path.clone(),
            }),
        }
    }

    pub async fn contains(&self, name: &str) -> Result<bool> {
        Ok(self
            .read()
            .await?
            .is_some_and(|content| parse(&content).iter().any(|n| n == name)))
    }

    /// Append `name`, creating the file if needed. Returns false when it was
    /// already tracked.
    pub async fn add(&self, name: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut content = self.read().await?.unwrap_or_default();
        if parse(&content).iter().any(|n| n == name) {
            return Ok(false);
        }

        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&format!("{name}={name}\n"));
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| self.io_error(e))?;

        tracing::info!(repository = %name, file = %self.path.display(), "Tracking repository");
        Ok(true)
    }

    /// Drop every line keyed by `name`, keeping comments and other entries.
    /// Returns false when it was not tracked.
    pub async fn remove(&self, name: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let Some(content) = self.read().await? else {
            return Ok(false);
        };

        let kept: Vec<&str> = content
            .lines()
            .filter(|line| line_key(line) != Some(name))
            .collect();
        if kept.len() == content.lines().count() {
            return Ok(false);
        }

        let mut rewritten = kept.join("\n");
        if !rewritten.is_empty() {
            rewritten.push('\n');
        }
        tokio::fs::write(&self.path, rewritten)
            .await
            .map_err(|e| self.io_error(e))?;

        tracing::info!(repository = %name, file = %self.path.display(), "Stopped tracking repository");
        Ok(true)
    }
}
