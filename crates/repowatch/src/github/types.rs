//! GitHub REST payloads.
//!
//! Only the fields the pipeline reads are modelled. Timestamps stay as raw
//! strings so a missing or malformed value can fall back to "now" during
//! conversion instead of failing the whole page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepoInfo {
    pub id: i64,
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Branch {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitSignature {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<GitSignature>,
}

/// An entry from `/repos/{name}/commits`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitItem {
    pub sha: String,
    pub commit: CommitDetail,
    /// The linked GitHub account, absent for unlinked emails.
    #[serde(default)]
    pub author: Option<Account>,
}

/// An entry from `/repos/{name}/pulls`.
#[derive(Debug, Clone, Deserialize)]
pub struct PullItem {
    pub number: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub user: Option<Account>,
    pub state: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// An entry from `/repos/{name}/issues`.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueItem {
    pub number: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub user: Option<Account>,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Present when the "issue" is really a pull request.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl IssueItem {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

/// An entry from `/repos/{name}/pulls/{n}/reviews`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewItem {
    pub id: i64,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<Account>,
    #[serde(default)]
    pub submitted_at: Option<String>,
}

/// A single rate limit resource entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitResource {
    pub limit: usize,
    #[serde(default)]
    pub used: usize,
    pub remaining: usize,
    /// Unix timestamp when the window resets.
    pub reset: i64,
}

impl RateLimitResource {
    pub fn reset_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.reset, 0).unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitResources {
    /// Core REST quota; the only one this crate consumes.
    pub core: RateLimitResource,
}

/// Body of `GET /rate_limit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitResponse {
    pub resources: RateLimitResources,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_with_pull_request_marker_is_detected() {
        let issue: IssueItem = serde_json::from_value(serde_json::json!({
            "number": 3,
            "title": "Fix it",
            "user": {"login": "a"},
            "created_at": "2024-01-01T00:00:00Z",
            "pull_request": {"url": "https://api.github.com/repos/o/r/pulls/3"}
        }))
        .expect("decode issue");
        assert!(issue.is_pull_request());

        let plain: IssueItem =
            serde_json::from_value(serde_json::json!({"number": 4})).expect("decode issue");
        assert!(!plain.is_pull_request());
        assert!(plain.user.is_none());
    }

    #[test]
    fn rate_limit_response_decodes_core() {
        let body = serde_json::json!({
            "resources": {
                "core": {"limit": 5000, "used": 4990, "remaining": 10, "reset": 1700000000},
                "search": {"limit": 30, "used": 0, "remaining": 30, "reset": 1700000000}
            },
            "rate": {"limit": 5000, "used": 4990, "remaining": 10, "reset": 1700000000}
        });
        let parsed: RateLimitResponse = serde_json::from_value(body).expect("decode");
        assert_eq!(parsed.resources.core.remaining, 10);
        assert_eq!(parsed.resources.core.reset_at().timestamp(), 1_700_000_000);
    }
}
