//! Conversion from GitHub payloads to activity records.

use crate::activity::{NewCommit, NewIssue, NewPullRequest, NewReview, normalize_timestamp};
use crate::entity::pull_request_state::PullRequestState;

use super::types::{Account, CommitItem, IssueItem, PullItem, ReviewItem};

/// Author used when upstream omits one.
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// Comment stored for reviews submitted without a body.
pub const EMPTY_REVIEW_COMMENT: &str = "No comment";

fn login(user: Option<&Account>) -> String {
    user.map(|u| u.login.clone())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
}

/// Commit listed on `branch`. The author is the git author name, falling back
/// to the linked account login.
pub fn to_new_commit(item: &CommitItem, repository_id: i32, branch: &str) -> NewCommit {
    let signature = item.commit.author.as_ref();
    let author = signature
        .and_then(|s| s.name.clone())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| login(item.author.as_ref()));

    NewCommit {
        repository_id,
        sha: Some(item.sha.clone()).filter(|s| !s.is_empty()),
        message: item.commit.message.clone(),
        author,
        committed_at: normalize_timestamp(signature.and_then(|s| s.date.as_deref())),
        branch: branch.to_string(),
    }
}

pub fn to_new_pull_request(item: &PullItem, repository_id: i32) -> NewPullRequest {
    NewPullRequest {
        repository_id,
        number: item.number,
        title: item.title.clone().unwrap_or_default(),
        author: login(item.user.as_ref()),
        state: PullRequestState::from_upstream(&item.state),
        created_at: normalize_timestamp(item.created_at.as_deref()),
        updated_at: normalize_timestamp(item.updated_at.as_deref()),
    }
}

/// `None` for pull requests surfaced through the issues endpoint.
pub fn to_new_issue(item: &IssueItem, repository_id: i32) -> Option<NewIssue> {
    if item.is_pull_request() {
        return None;
    }
    Some(NewIssue {
        repository_id,
        number: item.number,
        title: item.title.clone().unwrap_or_default(),
        author: login(item.user.as_ref()),
        created_at: normalize_timestamp(item.created_at.as_deref()),
    })
}

pub fn to_new_review(item: &ReviewItem, repository_id: i32, pr_number: i64) -> NewReview {
    let comment = item
        .body
        .as_deref()
        .filter(|b| !b.is_empty())
        .unwrap_or(EMPTY_REVIEW_COMMENT)
        .to_string();

    NewReview {
        repository_id,
        review_id: item.id,
        pr_number,
        author: login(item.user.as_ref()),
        comment,
        submitted_at: normalize_timestamp(item.submitted_at.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn commit_uses_git_author_name_and_date() {
        let item: CommitItem = serde_json::from_value(json!({
            "sha": "abc123",
            "commit": {
                "message": "Fix the thing",
                "author": {"name": "Ada", "date": "2024-01-01T00:00:00Z"}
            },
            "author": {"login": "ada-gh"}
        }))
        .expect("decode");

        let commit = to_new_commit(&item, 9, "main");
        assert_eq!(commit.repository_id, 9);
        assert_eq!(commit.sha.as_deref(), Some("abc123"));
        assert_eq!(commit.author, "Ada");
        assert_eq!(commit.branch, "main");
        assert_eq!(
            commit.committed_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn commit_author_falls_back_to_login_then_unknown() {
        let with_login: CommitItem = serde_json::from_value(json!({
            "sha": "a",
            "commit": {"message": "m"},
            "author": {"login": "octocat"}
        }))
        .expect("decode");
        assert_eq!(to_new_commit(&with_login, 1, "main").author, "octocat");

        let anonymous: CommitItem =
            serde_json::from_value(json!({"sha": "b", "commit": {"message": "m"}}))
                .expect("decode");
        assert_eq!(to_new_commit(&anonymous, 1, "main").author, UNKNOWN_AUTHOR);
    }

    #[test]
    fn issue_conversion_skips_pull_requests() {
        let pr: IssueItem = serde_json::from_value(json!({
            "number": 1, "title": "t", "pull_request": {}
        }))
        .expect("decode");
        assert!(to_new_issue(&pr, 1).is_none());

        let issue: IssueItem = serde_json::from_value(json!({
            "number": 2, "title": "Bug", "user": {"login": "a"},
            "created_at": "2024-05-01T10:00:00+00:00"
        }))
        .expect("decode");
        let converted = to_new_issue(&issue, 1).expect("issue");
        assert_eq!(converted.number, 2);
        assert_eq!(converted.author, "a");
    }

    #[test]
    fn review_without_body_gets_placeholder() {
        let item: ReviewItem = serde_json::from_value(json!({
            "id": 55, "body": "", "user": {"login": "rev"},
            "submitted_at": "2024-05-01T10:00:00Z"
        }))
        .expect("decode");
        let review = to_new_review(&item, 3, 12);
        assert_eq!(review.comment, EMPTY_REVIEW_COMMENT);
        assert_eq!(review.pr_number, 12);
        assert_eq!(review.review_id, 55);

        let missing: ReviewItem = serde_json::from_value(json!({
            "id": 56, "user": {"login": "rev"}, "submitted_at": "2024-05-01T10:00:00Z"
        }))
        .expect("decode");
        assert_eq!(to_new_review(&missing, 3, 12).comment, EMPTY_REVIEW_COMMENT);
    }

    #[test]
    fn review_body_is_stored_verbatim() {
        let item: ReviewItem = serde_json::from_value(json!({
            "id": 57, "body": "  nit: spacing\n", "user": {"login": "rev"},
            "submitted_at": "2024-05-01T10:00:00Z"
        }))
        .expect("decode");
        assert_eq!(to_new_review(&item, 3, 12).comment, "  nit: spacing\n");

        let blank: ReviewItem = serde_json::from_value(json!({
            "id": 58, "body": "   ", "user": {"login": "rev"},
            "submitted_at": "2024-05-01T10:00:00Z"
        }))
        .expect("decode");
        assert_eq!(to_new_review(&blank, 3, 12).comment, "   ");
    }

    #[test]
    fn pull_request_state_and_times() {
        let item: PullItem = serde_json::from_value(json!({
            "number": 8, "title": "Add", "state": "closed", "user": null,
            "created_at": "2024-05-01T10:00:00Z", "updated_at": "2024-05-02T10:00:00Z"
        }))
        .expect("decode");
        let pr = to_new_pull_request(&item, 1);
        assert_eq!(pr.state, PullRequestState::Closed);
        assert_eq!(pr.author, UNKNOWN_AUTHOR);
        assert!(pr.updated_at > pr.created_at);
    }
}
