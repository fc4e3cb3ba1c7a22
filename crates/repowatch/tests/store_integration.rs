//! Store operations against an in-memory SQLite database.
//!
//! These tests require the `sqlite` and `migrate` features to be enabled.

#![cfg(all(feature = "sqlite", feature = "migrate"))]

use chrono::{DateTime, Duration, TimeZone, Utc};
use repowatch::activity::{NewCommit, NewIssue, NewPullRequest, NewReview};
use repowatch::entity::PullRequestState;
use repowatch::store::{
    self, ActivityFilter, REVIEW_INSERT_BATCH_SIZE, Watermarks, insert_with_fallback,
};
use repowatch::{RecordKind, connect_and_migrate};
use sea_orm::DatabaseConnection;

/// Create an in-memory SQLite database with migrations applied.
async fn setup_test_db() -> DatabaseConnection {
    connect_and_migrate("sqlite::memory:")
        .await
        .expect("Failed to create test database")
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
}

fn commit(repository_id: i32, sha: &str, author: &str, committed_at: DateTime<Utc>) -> NewCommit {
    NewCommit {
        repository_id,
        sha: Some(sha.to_string()),
        message: format!("commit {sha}"),
        author: author.to_string(),
        committed_at,
        branch: "main".to_string(),
    }
}

fn review(repository_id: i32, review_id: i64, submitted_at: DateTime<Utc>) -> NewReview {
    NewReview {
        repository_id,
        review_id,
        pr_number: 1,
        author: "erin".to_string(),
        comment: "LGTM".to_string(),
        submitted_at,
    }
}

async fn insert_commits(db: &DatabaseConnection, commits: Vec<NewCommit>) {
    let models = commits.into_iter().map(|c| c.into_active_model(at(31, 0))).collect();
    let outcome = insert_with_fallback(db, RecordKind::Commit, models, 500).await;
    assert_eq!(outcome.failed, 0);
}

#[tokio::test]
async fn get_or_create_is_idempotent() {
    let db = setup_test_db().await;

    let first = store::get_or_create(&db, "o/r").await.expect("create");
    let again = store::get_or_create(&db, "o/r").await.expect("find");
    assert_eq!(first, again);
    assert_eq!(store::list(&db).await.expect("list").len(), 1);
}

#[tokio::test]
async fn duplicate_review_in_a_batch_costs_only_itself() {
    let db = setup_test_db().await;
    let repo = store::get_or_create(&db, "o/r").await.expect("create");

    // ids 1..=19 plus a second copy of 7
    let mut reviews: Vec<_> = (1..=19).map(|id| review(repo.id, id, at(10, 0))).collect();
    reviews.push(review(repo.id, 7, at(10, 1)));
    let models = reviews.into_iter().map(|r| r.into_active_model(at(31, 0))).collect();

    let outcome = insert_with_fallback(&db, RecordKind::Review, models, REVIEW_INSERT_BATCH_SIZE).await;
    assert_eq!((outcome.inserted, outcome.failed), (19, 1));

    let stats = store::repository_stats(&db, repo.id).await.expect("stats");
    assert_eq!(stats.reviews, 19);
}

#[tokio::test]
async fn prune_keeps_rows_exactly_at_the_cutoff() {
    let db = setup_test_db().await;
    let repo = store::get_or_create(&db, "o/r").await.expect("create");
    let cutoff = at(10, 12);

    insert_commits(
        &db,
        vec![
            commit(repo.id, "before", "ada", cutoff - Duration::seconds(1)),
            commit(repo.id, "exact", "ada", cutoff),
            commit(repo.id, "after", "ada", cutoff + Duration::seconds(1)),
        ],
    )
    .await;

    let report = store::prune_older_than(&db, repo.id, cutoff).await.expect("prune");
    assert_eq!(report.commits, 1);
    assert_eq!(report.total(), 1);
    assert_eq!(store::repository_stats(&db, repo.id).await.expect("stats").commits, 2);
}

#[tokio::test]
async fn prune_only_touches_the_given_repository() {
    let db = setup_test_db().await;
    let a = store::get_or_create(&db, "o/a").await.expect("create");
    let b = store::get_or_create(&db, "o/b").await.expect("create");
    insert_commits(
        &db,
        vec![commit(a.id, "1", "ada", at(1, 0)), commit(b.id, "2", "ada", at(1, 0))],
    )
    .await;

    store::prune_older_than(&db, a.id, at(20, 0)).await.expect("prune");
    assert_eq!(store::repository_stats(&db, a.id).await.expect("stats").commits, 0);
    assert_eq!(store::repository_stats(&db, b.id).await.expect("stats").commits, 1);
}

#[tokio::test]
async fn watermarks_never_exceed_the_retention_floor() {
    let db = setup_test_db().await;
    let repo = store::get_or_create(&db, "o/r").await.expect("create");
    let now = at(31, 0);
    let floor = now - Duration::days(30);

    // one recent commit, one issue older than the floor
    insert_commits(&db, vec![commit(repo.id, "a", "ada", now - Duration::days(2))]).await;
    let stale = NewIssue {
        repository_id: repo.id,
        number: 4,
        title: "Stale".to_string(),
        author: "carol".to_string(),
        created_at: floor - Duration::days(5),
    };
    let outcome =
        insert_with_fallback(&db, RecordKind::Issue, vec![stale.into_active_model(now)], 500).await;
    assert_eq!(outcome.inserted, 1);

    let marks = Watermarks::load(&db, repo.id, now, 30).await.expect("watermarks");
    assert_eq!(marks.commits, floor);
    assert_eq!(marks.issues, floor - Duration::days(5));
    assert_eq!(marks.pull_requests, floor);
    assert_eq!(marks.for_kind(RecordKind::Review), floor);
}

#[tokio::test]
async fn activity_filters_and_orders_newest_first() {
    let db = setup_test_db().await;
    let a = store::get_or_create(&db, "o/a").await.expect("create");
    let b = store::get_or_create(&db, "o/b").await.expect("create");

    insert_commits(
        &db,
        vec![
            commit(a.id, "1", "ada", at(5, 0)),
            commit(a.id, "2", "bob", at(7, 0)),
            commit(b.id, "3", "ada", at(6, 0)),
        ],
    )
    .await;
    let pr = NewPullRequest {
        repository_id: a.id,
        number: 1,
        title: "Feature".to_string(),
        author: "ada".to_string(),
        state: PullRequestState::Open,
        created_at: at(8, 0),
        updated_at: at(8, 0),
    };
    let outcome = insert_with_fallback(
        &db,
        RecordKind::PullRequest,
        vec![pr.into_active_model(at(31, 0))],
        500,
    )
    .await;
    assert_eq!(outcome.inserted, 1);

    let everything = store::activity(&db, &ActivityFilter::default()).await.expect("feed");
    let stamps: Vec<_> = everything.iter().map(|i| i.created_at).collect();
    assert_eq!(stamps, [at(8, 0), at(7, 0), at(6, 0), at(5, 0)]);
    assert_eq!(everything[0].kind, RecordKind::PullRequest);
    assert_eq!(everything[0].state, Some(PullRequestState::Open));
    assert_eq!(everything[1].branch.as_deref(), Some("main"));

    let filter = ActivityFilter {
        repositories: vec!["o/a".to_string()],
        authors: vec!["ada".to_string()],
        from: Some(at(5, 0)),
        to: Some(at(7, 0)),
    };
    let narrowed = store::activity(&db, &filter).await.expect("feed");
    assert_eq!(narrowed.len(), 1);
    assert_eq!(narrowed[0].repo_name, "o/a");
    assert_eq!(narrowed[0].created_at, at(5, 0));

    let unknown = ActivityFilter {
        repositories: vec!["o/none".to_string()],
        ..ActivityFilter::default()
    };
    assert!(store::activity(&db, &unknown).await.expect("feed").is_empty());
}

#[tokio::test]
async fn authors_are_distinct_and_sorted() {
    let db = setup_test_db().await;
    let repo = store::get_or_create(&db, "o/r").await.expect("create");
    insert_commits(
        &db,
        vec![
            commit(repo.id, "1", "zed", at(1, 0)),
            commit(repo.id, "2", "ada", at(2, 0)),
            commit(repo.id, "3", "zed", at(3, 0)),
        ],
    )
    .await;

    assert_eq!(store::distinct_authors(&db).await.expect("authors"), ["ada", "zed"]);
}

#[tokio::test]
async fn legacy_duplicates_collapse_to_the_lowest_id() {
    let db = setup_test_db().await;
    let repo = store::get_or_create(&db, "o/r").await.expect("create");
    let twin = commit(repo.id, "abc", "ada", at(3, 0));
    insert_commits(&db, vec![twin.clone(), twin.clone(), twin]).await;

    let deleted = store::collapse_kind(&db, repo.id, RecordKind::Commit)
        .await
        .expect("collapse");
    assert_eq!(deleted, 2);

    let feed = store::activity(&db, &ActivityFilter::default()).await.expect("feed");
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].id, 1);
}
