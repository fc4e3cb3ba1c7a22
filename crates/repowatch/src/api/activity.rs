//! The merged activity feed and the author list.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SubsecRound, Utc};
use serde::Deserialize;

use super::{AppState, error::ApiError};
use crate::activity;
use crate::store::{self, ActivityFilter, ActivityItem};

/// Query string of `GET /api/activity`.
///
/// - `repo=owner/name` selects one repository (`all` means no filter);
///   otherwise `repos=a/b,c/d` selects several.
/// - `username=x` selects one author; otherwise `users=x,y`.
/// - `dateRange` is `7d`, `30d`, `90d`, `all` or `custom`. Custom ranges
///   take `startDate`/`endDate` as RFC 3339 or `YYYY-MM-DD`; both bounds are
///   inclusive and a bare end date covers the whole day. Any other value
///   means `30d`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityParams {
    pub repo: Option<String>,
    pub repos: Option<String>,
    pub username: Option<String>,
    pub users: Option<String>,
    pub date_range: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn single_or_list(single: Option<&str>, list: Option<&str>, wildcard: Option<&str>) -> Vec<String> {
    match single.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) if Some(s) == wildcard => Vec::new(),
        Some(s) => vec![s.to_string()],
        None => list.map(split_list).unwrap_or_default(),
    }
}

/// Parse a date bound. A bare date is the start of that day, or its last
/// second when `end_of_day` is set.
fn parse_bound(raw: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).trunc_subsecs(0));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59)?
    } else {
        NaiveTime::MIN
    };
    Some(date.and_time(time).and_utc())
}

impl ActivityParams {
    /// Resolve into a store filter relative to `now`.
    pub fn into_filter(self, now: DateTime<Utc>) -> Result<ActivityFilter, ApiError> {
        let repositories = single_or_list(self.repo.as_deref(), self.repos.as_deref(), Some("all"));
        let authors = single_or_list(self.username.as_deref(), self.users.as_deref(), None);

        let (from, to) = match self.date_range.as_deref() {
            None | Some("all") => (None, None),
            Some("custom") => match (self.start_date.as_deref(), self.end_date.as_deref()) {
                (Some(start), Some(end)) => {
                    let from = parse_bound(start, false)
                        .ok_or_else(|| ApiError::BadRequest("Invalid startDate".to_string()))?;
                    let to = parse_bound(end, true)
                        .ok_or_else(|| ApiError::BadRequest("Invalid endDate".to_string()))?;
                    if from > to {
                        return Err(ApiError::BadRequest(
                            "startDate must not be after endDate".to_string(),
                        ));
                    }
                    (Some(from), Some(to))
                }
                _ => (None, None),
            },
            Some(range) => {
                let days = match range {
                    "7d" => 7,
                    "90d" => 90,
                    _ => 30,
                };
                (Some(now - Duration::days(days)), None)
            }
        };

        Ok(ActivityFilter {
            repositories,
            authors,
            from,
            to,
        })
    }
}

pub async fn feed(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ActivityParams>,
) -> Result<Json<Vec<ActivityItem>>, ApiError> {
    let filter = params.into_filter(activity::now())?;
    let items = store::activity(&state.db, &filter)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch activities", &e))?;
    Ok(Json(items))
}

/// Distinct commit authors, capped at [`store::MAX_AUTHORS`].
pub async fn users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    let authors = store::distinct_authors(&state.db)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch users", &e))?;
    Ok(Json(authors))
}
