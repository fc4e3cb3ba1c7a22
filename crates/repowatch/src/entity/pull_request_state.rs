//! Pull request state enum.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PullRequestState {
    #[sea_orm(string_value = "open")]
    #[default]
    Open,
    #[sea_orm(string_value = "closed")]
    Closed,
}

impl PullRequestState {
    /// Value of the `state` query parameter for the pulls endpoint.
    pub fn as_query(self) -> &'static str {
        match self {
            PullRequestState::Open => "open",
            PullRequestState::Closed => "closed",
        }
    }

    /// Parse an upstream state string. Anything other than `open` is closed
    /// (merged PRs report `closed`).
    pub fn from_upstream(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("open") {
            PullRequestState::Open
        } else {
            PullRequestState::Closed
        }
    }
}

impl std::fmt::Display for PullRequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_query())
    }
}
