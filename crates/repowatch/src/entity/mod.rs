//! SeaORM entity definitions for the repowatch schema.

pub mod commit;
pub mod issue;
pub mod prelude;
pub mod pull_request;
pub mod pull_request_state;
pub mod repository;
pub mod review;

pub use pull_request_state::PullRequestState;
