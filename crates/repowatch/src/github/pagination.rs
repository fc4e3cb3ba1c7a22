//! Page-number pagination over collection endpoints.

use serde::de::DeserializeOwned;

use super::client::GitHubClient;
use super::error::FetchError;

/// Fixed page size for every collection request.
pub const PAGE_SIZE: usize = 100;

/// Everything fetched for one collection, in arrival order.
///
/// A collection whose fetch hit a terminal error still carries the pages
/// gathered before it; `error` records why it stopped early.
#[derive(Debug)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    /// Number of pages that returned successfully.
    pub pages: u32,
    pub error: Option<FetchError>,
}

impl<T> Paginated<T> {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Fetch `path` page by page (`per_page=100`, `page=1,2,...`) until a page
/// comes back empty or short, or the fetcher gives up.
///
/// Never fails: a terminal fetch error ends the loop and is reported on the
/// result alongside whatever was accumulated.
pub async fn fetch_all<T: DeserializeOwned>(
    client: &GitHubClient,
    path: &str,
    params: &[(&str, String)],
) -> Paginated<T> {
    let mut items: Vec<T> = Vec::new();
    let mut page: u32 = 1;

    loop {
        let query = page_query(params, page);

        match client.get_json::<Vec<T>>(path, &query).await {
            Ok(batch) => {
                let count = batch.len();
                items.extend(batch);
                tracing::debug!(path, page, count, total_so_far = items.len(), "Fetched page");

                if count < PAGE_SIZE {
                    return Paginated {
                        items,
                        pages: page,
                        error: None,
                    };
                }
                page += 1;
            }
            Err(e) => {
                tracing::warn!(
                    path,
                    page,
                    kept = items.len(),
                    error = %e,
                    "Page fetch failed, keeping partial results"
                );
                return Paginated {
                    items,
                    pages: page - 1,
                    error: Some(e),
                };
            }
        }
    }
}

/// Query for one page: `params` followed by `per_page` and `page`.
pub fn page_query<'a>(params: &[(&'a str, String)], page: u32) -> Vec<(&'a str, String)> {
    let mut query = params.to_vec();
    query.push(("per_page", PAGE_SIZE.to_string()));
    query.push(("page", page.to_string()));
    query
}
