//! Listing filters and page walking.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::{error::DvlsResult, response::Paginated, transport::AuthenticatedTransport};

const PATH_SEPARATOR: char = '\\';

/// Filters for listing entries of a vault.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetEntriesOptions {
    /// Exact entry name
    pub name: Option<String>,
    /// Folder path; entries in sub-folders match as well
    pub path: Option<String>,
}

impl GetEntriesOptions {
    /// Only entries named exactly `name`.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Only entries under `path`.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Whether an entry with this name and folder path passes the filters.
    #[must_use]
    pub fn matches(&self, name: &str, path: &str) -> bool {
        self.name.as_deref().is_none_or(|n| n == name)
            && self.path.as_deref().is_none_or(|p| path_matches(p, path))
    }
}

/// Extra constraints for a lookup by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetByNameOptions {
    /// Folder path; entries in sub-folders match as well
    pub path: Option<String>,
}

/// Whether `path` is `filter` or lies below it. An empty filter matches
/// everything.
pub(crate) fn path_matches(filter: &str, path: &str) -> bool {
    let filter = filter.trim_end_matches(PATH_SEPARATOR);
    if filter.is_empty() || path == filter {
        return true;
    }
    path.strip_prefix(filter)
        .is_some_and(|rest| rest.starts_with(PATH_SEPARATOR))
}

/// Request every page of a paginated listing, starting at page 1.
pub(crate) async fn fetch_all_pages<T: DeserializeOwned>(
    transport: &AuthenticatedTransport,
    url: &Url,
) -> DvlsResult<Vec<T>> {
    let mut items = Vec::new();
    let mut page_number: u32 = 1;

    loop {
        let mut page_url = url.clone();
        page_url
            .query_pairs_mut()
            .append_pair("pageNumber", &page_number.to_string());

        let page: Paginated<T> = transport.get_json(page_url).await?;
        debug!(
            page = page_number,
            total_page = page.total_page,
            count = page.data.len(),
            "Fetched listing page"
        );

        let has_next = page.has_next() && page_number < page.total_page;
        items.extend(page.data);
        if !has_next {
            break;
        }
        page_number += 1;
    }

    Ok(items)
}

/// Drop items whose key was already seen, keeping the first occurrence.
/// Items with an empty key are always kept.
pub(crate) fn dedup_by_key<T, F>(items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> String,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            let key = key(item);
            key.is_empty() || seen.insert(key)
        })
        .collect()
}
