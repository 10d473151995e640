//! Pagination query parameters and response metadata.

use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnError, DisplayFromStr, serde_as};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 10;
pub const MAX_PER_PAGE: i64 = 100;

/// Query string of list endpoints: `?page=2&perPage=20`.
///
/// Uses `serde_with` to parse numbers from query strings as integers.
/// Values that are not integers are treated as absent.
#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde_as(as = "DefaultOnError<Option<DisplayFromStr>>")]
    #[serde(default)]
    pub page: Option<i64>,

    #[serde_as(as = "DefaultOnError<Option<DisplayFromStr>>")]
    #[serde(default, rename = "perPage")]
    pub per_page: Option<i64>,
}

impl ListQuery {
    /// Effective `(page, per_page)`.
    ///
    /// Missing, malformed or non-positive values fall back to the defaults; `per_page` is
    /// capped at [`MAX_PER_PAGE`].
    pub fn resolve(&self) -> (i64, i64) {
        let page = self.page.filter(|p| *p >= 1).unwrap_or(DEFAULT_PAGE);
        let per_page = self
            .per_page
            .filter(|p| *p >= 1)
            .unwrap_or(DEFAULT_PER_PAGE)
            .min(MAX_PER_PAGE);

        (page, per_page)
    }
}

/// Pagination metadata attached to list responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub page_count: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    /// Zero when there is no next page.
    pub next_page: i64,
}

impl PageMeta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let per_page = per_page.max(1);
        let page_count = (total + per_page - 1) / per_page;
        let has_next_page = page < page_count;

        Self {
            page,
            per_page,
            total,
            page_count,
            has_next_page,
            has_prev_page: page > 1,
            next_page: if has_next_page { page + 1 } else { 0 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<i64>, per_page: Option<i64>) -> ListQuery {
        ListQuery { page, per_page }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(query(None, None).resolve(), (1, 10));
    }

    #[test]
    fn test_non_positive_values_fall_back() {
        assert_eq!(query(Some(0), Some(0)).resolve(), (1, 10));
        assert_eq!(query(Some(-3), Some(-1)).resolve(), (1, 10));
    }

    #[test]
    fn test_per_page_is_capped() {
        assert_eq!(query(Some(2), Some(500)).resolve(), (2, 100));
    }

    #[test]
    fn test_query_string_parsing() {
        let uri: axum::http::Uri = "/api/url?page=3&perPage=25".parse().unwrap();
        let axum::extract::Query(q) = axum::extract::Query::<ListQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(q.resolve(), (3, 25));
    }

    #[test]
    fn test_query_string_non_numbers_fall_back() {
        let uri: axum::http::Uri = "/api/url?page=abc&perPage=1.5".parse().unwrap();
        let axum::extract::Query(q) = axum::extract::Query::<ListQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(q.page, None);
        assert_eq!(q.resolve(), (1, 10));

        let uri: axum::http::Uri = "/api/url?page=x&perPage=20".parse().unwrap();
        let axum::extract::Query(q) = axum::extract::Query::<ListQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(q.resolve(), (1, 20));
    }

    #[test]
    fn test_meta_middle_page() {
        let meta = PageMeta::new(2, 10, 35);
        assert_eq!(meta.page_count, 4);
        assert!(meta.has_next_page);
        assert!(meta.has_prev_page);
        assert_eq!(meta.next_page, 3);
    }

    #[test]
    fn test_meta_last_page() {
        let meta = PageMeta::new(4, 10, 35);
        assert!(!meta.has_next_page);
        assert_eq!(meta.next_page, 0);
    }

    #[test]
    fn test_meta_empty() {
        let meta = PageMeta::new(1, 10, 0);
        assert_eq!(meta.page_count, 0);
        assert!(!meta.has_next_page);
        assert!(!meta.has_prev_page);
    }

    #[test]
    fn test_meta_serializes_camel_case() {
        let value = serde_json::to_value(PageMeta::new(1, 10, 11)).unwrap();
        assert_eq!(value["perPage"], 10);
        assert_eq!(value["pageCount"], 2);
        assert_eq!(value["hasNextPage"], true);
        assert_eq!(value["nextPage"], 2);
    }
}
