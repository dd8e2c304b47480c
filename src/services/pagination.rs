//! Uniform pagination: page/page_size windowing with an over-fetch-by-one
//! `has_more` flag.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// A pagination window bound from the query string.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Page {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for Page {
    fn default() -> Self {
        Page {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl Page {
    pub fn new(page: i64, page_size: i64) -> Self {
        Page { page, page_size }.clamped()
    }

    /// Clamp out-of-range values instead of rejecting them.
    pub fn clamped(self) -> Self {
        Page {
            page: self.page.max(1),
            page_size: self.page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Rows to skip before this window. Saturates so an absurd page number
    /// from the query string yields an empty window instead of overflowing.
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size) as u64
    }

    /// Fetch one extra row to detect whether more results exist.
    pub fn fetch_limit(&self) -> i64 {
        self.page_size + 1
    }

    /// Trim an over-fetched row set to the window, reporting `has_more`.
    pub fn window<T>(&self, mut rows: Vec<T>) -> (Vec<T>, bool) {
        let has_more = rows.len() as i64 > self.page_size;
        rows.truncate(self.page_size as usize);
        (rows, has_more)
    }

    pub fn meta(&self, total: i64, has_more: bool) -> PageMeta {
        PageMeta {
            page: self.page,
            page_size: self.page_size,
            total,
            has_more,
        }
    }
}

/// Pagination block of the response envelope.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PageMeta {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub has_more: bool,
}

impl PageMeta {
    /// Metadata for a fully-materialized listing: `total` is the
    /// materialized length and the whole set fits in one page.
    pub fn materialized(len: usize) -> Self {
        PageMeta {
            page: 1,
            page_size: len as i64,
            total: len as i64,
            has_more: false,
        }
    }
}
