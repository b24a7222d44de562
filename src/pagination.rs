//! This module defines the common functionality for paging data.

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of transactions per page when not specified in a request.
    pub default_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 10,
        }
    }
}

/// The number of pages needed to show `count` records at `per_page` records
/// per page.
///
/// Zero records means zero pages; this is the convention the listing endpoint
/// reports as `totalPages`.
pub fn total_pages(count: u64, per_page: u64) -> u64 {
    count.div_ceil(per_page.max(1))
}
