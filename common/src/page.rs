//! Pagination for list surfaces.

use serde::{Deserialize, Serialize};

/// One page of a larger result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: usize,
    /// Page size requested.
    pub limit: usize,
    /// Total items across all pages.
    pub total: usize,
}

impl<T> Page<T> {
    /// Create a new page.
    pub fn new(items: Vec<T>, page: usize, limit: usize, total: usize) -> Self {
        Self {
            items,
            page,
            limit,
            total,
        }
    }

    /// Total number of pages.
    pub fn total_pages(&self) -> usize {
        if self.limit == 0 {
            0
        } else {
            self.total.div_ceil(self.limit)
        }
    }

    /// Check if there is a page after this one.
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}
