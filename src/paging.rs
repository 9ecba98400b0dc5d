//! Offset pagination over a collection.

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Zero-based page of a fixed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self { page, page_size }
    }

    pub fn skip(&self) -> u64 {
        self.page.saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::try_from(self.page_size).unwrap_or(i64::MAX)
    }
}

/// Position of a page within a collection of `total` documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl PageInfo {
    pub fn new(request: PageRequest, total: u64) -> Self {
        let total_pages = if request.page_size == 0 {
            0
        } else {
            total.div_ceil(request.page_size)
        };

        Self {
            page: request.page,
            page_size: request.page_size,
            total,
            total_pages,
            has_previous: request.page > 0,
            has_next: request
                .page
                .saturating_add(1)
                .saturating_mul(request.page_size)
                < total,
        }
    }

    /// Navigation is only worth showing when the documents span several pages.
    pub fn is_paginated(&self) -> bool {
        self.total > self.page_size
    }

    /// `Page N of M`, only when there is more than one page to navigate.
    pub fn label(&self) -> Option<String> {
        self.is_paginated()
            .then(|| format!("Page {} of {}", self.page.saturating_add(1), self.total_pages))
    }
}
