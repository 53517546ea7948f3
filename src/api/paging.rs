use serde::{Deserialize, Serialize};

use crate::filter::Page;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_SIZE: i64 = 10;
pub const MAX_SIZE: i64 = 100;

pub fn default_page() -> i64 {
    DEFAULT_PAGE
}

pub fn default_size() -> i64 {
    DEFAULT_SIZE
}

/// Paging block of the response envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub page: i64,
    pub size: i64,
    pub total_item: i64,
    pub total_page: i64,
}

impl PageMetadata {
    pub fn new(page: Page, total_item: i64) -> Self {
        let total_page = if page.size > 0 {
            (total_item + page.size - 1) / page.size
        } else {
            0
        };
        Self {
            page: page.page,
            size: page.size,
            total_item,
            total_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_page_rounds_up() {
        assert_eq!(PageMetadata::new(Page::new(1, 10), 0).total_page, 0);
        assert_eq!(PageMetadata::new(Page::new(1, 10), 10).total_page, 1);
        assert_eq!(PageMetadata::new(Page::new(2, 10), 11).total_page, 2);
        assert_eq!(PageMetadata::new(Page::new(1, 3), 100).total_page, 34);
    }
}
