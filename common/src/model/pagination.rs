//! The generic paginated-list shape (spec §4.B, §6, §9). A single
//! parametric container covers every listing operation; no per-entity
//! duplication and no runtime reflection.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self { page, page_size }
    }

    pub fn page(&self) -> u64 {
        if self.page <= 0 {
            1
        } else {
            self.page as u64
        }
    }

    pub fn page_size(&self) -> u64 {
        if self.page_size <= 0 {
            20
        } else if self.page_size > 100 {
            100
        } else {
            self.page_size as u64
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page() - 1) * self.page_size()
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let page = request.page();
        let page_size = request.page_size();
        let total_pages = if total == 0 { 0 } else { total.div_ceil(page_size) };
        Self { items, total, page, page_size, total_pages }
    }

    pub fn empty(request: PageRequest) -> Self {
        Self::new(Vec::new(), 0, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_clamping() {
        assert_eq!(PageRequest::new(0, 20).page(), 1);
        assert_eq!(PageRequest::new(1, 0).page_size(), 20);
        assert_eq!(PageRequest::new(1, 101).page_size(), 100);
        assert_eq!(PageRequest::new(1, -5).page_size(), 20);
    }

    #[test]
    fn total_pages_is_ceil_division() {
        let page: Page<i32> = Page::new(vec![], 101, PageRequest::new(1, 20));
        assert_eq!(page.total_pages, 6);
    }

    #[test]
    fn empty_total_has_zero_pages() {
        let page: Page<i32> = Page::empty(PageRequest::new(1, 20));
        assert_eq!(page.total_pages, 0);
    }
}
