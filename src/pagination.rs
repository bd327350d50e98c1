//! Page/pageSize query parameters pushed down to the store as LIMIT/OFFSET.

use serde::{Deserialize, Serialize};

pub const MAX_PAGE_SIZE: i64 = 100;
/// Highest page whose offset still fits in an `i64`.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;
/// Public post listings.
pub const POSTS_PAGE_SIZE: i64 = 9;
/// Admin lead tables.
pub const ADMIN_PAGE_SIZE: i64 = 10;

/// Query parameters shared by every list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn pagination(&self, default_size: i64) -> Pagination {
        Pagination::new(self.page.unwrap_or(1), self.page_size.unwrap_or(default_size))
    }

    /// Trimmed search term, `None` when blank.
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
}

impl Pagination {
    /// Clamps `page` to `1..=MAX_PAGE` and `page_size` to `1..=MAX_PAGE_SIZE`.
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: page.clamp(1, MAX_PAGE),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    /// Slice an already-ordered in-memory collection.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        items
            .iter()
            .skip(start)
            .take(self.page_size as usize)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: Pagination, total: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + pagination.page_size - 1) / pagination.page_size
        };
        Self {
            items,
            page: pagination.page,
            page_size: pagination.page_size,
            total,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_clamps() {
        let p = Pagination::new(0, 1000);
        assert_eq!(p.page, 1);
        assert_eq!(p.page_size, MAX_PAGE_SIZE);
        assert_eq!(Pagination::new(3, 0).page_size, 1);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let p = Pagination::new(i64::MAX, MAX_PAGE_SIZE);
        assert_eq!(p.page, MAX_PAGE);
        assert!(p.offset() > 0);
        assert!(p.slice(&[1, 2, 3]).is_empty());
    }

    #[test]
    fn test_offset_and_slice() {
        let items: Vec<i32> = (1..=20).collect();
        let p = Pagination::new(3, 9);
        assert_eq!(p.offset(), 18);
        assert_eq!(p.slice(&items), vec![19, 20]);
        assert!(Pagination::new(5, 9).slice(&items).is_empty());
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page = Page::new(vec![1, 2], Pagination::new(1, 9), 19);
        assert_eq!(page.total_pages, 3);
        let empty: Page<i32> = Page::new(vec![], Pagination::new(1, 9), 0);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_search_term_trims_blank() {
        let q = ListQuery {
            search: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(q.search_term(), None);
        assert_eq!(q.pagination(ADMIN_PAGE_SIZE).page_size, ADMIN_PAGE_SIZE);
    }
}
