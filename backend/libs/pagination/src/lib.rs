//! Page query parsing and the paginated response envelope.

use serde::{Deserialize, Serialize};

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;
// Bounds page so offset arithmetic cannot overflow on adversarial input.
const MAX_PAGE: i64 = 1_000_000;

/// Zero-based page request, taken from query parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    pub page: i64,
    pub size: i64,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageQuery {
    /// Clamps out-of-range values instead of rejecting them.
    pub fn clamped(self) -> Self {
        Self {
            page: self.page.clamp(0, MAX_PAGE),
            size: self.size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn limit(&self) -> i64 {
        self.clamped().size
    }

    pub fn offset(&self) -> i64 {
        let q = self.clamped();
        q.page * q.size
    }
}

/// Paginated envelope: `{content[], pageNumber, pageSize, totalElements,
/// totalPages, first, last}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub page_number: i64,
    pub page_size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
    pub first: bool,
    pub last: bool,
}

impl<T> PageResponse<T> {
    pub fn new(content: Vec<T>, query: PageQuery, total_elements: i64) -> Self {
        let q = query.clamped();
        let total_pages = if total_elements == 0 {
            0
        } else {
            (total_elements + q.size - 1) / q.size
        };
        Self {
            content,
            page_number: q.page,
            page_size: q.size,
            total_elements,
            total_pages,
            first: q.page == 0,
            last: q.page + 1 >= total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResponse<U> {
        PageResponse {
            content: self.content.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            first: self.first,
            last: self.last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let q = PageQuery::default();
        assert_eq!(q.page, 0);
        assert_eq!(q.size, 10);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn clamping_bounds_page_and_size() {
        let q = PageQuery { page: -3, size: 0 }.clamped();
        assert_eq!((q.page, q.size), (0, 1));

        let q = PageQuery { page: 2, size: 500 }.clamped();
        assert_eq!((q.page, q.size), (2, 100));
    }

    #[test]
    fn extreme_page_values_do_not_overflow_offset() {
        let q = PageQuery {
            page: i64::MAX,
            size: i64::MAX,
        };
        assert_eq!(q.limit(), MAX_PAGE_SIZE);
        assert_eq!(q.offset(), MAX_PAGE * MAX_PAGE_SIZE);
    }

    #[test]
    fn offset_follows_page() {
        let q = PageQuery { page: 3, size: 20 };
        assert_eq!(q.offset(), 60);
        assert_eq!(q.limit(), 20);
    }

    #[test]
    fn page_math() {
        let page = PageResponse::new(vec![1, 2, 3], PageQuery { page: 0, size: 3 }, 7);
        assert_eq!(page.total_pages, 3);
        assert!(page.first);
        assert!(!page.last);

        let page = PageResponse::new(vec![7], PageQuery { page: 2, size: 3 }, 7);
        assert!(!page.first);
        assert!(page.last);
    }

    #[test]
    fn empty_result_is_first_and_last() {
        let page: PageResponse<i32> = PageResponse::new(vec![], PageQuery::default(), 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.first);
        assert!(page.last);
    }

    #[test]
    fn envelope_uses_camel_case() {
        let page = PageResponse::new(vec![1], PageQuery::default(), 1);
        let json = serde_json::to_value(&page).unwrap();
        assert!(json.get("pageNumber").is_some());
        assert!(json.get("pageSize").is_some());
        assert!(json.get("totalElements").is_some());
        assert!(json.get("totalPages").is_some());
    }
}
