//! Page requests and paginated results.

use serde::Serialize;

/// Upper bound for any page size, regardless of what the caller asks for
pub const MAX_PAGE_SIZE: u32 = 500;

/// Clamped page request, `page >= 1` and `1 <= page_size <= 500`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: page.clamp(1, u32::MAX as i64) as u32,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE as i64) as u32,
        }
    }

    /// Page request from loosely typed query parameters
    ///
    /// Unparseable values fall back to the given defaults.
    pub fn from_params(page: Option<&str>, page_size: Option<&str>, default_size: u32) -> Self {
        let parse = |value: Option<&str>| value.and_then(|v| v.trim().parse::<i64>().ok());
        Self::new(
            parse(page).unwrap_or(1),
            parse(page_size).unwrap_or(default_size as i64),
        )
    }

    pub fn first(page_size: u32) -> Self {
        Self::new(1, page_size as i64)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of rows to skip
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }

    pub fn limit(&self) -> u64 {
        self.page_size as u64
    }

    pub fn with_page(&self, page: u32) -> Self {
        Self::new(page as i64, self.page_size as i64)
    }
}

/// Pagination metadata of a result page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Size of the full filtered set
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(request: PageRequest, total: u64) -> Self {
        let total_pages = total.div_ceil(request.page_size() as u64);
        Self {
            total,
            page: request.page(),
            page_size: request.page_size(),
            total_pages,
            has_next: (request.page() as u64) < total_pages,
            has_prev: request.page() > 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult<T> {
    #[serde(rename = "data")]
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> PageResult<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            pagination: Pagination::new(request, total),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_is_clamped_to_one() {
        let request = PageRequest::new(-3, 10);
        assert_eq!(request.page(), 1);
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(PageRequest::new(1, 10_000).page_size(), MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(1, 0).page_size(), 1);
    }

    #[test]
    fn params_fall_back_to_defaults() {
        let request = PageRequest::from_params(Some("abc"), None, 200);
        assert_eq!(request, PageRequest::new(1, 200));

        let request = PageRequest::from_params(Some("3"), Some("501"), 200);
        assert_eq!(request.page(), 3);
        assert_eq!(request.page_size(), 500);
        assert_eq!(request.offset(), 1000);
    }

    #[test]
    fn total_pages_rounds_up() {
        for (total, size, pages) in [(0, 10, 0), (1, 10, 1), (10, 10, 1), (11, 10, 2), (3, 2, 2)] {
            let pagination = Pagination::new(PageRequest::new(1, size), total);
            assert_eq!(pagination.total_pages, pages, "total={total} size={size}");
            assert_eq!(pagination.has_next, 1 < pages);
        }
    }

    #[test]
    fn last_page_has_no_next() {
        let pagination = Pagination::new(PageRequest::new(2, 2), 3);
        assert!(!pagination.has_next);
        assert!(pagination.has_prev);
    }

    #[test]
    fn serialize_pagination() {
        let result = PageResult::new(vec![1, 2], PageRequest::new(1, 2), 3);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert_eq!(json["pagination"]["totalPages"], 2);
        assert_eq!(json["pagination"]["pageSize"], 2);
        assert_eq!(json["pagination"]["hasNext"], true);
    }
}
