//! Paging request/result types.

use crate::sql::Fragment;
use serde::Serialize;

/// A 1-based page request with an optional filter/ordering suffix.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
    pub filter: Option<Fragment>,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            filter: None,
        }
    }

    /// Restrict and order the rows; the same fragment drives the count query.
    pub fn filter(mut self, filter: impl Into<Fragment>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// One window of mapped rows.
///
/// Never absent: an empty window has empty `data`, and `total` is `Some(0)` when counted.
#[derive(Debug, Clone, Serialize)]
pub struct PageResult<T> {
    pub data: Vec<T>,
    /// Total rows matching the filter; `None` when counting was skipped.
    pub total: Option<u64>,
    pub page: u32,
    pub page_size: u32,
}

impl<T> PageResult<T> {
    /// Number of pages, if the total is known.
    pub fn total_pages(&self) -> Option<u64> {
        let size = u64::from(self.page_size.max(1));
        self.total.map(|t| t.div_ceil(size))
    }

    /// Whether a later page may hold rows.
    ///
    /// Without a total this only knows that the current window was full.
    pub fn has_next(&self) -> bool {
        match self.total {
            Some(total) => u64::from(self.page) * u64::from(self.page_size) < total,
            None => self.data.len() == self.page_size as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(len: usize, total: Option<u64>, page: u32) -> PageResult<usize> {
        PageResult {
            data: (0..len).collect(),
            total,
            page,
            page_size: 10,
        }
    }

    #[test]
    fn counted_pages() {
        let r = result(10, Some(25), 2);
        assert_eq!(r.total_pages(), Some(3));
        assert!(r.has_next());
        assert!(!result(5, Some(25), 3).has_next());
    }

    #[test]
    fn uncounted_pages_guess_from_window() {
        assert!(result(10, None, 1).has_next());
        assert!(!result(3, None, 1).has_next());
        assert_eq!(result(3, None, 1).total_pages(), None);
    }

    #[test]
    fn empty_result_is_not_absent() {
        let r = result(0, Some(0), 1);
        assert!(r.is_empty());
        assert_eq!(r.total_pages(), Some(0));
        assert_eq!(r.map(|x| x + 1).data, Vec::<usize>::new());
    }
}
