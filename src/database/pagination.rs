use serde::{Deserialize, Serialize};

use super::form::Form;
use crate::constants::MAX_PAGE_LIMIT;

/// Limit/offset window requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

impl PageRequest {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
            offset: offset.max(0),
        }
    }

    /// Reads `limit` and `offset`; missing or malformed values fall back to defaults.
    pub fn from_form(form: &Form, default_limit: i64) -> Self {
        let limit = form
            .get_optional_number::<i64>("limit")
            .ok()
            .flatten()
            .unwrap_or(default_limit);
        let offset = form
            .get_optional_number::<i64>("offset")
            .ok()
            .flatten()
            .unwrap_or(0);

        Self::new(limit, offset)
    }

    /// Total from the first row's windowed count. `None` for an empty page past
    /// the start, where the window never ran and the total must be counted apart.
    pub fn known_total(&self, first_count: Option<i64>) -> Option<i64> {
        match first_count {
            Some(count) => Some(count),
            None if self.offset == 0 => Some(0),
            None => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct PageContext<T> {
    pub count: i64,
    pub next_offset: Option<i64>,
    pub prev_offset: Option<i64>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page: PageRequest) -> Self {
        if rows.is_empty() && page.offset == 0 {
            return Self::no_rows();
        }

        let next_offset = if page.offset + page.limit < total_rows {
            Some(page.offset + page.limit)
        } else {
            None
        };
        let prev_offset = if page.offset > 0 {
            Some((page.offset - page.limit).max(0))
        } else {
            None
        };

        Self {
            count: total_rows,
            next_offset,
            prev_offset,
            results: rows,
        }
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next_offset: None,
            prev_offset: None,
            results: vec![],
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageContext<U> {
        PageContext {
            count: self.count,
            next_offset: self.next_offset,
            prev_offset: self.prev_offset,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn first_page_has_only_next() {
        let page = PageContext::from_rows(vec![1, 2, 3], 7, PageRequest::new(3, 0));

        assert_eq!(page.count, 7);
        assert_eq!(page.next_offset, Some(3));
        assert_eq!(page.prev_offset, None);
    }

    #[test]
    fn last_page_has_only_prev() {
        let page = PageContext::from_rows(vec![7], 7, PageRequest::new(3, 6));

        assert_eq!(page.next_offset, None);
        assert_eq!(page.prev_offset, Some(3));
    }

    #[test]
    fn prev_offset_never_goes_negative() {
        let page = PageContext::from_rows(vec![2, 3], 3, PageRequest::new(5, 1));

        assert_eq!(page.prev_offset, Some(0));
        assert_eq!(page.next_offset, None);
    }

    #[test]
    fn empty_first_page_is_no_rows() {
        let page: PageContext<i32> = PageContext::from_rows(vec![], 0, PageRequest::new(6, 0));
        assert_eq!(page, PageContext::no_rows());
    }

    #[test]
    fn total_is_unknown_past_the_end() {
        let page = PageRequest::new(6, 60);

        assert_eq!(page.known_total(Some(10)), Some(10));
        assert_eq!(page.known_total(None), None);
        assert_eq!(PageRequest::new(6, 0).known_total(None), Some(0));
    }

    #[test]
    fn page_past_the_end_keeps_the_real_count() {
        let page: PageContext<i32> = PageContext::from_rows(vec![], 10, PageRequest::new(6, 60));

        assert_eq!(page.count, 10);
        assert_eq!(page.next_offset, None);
        assert_eq!(page.prev_offset, Some(54));
        assert!(page.results.is_empty());
    }

    #[test]
    fn request_is_clamped() {
        assert_eq!(PageRequest::new(0, -4), PageRequest { limit: 1, offset: 0 });
        assert_eq!(PageRequest::new(10_000, 2).limit, MAX_PAGE_LIMIT);
    }

    #[test]
    fn request_reads_form_with_defaults() {
        let mut query = HashMap::new();
        query.insert("limit".to_string(), "2".to_string());
        query.insert("offset".to_string(), "oops".to_string());
        let form = Form::from_query(query);

        assert_eq!(PageRequest::from_form(&form, 6), PageRequest { limit: 2, offset: 0 });
    }
}
