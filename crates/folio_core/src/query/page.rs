//! Page-number pagination.

use crate::error::{CoreError, CoreResult};
use crate::query::ParamLookup;
use serde::Serialize;

pub const PAGE_PARAM: &str = "page";
pub const PAGE_SIZE_PARAM: &str = "page_size";

/// Requested slice of a listing; `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    /// Reads `page` and `page_size`; a zero or missing size means `default_size`,
    /// sizes above `max_size` are clamped.
    pub fn from_params<P>(params: &P, default_size: u32, max_size: u32) -> CoreResult<Self>
    where
        P: ParamLookup + ?Sized,
    {
        let page = parse_u32(params, PAGE_PARAM)?.unwrap_or(1);
        if page == 0 {
            return Err(CoreError::validation(PAGE_PARAM, "pages start at 1"));
        }
        let page_size = match parse_u32(params, PAGE_SIZE_PARAM)? {
            None | Some(0) => default_size,
            Some(size) => size.min(max_size),
        };
        Ok(Self::new(page, page_size))
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }
}

fn parse_u32<P>(params: &P, key: &str) -> CoreResult<Option<u32>>
where
    P: ParamLookup + ?Sized,
{
    match params.lookup(key).map(str::trim).filter(|raw| !raw.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<u32>()
            .map(Some)
            .map_err(|_| CoreError::validation(key, "expected a positive whole number")),
    }
}

/// One page of a listing plus the unpaged total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        u64::from(self.page) * u64::from(self.page_size) < self.total_count
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Page, PageRequest};
    use crate::query::query_params;

    #[test]
    fn defaults_apply_when_params_absent_or_zero() {
        let request = PageRequest::from_params(&query_params::<&str, &str>([]), 10, 50)
            .expect("defaults");
        assert_eq!(request, PageRequest::new(1, 10));

        let zero = PageRequest::from_params(&query_params([("page_size", "0")]), 10, 50)
            .expect("zero size");
        assert_eq!(zero.page_size, 10);
    }

    #[test]
    fn page_size_is_clamped_and_offset_follows_page() {
        let request = PageRequest::from_params(
            &query_params([("page", "3"), ("page_size", "500")]),
            10,
            50,
        )
        .expect("clamped");
        assert_eq!(request.page_size, 50);
        assert_eq!(request.offset(), 100);
        assert_eq!(request.limit(), 50);
    }

    #[test]
    fn malformed_paging_values_are_validation_errors() {
        for pairs in [[("page", "two")], [("page", "0")], [("page_size", "-1")]] {
            let err = PageRequest::from_params(&query_params(pairs), 10, 50)
                .expect_err("must fail");
            assert_eq!(err.status_code(), 400);
        }
    }

    #[test]
    fn has_next_compares_against_total() {
        let page = Page {
            items: vec![1, 2],
            total_count: 3,
            page: 1,
            page_size: 2,
        };
        assert!(page.has_next());
        let last = page.map(|n| n * 10);
        assert_eq!(last.items, vec![10, 20]);
        let tail: Page<u8> = Page {
            items: vec![7],
            total_count: 3,
            page: 2,
            page_size: 2,
        };
        assert!(!tail.has_next());
    }
}
