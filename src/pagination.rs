//! `page`/`limit` query parameters, 1-indexed.

use serde::Deserialize;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Raw query params. Kept as strings so malformed values fall back to defaults instead of rejecting.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl From<PageParams> for Pagination {
    fn from(p: PageParams) -> Self {
        let page = p
            .page
            .as_deref()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|n| *n >= 1)
            .unwrap_or(DEFAULT_PAGE);
        let limit = p
            .limit
            .as_deref()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|n| *n >= 1)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);
        Pagination { page, limit }
    }
}

impl Pagination {
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }

    pub fn limit_i64(&self) -> i64 {
        self.limit as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<&str>, limit: Option<&str>) -> PageParams {
        PageParams {
            page: page.map(String::from),
            limit: limit.map(String::from),
        }
    }

    #[test]
    fn defaults_when_absent_or_malformed() {
        assert_eq!(Pagination::from(params(None, None)), Pagination { page: 1, limit: 10 });
        assert_eq!(Pagination::from(params(Some("abc"), Some("0"))), Pagination { page: 1, limit: 10 });
        assert_eq!(Pagination::from(params(Some("-2"), None)), Pagination { page: 1, limit: 10 });
    }

    #[test]
    fn limit_is_capped_and_offset_is_zero_based() {
        let p = Pagination::from(params(Some("3"), Some("500")));
        assert_eq!(p.limit, MAX_LIMIT);
        assert_eq!(p.offset(), 200);
        assert_eq!(Pagination::from(params(Some("1"), Some("25"))).offset(), 0);
    }
}
