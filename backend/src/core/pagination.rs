use serde::Serialize;

pub const MAX_PAGE_LIMIT: i64 = 100;

/// Highest page number accepted; keeps `offset` within `i64`.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_LIMIT;

/// Resolved page window for a listing query.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Lenient parsing: unparsable or missing values fall back to defaults,
    /// `page` is clamped to `1..=MAX_PAGE` and `limit` to `1..=MAX_PAGE_LIMIT`.
    #[must_use]
    pub fn from_query(page: Option<&str>, limit: Option<&str>, default_limit: i64) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1)
            .min(MAX_PAGE);
        let limit = limit
            .and_then(|l| l.trim().parse::<i64>().ok())
            .filter(|l| *l >= 1)
            .unwrap_or(default_limit)
            .min(MAX_PAGE_LIMIT);
        Self { page, limit }
    }

    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
    pub pagination: Pagination,
}

impl<T: Serialize> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let total_pages = (total + request.limit - 1) / request.limit;
        Self {
            items,
            total,
            pagination: Pagination {
                current_page: request.page,
                total_pages,
                limit: request.limit,
            },
        }
    }
}
