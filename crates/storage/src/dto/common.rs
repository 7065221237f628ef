use serde::Deserialize;
use utoipa::IntoParams;

pub const DEFAULT_EVENTS_PAGE_SIZE: i64 = 20;
pub const DEFAULT_PARTICIPANTS_PAGE_SIZE: i64 = 200;
pub const MAX_PAGE_SIZE: i64 = 1000;

#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// 1-indexed page number, defaults to 1
    pub page: Option<i64>,
    /// Page size, capped at 1000
    pub limit: Option<i64>,
}

impl PaginationParams {
    /// Out of range values fall back to the defaults instead of failing.
    pub fn resolve(&self, default_limit: i64) -> Page {
        let page = self.page.filter(|p| *p >= 1).unwrap_or(1);
        let limit = self
            .limit
            .filter(|l| *l >= 1)
            .unwrap_or(default_limit)
            .min(MAX_PAGE_SIZE);

        Page { page, limit }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    page: i64,
    limit: i64,
}

impl Page {
    /// Non-positive sizes become a single row per page.
    pub fn new(page: i64, limit: i64) -> Self {
        PaginationParams {
            page: Some(page),
            limit: Some(limit),
        }
        .resolve(limit.max(1))
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }
}
