//! Page/limit query handling shared by listing endpoints.

use serde::{Deserialize, Serialize};

/// Raw `?page=&limit=` query values. Anything non-positive or unparsable is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// A resolved, clamped page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn resolve(query: &PageQuery, default_limit: u32, max_limit: u32) -> Self {
        let page = parse_positive(query.page.as_deref()).unwrap_or(1);
        let limit = parse_positive(query.limit.as_deref())
            .unwrap_or(default_limit)
            .min(max_limit);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }

    pub fn pagination(&self, total: i64) -> Pagination {
        let limit = i64::from(self.limit.max(1));
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|v| v.trim().parse::<u32>().ok()).filter(|v| *v > 0)
}

/// Pagination metadata returned alongside list results.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}
