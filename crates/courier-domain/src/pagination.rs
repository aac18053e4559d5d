//! Pagination parameters and the paginated list envelope.

use serde::{Deserialize, Serialize};

/// Pagination parameters shared across all list endpoints.
///
/// - `limit`: 1–100, default 10 (0 or absent falls back to the default)
/// - `page`: ≥ 1, default 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub limit: u64,
    #[serde(default = "default_page")]
    pub page: u64,
}

const DEFAULT_LIMIT: u64 = 10;
const MAX_LIMIT: u64 = 100;

fn default_page() -> u64 {
    1
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            page: default_page(),
        }
    }
}

impl Pagination {
    /// Apply the bounds: limit 0 → 10, limit > 100 → 100, page < 1 → 1.
    ///
    /// Call after deserializing from query params.
    pub fn clamped(self) -> Self {
        let limit = match self.limit {
            0 => DEFAULT_LIMIT,
            n => n.min(MAX_LIMIT),
        };
        Self {
            limit,
            page: self.page.max(1),
        }
    }

    /// Row offset for the clamped page: `(page - 1) × limit`.
    pub fn offset(self) -> u64 {
        let p = self.clamped();
        (p.page - 1) * p.limit
    }
}

/// A page of rows plus the total row count and the echoed paging inputs.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub count: u64,
    pub rows: Vec<T>,
    pub limit: u64,
    pub page: u64,
}

impl<T> Paginated<T> {
    pub fn new(count: u64, rows: Vec<T>, pagination: Pagination) -> Self {
        let p = pagination.clamped();
        Self {
            count,
            rows,
            limit: p.limit,
            page: p.page,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            count: self.count,
            rows: self.rows.into_iter().map(f).collect(),
            limit: self.limit,
            page: self.page,
        }
    }
}
