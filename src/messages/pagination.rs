//! Pagination and ordering options shared by list messages.

use crate::errors::{IsosegError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 50;
pub const MAX_PER_PAGE: u32 = 5000;

/// Column a listing is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    #[default]
    Id,
    CreatedAt,
    UpdatedAt,
    Name,
}

impl OrderBy {
    pub fn column(self) -> &'static str {
        match self {
            OrderBy::Id => "id",
            OrderBy::CreatedAt => "created_at",
            OrderBy::UpdatedAt => "updated_at",
            OrderBy::Name => "name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn keyword(self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// Ordering as written in a request: `name`, `-created_at`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ordering {
    pub order_by: OrderBy,
    pub direction: OrderDirection,
}

impl FromStr for Ordering {
    type Err = IsosegError;

    fn from_str(raw: &str) -> Result<Self> {
        let (direction, column) = match raw.strip_prefix('-') {
            Some(column) => (OrderDirection::Desc, column),
            None => (OrderDirection::Asc, raw.strip_prefix('+').unwrap_or(raw)),
        };

        let order_by = match column {
            "created_at" => OrderBy::CreatedAt,
            "updated_at" => OrderBy::UpdatedAt,
            "name" => OrderBy::Name,
            other => {
                return Err(IsosegError::validation_field(
                    format!(
                        "Order by can only be: 'created_at', 'updated_at', 'name' (got '{}')",
                        other
                    ),
                    "order_by",
                ))
            }
        };

        Ok(Self { order_by, direction })
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.direction == OrderDirection::Desc { "-" } else { "" };
        write!(f, "{}{}", sign, self.order_by.column())
    }
}

/// Page selection plus ordering for a listing
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct PaginationOptions {
    #[validate(range(min = 1, message = "Page must be greater than 0"))]
    pub page: u32,

    #[validate(range(min = 1, max = 5000, message = "Per page must be between 1 and 5000"))]
    pub per_page: u32,

    pub ordering: Ordering,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self { page: DEFAULT_PAGE, per_page: DEFAULT_PER_PAGE, ordering: Ordering::default() }
    }
}

impl PaginationOptions {
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }

    /// Number of pages needed for `total` rows
    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else {
            (total + self.limit() - 1) / self.limit()
        }
    }
}
