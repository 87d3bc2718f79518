//! Page requests and paged results for list operations.

use crate::error::FieldErrors;
use crate::error::ServiceError;
use serde::Serialize;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

/// One-based page number plus page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Result<Self, ServiceError> {
        let mut errors = FieldErrors::new("Invalid pagination");
        if page < 1 {
            errors.add("page", "Page must be a positive integer");
        }
        if limit < 1 {
            errors.add("limit", "Limit must be a positive integer");
        }
        errors.into_result()?;
        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// A page of results plus the totals a client needs to render pagination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub total_pages: u64,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, request: PageRequest, total: u64) -> Self {
        let limit = u64::from(request.limit.max(1));
        Self {
            data,
            page: request.page,
            total_pages: total.div_ceil(limit),
            total,
        }
    }

    /// Slice an already-materialised, already-ordered list
    pub fn from_all(items: Vec<T>, request: PageRequest) -> Self {
        let total = items.len() as u64;
        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let data = items
            .into_iter()
            .skip(offset)
            .take(request.limit as usize)
            .collect();
        Self::new(data, request, total)
    }
}
