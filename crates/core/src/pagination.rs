use serde::Serialize;

use crate::error::{PaginationField, ValidationError};

/// Optional page bound and start offset for list retrieval.
///
/// Both values are independent: a missing `limit` means "no bound" and a
/// missing `offset` means "start at the first record". Neither is ever
/// replaced by a sentinel, so `Some(0)` stays distinguishable from `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<u64>,
}

impl Pagination {
    /// Validates the raw values. `limit` is checked before `offset`.
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Result<Self, ValidationError> {
        Ok(Self {
            limit: non_negative(PaginationField::Limit, limit)?,
            offset: non_negative(PaginationField::Offset, offset)?,
        })
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }
}

fn non_negative(field: PaginationField, value: Option<i64>) -> Result<Option<u64>, ValidationError> {
    match value {
        None => Ok(None),
        Some(raw) => u64::try_from(raw)
            .map(Some)
            .map_err(|_| ValidationError::InvalidPagination { field, value: raw }),
    }
}
