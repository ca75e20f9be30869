use thiserror::Error;

/// Pagination field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationField {
    Limit,
    Offset,
}

impl PaginationField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Limit => "limit",
            Self::Offset => "offset",
        }
    }
}

/// Errors raised while constructing value objects and request objects.
///
/// These describe malformed caller input. They are never transient and are
/// reported to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{kind} must be a positive integer (got {value})")]
    InvalidIdentifier { kind: &'static str, value: i64 },
    #[error("{} must be zero or greater when present (got {value})", field.as_str())]
    InvalidPagination { field: PaginationField, value: i64 },
    #[error("{kind} selection must contain at least one identifier")]
    EmptyBulkSelection { kind: &'static str },
    #[error("from quantity must be between 1 and {} (got {value})", u32::MAX)]
    InvalidQuantity { value: i64 },
    #[error("unknown reduction type `{0}`")]
    InvalidReductionType(String),
    #[error("reduction {reason}")]
    InvalidReduction { reason: &'static str },
    #[error("price override must be a finite amount of zero or greater")]
    InvalidPrice,
    #[error("validity window starts after it ends")]
    InvalidValidityWindow,
    #[error("at least one localized name is required")]
    MissingName,
    #[error("name for language {language_id} is blank or given twice")]
    InvalidName { language_id: i64 },
}

impl ValidationError {
    /// Returns a stable machine-readable code for the failure.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier { .. } => "invalid_identifier",
            Self::InvalidPagination { .. } => "invalid_pagination",
            Self::EmptyBulkSelection { .. } => "empty_bulk_selection",
            Self::InvalidQuantity { .. } => "invalid_quantity",
            Self::InvalidReductionType(_) => "invalid_reduction_type",
            Self::InvalidReduction { .. } => "invalid_reduction",
            Self::InvalidPrice => "invalid_price",
            Self::InvalidValidityWindow => "invalid_validity_window",
            Self::MissingName => "missing_name",
            Self::InvalidName { .. } => "invalid_name",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_field() {
        let err = ValidationError::InvalidPagination {
            field: PaginationField::Offset,
            value: -3,
        };
        assert_eq!(
            err.to_string(),
            "offset must be zero or greater when present (got -3)"
        );
        assert_eq!(err.code(), "invalid_pagination");

        let err = ValidationError::InvalidIdentifier {
            kind: "language id",
            value: 0,
        };
        assert_eq!(err.to_string(), "language id must be a positive integer (got 0)");
    }
}
