use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Declares an identifier newtype around a strictly positive `i64`.
///
/// `new`, `TryFrom<i64>` and deserialization all run the same check, so no
/// instance can hold a value below 1.
macro_rules! positive_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(i64);

        impl $name {
            /// Human readable name used in validation messages.
            pub const KIND: &'static str = $kind;

            /// Validates the raw value, rejecting anything below 1.
            pub fn new(value: i64) -> Result<Self, ValidationError> {
                if value < 1 {
                    return Err(ValidationError::InvalidIdentifier {
                        kind: Self::KIND,
                        value,
                    });
                }
                Ok(Self(value))
            }

            /// Returns the wrapped value, always `>= 1`.
            pub fn value(self) -> i64 {
                self.0
            }
        }

        impl TryFrom<i64> for $name {
            type Error = ValidationError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

positive_id!(
    /// Identifier of a configured shop language.
    LanguageId,
    "language id"
);

positive_id!(
    /// Identifier of a catalog price rule.
    CatalogPriceRuleId,
    "catalog price rule id"
);

positive_id!(
    /// Identifier of a shop.
    ShopId,
    "shop id"
);

#[cfg(test)]
mod tests {
    use super::*;

    const NON_POSITIVE: [i64; 5] = [0, -1, -2, -1_000_000, i64::MIN];
    const POSITIVE: [i64; 5] = [1, 2, 3, 1_000_000, i64::MAX];

    #[test]
    fn rejects_zero_and_negative_values() {
        for raw in NON_POSITIVE {
            let err = LanguageId::new(raw).expect_err("non-positive id must fail");
            assert_eq!(
                err,
                ValidationError::InvalidIdentifier {
                    kind: "language id",
                    value: raw
                }
            );
            assert!(CatalogPriceRuleId::new(raw).is_err());
        }
    }

    #[test]
    fn accepts_positive_values_and_preserves_them() {
        for raw in POSITIVE {
            assert_eq!(LanguageId::new(raw).expect("valid id").value(), raw);
            assert_eq!(CatalogPriceRuleId::try_from(raw).expect("valid id").value(), raw);
        }
    }

    #[test]
    fn error_names_the_identifier_kind() {
        let err = CatalogPriceRuleId::new(0).unwrap_err();
        assert!(err.to_string().starts_with("catalog price rule id"));
    }

    #[test]
    fn deserialization_runs_the_same_check() {
        let id: LanguageId = serde_json::from_str("7").expect("deserialize");
        assert_eq!(id.value(), 7);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");

        let err = serde_json::from_str::<LanguageId>("0").unwrap_err();
        assert!(err.to_string().contains("language id must be a positive integer"));
    }
}
