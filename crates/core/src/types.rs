use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CatalogPriceRuleId, LanguageId, ShopId};

/// How a catalog price rule lowers the product price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionType {
    Amount,
    Percentage,
}

impl ReductionType {
    /// Returns the canonical database representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Amount => "amount",
            Self::Percentage => "percentage",
        }
    }
}

impl FromStr for ReductionType {
    type Err = UnknownReductionType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "amount" => Ok(Self::Amount),
            "percentage" => Ok(Self::Percentage),
            other => Err(UnknownReductionType(other.to_string())),
        }
    }
}

/// Raised when a stored reduction type is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownReductionType(pub String);

impl fmt::Display for UnknownReductionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown reduction type '{}'", self.0)
    }
}

impl std::error::Error for UnknownReductionType {}

/// Period during which a rule applies. Missing bounds are open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
}

impl ValidityWindow {
    /// Returns `true` when `at` falls inside the window, bounds included.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| from <= at) && self.to.map_or(true, |to| at <= to)
    }
}

/// Row of the catalog price rule listing, localized for one language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRuleSummary {
    pub id: CatalogPriceRuleId,
    pub name: String,
    pub priority: i64,
    pub from_quantity: u32,
    pub reduction: f64,
    pub reduction_type: ReductionType,
    pub reduction_tax_included: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(flatten)]
    pub validity: ValidityWindow,
}

impl PriceRuleSummary {
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.validity.contains(at)
    }
}

/// Full catalog price rule as loaded for the edit form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditableCatalogPriceRule {
    pub id: CatalogPriceRuleId,
    pub shop_id: ShopId,
    pub priority: i64,
    /// `None` means the rule applies to every currency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    pub from_quantity: u32,
    /// Fixed price override; `None` keeps the product's own price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub reduction: f64,
    pub reduction_type: ReductionType,
    pub reduction_tax_included: bool,
    #[serde(flatten)]
    pub validity: ValidityWindow,
    pub names: BTreeMap<LanguageId, String>,
}

impl EditableCatalogPriceRule {
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.validity.contains(at)
    }
}
