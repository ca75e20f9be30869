use std::{collections::BTreeMap, error::Error as StdError};

use chrono::{DateTime, Utc};

use thiserror::Error;

use crate::{
    error::ValidationError,
    ids::{CatalogPriceRuleId, LanguageId},
    pagination::Pagination,
    request::{Request, RequestKind},
    ids::ShopId,
    types::{EditableCatalogPriceRule, PriceRuleSummary, ReductionType, ValidityWindow},
};

/// Failures raised by catalog price rule handlers.
#[derive(Debug, Error)]
pub enum CatalogPriceRuleError {
    #[error("language {0} is not configured")]
    LanguageNotFound(LanguageId),
    #[error("catalog price rule {0} does not exist")]
    CatalogPriceRuleNotFound(CatalogPriceRuleId),
    #[error("storage failure: {0}")]
    Storage(#[source] Box<dyn StdError + Send + Sync>),
}

impl CatalogPriceRuleError {
    pub fn storage<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Storage(Box::new(err))
    }
}

/// Lists catalog price rules with names localized for one language.
///
/// Fields are validated in order: language id, then limit, then offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetCatalogPriceRuleList {
    language_id: LanguageId,
    pagination: Pagination,
}

impl GetCatalogPriceRuleList {
    pub fn new(
        language_id: i64,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Self, ValidationError> {
        let language_id = LanguageId::new(language_id)?;
        let pagination = Pagination::new(limit, offset)?;
        Ok(Self {
            language_id,
            pagination,
        })
    }

    pub fn language_id(&self) -> LanguageId {
        self.language_id
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn limit(&self) -> Option<u64> {
        self.pagination.limit()
    }

    pub fn offset(&self) -> Option<u64> {
        self.pagination.offset()
    }
}

impl Request for GetCatalogPriceRuleList {
    const NAME: &'static str = "GetCatalogPriceRuleList";
    const KIND: RequestKind = RequestKind::Query;
    type Output = Vec<PriceRuleSummary>;
    type Error = CatalogPriceRuleError;
}

/// Loads a single rule with every localized name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetCatalogPriceRuleForEditing {
    catalog_price_rule_id: CatalogPriceRuleId,
}

impl GetCatalogPriceRuleForEditing {
    pub fn new(catalog_price_rule_id: i64) -> Result<Self, ValidationError> {
        Ok(Self {
            catalog_price_rule_id: CatalogPriceRuleId::new(catalog_price_rule_id)?,
        })
    }

    pub fn catalog_price_rule_id(&self) -> CatalogPriceRuleId {
        self.catalog_price_rule_id
    }
}

impl Request for GetCatalogPriceRuleForEditing {
    const NAME: &'static str = "GetCatalogPriceRuleForEditing";
    const KIND: RequestKind = RequestKind::Query;
    type Output = EditableCatalogPriceRule;
    type Error = CatalogPriceRuleError;
}

/// Deletes one rule together with its localized names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteCatalogPriceRule {
    catalog_price_rule_id: CatalogPriceRuleId,
}

impl DeleteCatalogPriceRule {
    pub fn new(catalog_price_rule_id: i64) -> Result<Self, ValidationError> {
        Ok(Self {
            catalog_price_rule_id: CatalogPriceRuleId::new(catalog_price_rule_id)?,
        })
    }

    pub fn catalog_price_rule_id(&self) -> CatalogPriceRuleId {
        self.catalog_price_rule_id
    }
}

impl Request for DeleteCatalogPriceRule {
    const NAME: &'static str = "DeleteCatalogPriceRule";
    const KIND: RequestKind = RequestKind::Command;
    type Output = ();
    type Error = CatalogPriceRuleError;
}

/// Deletes several rules atomically.
///
/// Identifiers are validated in input order and the first invalid one is
/// reported. Repeated identifiers are kept once, at their first position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkDeleteCatalogPriceRule {
    catalog_price_rule_ids: Vec<CatalogPriceRuleId>,
}

impl BulkDeleteCatalogPriceRule {
    pub fn new<I>(catalog_price_rule_ids: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = i64>,
    {
        let mut ids: Vec<CatalogPriceRuleId> = Vec::new();
        for raw in catalog_price_rule_ids {
            let id = CatalogPriceRuleId::new(raw)?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        if ids.is_empty() {
            return Err(ValidationError::EmptyBulkSelection {
                kind: CatalogPriceRuleId::KIND,
            });
        }

        Ok(Self {
            catalog_price_rule_ids: ids,
        })
    }

    pub fn catalog_price_rule_ids(&self) -> &[CatalogPriceRuleId] {
        &self.catalog_price_rule_ids
    }
}

impl Request for BulkDeleteCatalogPriceRule {
    const NAME: &'static str = "BulkDeleteCatalogPriceRule";
    const KIND: RequestKind = RequestKind::Command;
    type Output = ();
    type Error = CatalogPriceRuleError;
}

/// Raw input for [`AddCatalogPriceRule`], as received from a caller.
#[derive(Debug, Clone, Default)]
pub struct CatalogPriceRuleDraft {
    pub shop_id: i64,
    pub priority: i64,
    pub currency_id: Option<i64>,
    pub country_id: Option<i64>,
    pub group_id: Option<i64>,
    pub from_quantity: i64,
    pub price: Option<f64>,
    pub reduction: f64,
    pub reduction_type: String,
    pub reduction_tax_included: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    /// Pairs of raw language id and name.
    pub names: Vec<(i64, String)>,
}

/// Creates a catalog price rule with its localized names.
///
/// Fields are validated in declaration order of the draft: shop, currency,
/// country, group, quantity, reduction type, reduction, price, validity
/// window, then names.
#[derive(Debug, Clone, PartialEq)]
pub struct AddCatalogPriceRule {
    shop_id: ShopId,
    priority: i64,
    currency_id: Option<i64>,
    country_id: Option<i64>,
    group_id: Option<i64>,
    from_quantity: u32,
    price: Option<f64>,
    reduction: f64,
    reduction_type: ReductionType,
    reduction_tax_included: bool,
    validity: ValidityWindow,
    names: BTreeMap<LanguageId, String>,
}

impl AddCatalogPriceRule {
    pub fn new(draft: CatalogPriceRuleDraft) -> Result<Self, ValidationError> {
        let shop_id = ShopId::new(draft.shop_id)?;
        let currency_id = restriction("currency id", draft.currency_id)?;
        let country_id = restriction("country id", draft.country_id)?;
        let group_id = restriction("group id", draft.group_id)?;

        let from_quantity = u32::try_from(draft.from_quantity)
            .ok()
            .filter(|quantity| *quantity >= 1)
            .ok_or(ValidationError::InvalidQuantity {
                value: draft.from_quantity,
            })?;

        let reduction_type: ReductionType = draft
            .reduction_type
            .parse()
            .map_err(|_| ValidationError::InvalidReductionType(draft.reduction_type.clone()))?;
        if !draft.reduction.is_finite() || draft.reduction < 0.0 {
            return Err(ValidationError::InvalidReduction {
                reason: "must be a finite amount of zero or greater",
            });
        }
        if reduction_type == ReductionType::Percentage && draft.reduction > 100.0 {
            return Err(ValidationError::InvalidReduction {
                reason: "percentage cannot exceed 100",
            });
        }

        if let Some(price) = draft.price {
            if !price.is_finite() || price < 0.0 {
                return Err(ValidationError::InvalidPrice);
            }
        }

        let validity = ValidityWindow {
            from: draft.valid_from,
            to: draft.valid_to,
        };
        if let (Some(from), Some(to)) = (validity.from, validity.to) {
            if from > to {
                return Err(ValidationError::InvalidValidityWindow);
            }
        }

        if draft.names.is_empty() {
            return Err(ValidationError::MissingName);
        }
        let mut names = BTreeMap::new();
        for (raw_language_id, name) in draft.names {
            let language_id = LanguageId::new(raw_language_id)?;
            let name = name.trim().to_string();
            if name.is_empty() || names.contains_key(&language_id) {
                return Err(ValidationError::InvalidName {
                    language_id: raw_language_id,
                });
            }
            names.insert(language_id, name);
        }

        Ok(Self {
            shop_id,
            priority: draft.priority,
            currency_id,
            country_id,
            group_id,
            from_quantity,
            price: draft.price,
            reduction: draft.reduction,
            reduction_type,
            reduction_tax_included: draft.reduction_tax_included,
            validity,
            names,
        })
    }

    pub fn shop_id(&self) -> ShopId {
        self.shop_id
    }

    pub fn priority(&self) -> i64 {
        self.priority
    }

    pub fn currency_id(&self) -> Option<i64> {
        self.currency_id
    }

    pub fn country_id(&self) -> Option<i64> {
        self.country_id
    }

    pub fn group_id(&self) -> Option<i64> {
        self.group_id
    }

    pub fn from_quantity(&self) -> u32 {
        self.from_quantity
    }

    pub fn price(&self) -> Option<f64> {
        self.price
    }

    pub fn reduction(&self) -> f64 {
        self.reduction
    }

    pub fn reduction_type(&self) -> ReductionType {
        self.reduction_type
    }

    pub fn reduction_tax_included(&self) -> bool {
        self.reduction_tax_included
    }

    pub fn validity(&self) -> ValidityWindow {
        self.validity
    }

    /// Localized names, ordered by language id.
    pub fn names(&self) -> &BTreeMap<LanguageId, String> {
        &self.names
    }
}

impl Request for AddCatalogPriceRule {
    const NAME: &'static str = "AddCatalogPriceRule";
    const KIND: RequestKind = RequestKind::Command;
    type Output = CatalogPriceRuleId;
    type Error = CatalogPriceRuleError;
}

/// Optional restriction id; `None` applies the rule to every value.
fn restriction(kind: &'static str, value: Option<i64>) -> Result<Option<i64>, ValidationError> {
    match value {
        Some(raw) if raw < 1 => Err(ValidationError::InvalidIdentifier { kind, value: raw }),
        other => Ok(other),
    }
}
