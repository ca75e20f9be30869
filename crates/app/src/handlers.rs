use async_trait::async_trait;
use tracing::debug;

use catalog_query_core::{
    catalog_price_rule::{
        AddCatalogPriceRule, BulkDeleteCatalogPriceRule, CatalogPriceRuleError,
        DeleteCatalogPriceRule, GetCatalogPriceRuleForEditing, GetCatalogPriceRuleList,
    },
    types::{EditableCatalogPriceRule, PriceRuleSummary},
    CatalogPriceRuleId, Handler, LanguageId,
};
use catalog_query_storage::{CatalogPriceRuleRepoError, Database, NewCatalogPriceRule};

fn from_repo(err: CatalogPriceRuleRepoError) -> CatalogPriceRuleError {
    match err {
        CatalogPriceRuleRepoError::NotFound(id) => CatalogPriceRuleError::CatalogPriceRuleNotFound(id),
        other => CatalogPriceRuleError::storage(other),
    }
}

/// Lists rules localized for the requested language.
pub struct ListCatalogPriceRulesHandler {
    database: Database,
}

impl ListCatalogPriceRulesHandler {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl Handler<GetCatalogPriceRuleList> for ListCatalogPriceRulesHandler {
    async fn handle(
        &self,
        query: GetCatalogPriceRuleList,
    ) -> Result<Vec<PriceRuleSummary>, CatalogPriceRuleError> {
        let language_id = query.language_id();
        let configured = self
            .database
            .languages()
            .exists(language_id)
            .await
            .map_err(CatalogPriceRuleError::storage)?;
        if !configured {
            return Err(CatalogPriceRuleError::LanguageNotFound(language_id));
        }

        let rules = self
            .database
            .catalog_price_rules()
            .fetch_page(language_id, query.pagination())
            .await
            .map_err(from_repo)?;

        debug!(
            stage = "handler",
            language_id = %language_id,
            limit = ?query.limit(),
            offset = ?query.offset(),
            returned = rules.len(),
            "catalog price rules listed"
        );
        Ok(rules)
    }
}

/// Loads a rule for the edit form.
pub struct GetCatalogPriceRuleForEditingHandler {
    database: Database,
}

impl GetCatalogPriceRuleForEditingHandler {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl Handler<GetCatalogPriceRuleForEditing> for GetCatalogPriceRuleForEditingHandler {
    async fn handle(
        &self,
        query: GetCatalogPriceRuleForEditing,
    ) -> Result<EditableCatalogPriceRule, CatalogPriceRuleError> {
        let rule_id = query.catalog_price_rule_id();
        self.database
            .catalog_price_rules()
            .fetch_for_editing(rule_id)
            .await
            .map_err(from_repo)?
            .ok_or(CatalogPriceRuleError::CatalogPriceRuleNotFound(rule_id))
    }
}

/// Creates a rule once every named language is known to be configured.
pub struct AddCatalogPriceRuleHandler {
    database: Database,
}

impl AddCatalogPriceRuleHandler {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl Handler<AddCatalogPriceRule> for AddCatalogPriceRuleHandler {
    async fn handle(
        &self,
        command: AddCatalogPriceRule,
    ) -> Result<CatalogPriceRuleId, CatalogPriceRuleError> {
        let languages = self.database.languages();
        for language_id in command.names().keys() {
            let configured = languages
                .exists(*language_id)
                .await
                .map_err(CatalogPriceRuleError::storage)?;
            if !configured {
                return Err(CatalogPriceRuleError::LanguageNotFound(*language_id));
            }
        }

        let names: Vec<(LanguageId, &str)> = command
            .names()
            .iter()
            .map(|(language_id, name)| (*language_id, name.as_str()))
            .collect();
        let rule_id = self
            .database
            .catalog_price_rules()
            .insert(&NewCatalogPriceRule {
                shop_id: command.shop_id(),
                priority: command.priority(),
                currency_id: command.currency_id(),
                country_id: command.country_id(),
                group_id: command.group_id(),
                from_quantity: command.from_quantity(),
                price: command.price(),
                reduction: command.reduction(),
                reduction_type: command.reduction_type(),
                reduction_tax_included: command.reduction_tax_included(),
                validity: command.validity(),
                names: &names,
            })
            .await
            .map_err(from_repo)?;

        debug!(stage = "handler", rule_id = %rule_id, names = names.len(), "catalog price rule added");
        Ok(rule_id)
    }
}

pub struct DeleteCatalogPriceRuleHandler {
    database: Database,
}

impl DeleteCatalogPriceRuleHandler {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl Handler<DeleteCatalogPriceRule> for DeleteCatalogPriceRuleHandler {
    async fn handle(&self, command: DeleteCatalogPriceRule) -> Result<(), CatalogPriceRuleError> {
        let rule_id = command.catalog_price_rule_id();
        let deleted = self
            .database
            .catalog_price_rules()
            .delete(rule_id)
            .await
            .map_err(CatalogPriceRuleError::storage)?;
        if !deleted {
            return Err(CatalogPriceRuleError::CatalogPriceRuleNotFound(rule_id));
        }

        debug!(stage = "handler", rule_id = %rule_id, "catalog price rule deleted");
        Ok(())
    }
}

pub struct BulkDeleteCatalogPriceRuleHandler {
    database: Database,
}

impl BulkDeleteCatalogPriceRuleHandler {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl Handler<BulkDeleteCatalogPriceRule> for BulkDeleteCatalogPriceRuleHandler {
    async fn handle(&self, command: BulkDeleteCatalogPriceRule) -> Result<(), CatalogPriceRuleError> {
        let rule_ids = command.catalog_price_rule_ids();
        self.database
            .catalog_price_rules()
            .delete_many(rule_ids)
            .await
            .map_err(from_repo)?;

        debug!(stage = "handler", count = rule_ids.len(), "catalog price rules deleted");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::test_support::{lang, seed, setup_db};
    use super::*;
    use catalog_query_core::{
        catalog_price_rule::CatalogPriceRuleDraft, types::ReductionType, DispatchError,
    };

    use crate::wiring::build_dispatcher;

    fn names(rules: &[PriceRuleSummary]) -> Vec<&str> {
        rules.iter().map(|rule| rule.name.as_str()).collect()
    }

    #[tokio::test]
    async fn unbounded_list_returns_every_rule_in_priority_order() {
        let (_dir, database) = setup_db().await;
        seed(&database).await;
        let dispatcher = build_dispatcher(&database).expect("wiring");

        let query = GetCatalogPriceRuleList::new(1, None, None).unwrap();
        let rules = dispatcher.dispatch(query).await.expect("list");

        assert_eq!(
            names(&rules),
            vec![
                "Staff",
                "Loyalty",
                "Newsletter",
                "Bulk buyers",
                "Students",
                "Black Friday",
                "Clearance"
            ]
        );
        let priorities: Vec<i64> = rules.iter().map(|rule| rule.priority).collect();
        assert!(priorities.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[tokio::test]
    async fn names_follow_the_requested_language() {
        let (_dir, database) = setup_db().await;
        seed(&database).await;
        let dispatcher = build_dispatcher(&database).expect("wiring");

        let rules = dispatcher
            .dispatch(GetCatalogPriceRuleList::new(2, Some(1), None).unwrap())
            .await
            .expect("list");
        assert_eq!(names(&rules), vec!["Personnel"]);
    }

    #[tokio::test]
    async fn successive_pages_cover_the_full_listing_without_gaps() {
        let (_dir, database) = setup_db().await;
        seed(&database).await;
        let dispatcher = build_dispatcher(&database).expect("wiring");

        let full = dispatcher
            .dispatch(GetCatalogPriceRuleList::new(1, None, None).unwrap())
            .await
            .expect("full listing");

        let mut concatenated = Vec::new();
        let mut offset = 0;
        loop {
            let page = dispatcher
                .dispatch(GetCatalogPriceRuleList::new(1, Some(2), Some(offset)).unwrap())
                .await
                .expect("page");
            if page.is_empty() {
                break;
            }
            assert!(page.len() <= 2);
            concatenated.extend(page);
            offset += 2;
        }

        assert_eq!(concatenated, full);
        let unique: HashSet<CatalogPriceRuleId> = concatenated.iter().map(|rule| rule.id).collect();
        assert_eq!(unique.len(), full.len());
    }

    #[tokio::test]
    async fn zero_limit_is_not_treated_as_unbounded() {
        let (_dir, database) = setup_db().await;
        seed(&database).await;
        let dispatcher = build_dispatcher(&database).expect("wiring");

        let rules = dispatcher
            .dispatch(GetCatalogPriceRuleList::new(1, Some(0), None).unwrap())
            .await
            .expect("list");
        assert!(rules.is_empty());

        let rules = dispatcher
            .dispatch(GetCatalogPriceRuleList::new(1, None, Some(0)).unwrap())
            .await
            .expect("list");
        assert_eq!(rules.len(), 7);
    }

    #[tokio::test]
    async fn unknown_language_is_reported_as_domain_error() {
        let (_dir, database) = setup_db().await;
        seed(&database).await;
        let dispatcher = build_dispatcher(&database).expect("wiring");

        let err = dispatcher
            .dispatch(GetCatalogPriceRuleList::new(99, None, None).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Handler(CatalogPriceRuleError::LanguageNotFound(id)) if id == lang(99)
        ));
    }

    #[tokio::test]
    async fn editing_query_returns_every_translation() {
        let (_dir, database) = setup_db().await;
        let ids = seed(&database).await;
        let dispatcher = build_dispatcher(&database).expect("wiring");

        let rule = dispatcher
            .dispatch(GetCatalogPriceRuleForEditing::new(ids[1].value()).unwrap())
            .await
            .expect("rule");
        assert_eq!(rule.id, ids[1]);
        assert_eq!(rule.names.get(&lang(1)).map(String::as_str), Some("Loyalty"));
        assert_eq!(rule.names.get(&lang(2)).map(String::as_str), Some("Fidélité"));

        let err = dispatcher
            .dispatch(GetCatalogPriceRuleForEditing::new(500).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Handler(CatalogPriceRuleError::CatalogPriceRuleNotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_removes_rule_and_reports_missing_ones() {
        let (_dir, database) = setup_db().await;
        let ids = seed(&database).await;
        let dispatcher = build_dispatcher(&database).expect("wiring");

        dispatcher
            .dispatch(DeleteCatalogPriceRule::new(ids[4].value()).unwrap())
            .await
            .expect("delete");

        let rules = dispatcher
            .dispatch(GetCatalogPriceRuleList::new(1, None, None).unwrap())
            .await
            .unwrap();
        assert_eq!(rules.len(), 6);
        assert_eq!(rules[0].name, "Loyalty");

        let err = dispatcher
            .dispatch(DeleteCatalogPriceRule::new(ids[4].value()).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Handler(CatalogPriceRuleError::CatalogPriceRuleNotFound(id)) if id == ids[4]
        ));
    }

    #[tokio::test]
    async fn bulk_delete_rolls_back_when_any_rule_is_missing() {
        let (_dir, database) = setup_db().await;
        let ids = seed(&database).await;
        let dispatcher = build_dispatcher(&database).expect("wiring");

        let command =
            BulkDeleteCatalogPriceRule::new([ids[0].value(), 777, ids[1].value()]).unwrap();
        let err = dispatcher.dispatch(command).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Handler(CatalogPriceRuleError::CatalogPriceRuleNotFound(id)) if id.value() == 777
        ));

        let remaining = dispatcher
            .dispatch(GetCatalogPriceRuleList::new(1, None, None).unwrap())
            .await
            .unwrap();
        assert_eq!(remaining.len(), 7);

        let command = BulkDeleteCatalogPriceRule::new([ids[0].value(), ids[1].value()]).unwrap();
        dispatcher.dispatch(command).await.expect("bulk delete");
        let remaining = dispatcher
            .dispatch(GetCatalogPriceRuleList::new(1, None, None).unwrap())
            .await
            .unwrap();
        assert_eq!(remaining.len(), 5);
    }

    fn draft(names: Vec<(i64, &str)>) -> CatalogPriceRuleDraft {
        CatalogPriceRuleDraft {
            shop_id: 1,
            priority: 0,
            from_quantity: 3,
            price: Some(9.5),
            reduction: 2.0,
            reduction_type: "amount".to_string(),
            names: names
                .into_iter()
                .map(|(language, name)| (language, name.to_string()))
                .collect(),
            ..CatalogPriceRuleDraft::default()
        }
    }

    #[tokio::test]
    async fn added_rule_is_listed_and_editable() {
        let (_dir, database) = setup_db().await;
        seed(&database).await;
        let dispatcher = build_dispatcher(&database).expect("wiring");

        let command =
            AddCatalogPriceRule::new(draft(vec![(1, "Early birds"), (2, "Lève-tôt")])).unwrap();
        let id = dispatcher.dispatch(command).await.expect("add");

        let rules = dispatcher
            .dispatch(GetCatalogPriceRuleList::new(2, Some(2), None).unwrap())
            .await
            .unwrap();
        assert_eq!(names(&rules), vec!["Personnel", "Lève-tôt"]);

        let rule = dispatcher
            .dispatch(GetCatalogPriceRuleForEditing::new(id.value()).unwrap())
            .await
            .unwrap();
        assert_eq!(rule.from_quantity, 3);
        assert_eq!(rule.price, Some(9.5));
        assert_eq!(rule.reduction_type, ReductionType::Amount);
        assert_eq!(rule.names.len(), 2);
    }

    #[tokio::test]
    async fn add_with_unknown_language_stores_nothing() {
        let (_dir, database) = setup_db().await;
        let dispatcher = build_dispatcher(&database).expect("wiring");

        let command = AddCatalogPriceRule::new(draft(vec![(1, "Sales"), (7, "Rabatt")])).unwrap();
        let err = dispatcher.dispatch(command).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Handler(CatalogPriceRuleError::LanguageNotFound(id)) if id == lang(7)
        ));

        let rules = dispatcher
            .dispatch(GetCatalogPriceRuleList::new(1, None, None).unwrap())
            .await
            .unwrap();
        assert!(rules.is_empty());
    }
}
