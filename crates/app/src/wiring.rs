use catalog_query_core::{
    catalog_price_rule::{
        AddCatalogPriceRule, BulkDeleteCatalogPriceRule, DeleteCatalogPriceRule,
        GetCatalogPriceRuleForEditing, GetCatalogPriceRuleList,
    },
    Dispatcher, RegistrationError,
};
use catalog_query_storage::Database;

use crate::handlers::{
    AddCatalogPriceRuleHandler, BulkDeleteCatalogPriceRuleHandler, DeleteCatalogPriceRuleHandler,
    GetCatalogPriceRuleForEditingHandler, ListCatalogPriceRulesHandler,
};

/// Registers every handler once and freezes the dispatcher.
pub fn build_dispatcher(database: &Database) -> Result<Dispatcher, RegistrationError> {
    let dispatcher = Dispatcher::builder()
        .register::<GetCatalogPriceRuleList, _>(ListCatalogPriceRulesHandler::new(database.clone()))?
        .register::<GetCatalogPriceRuleForEditing, _>(GetCatalogPriceRuleForEditingHandler::new(
            database.clone(),
        ))?
        .register::<AddCatalogPriceRule, _>(AddCatalogPriceRuleHandler::new(database.clone()))?
        .register::<DeleteCatalogPriceRule, _>(DeleteCatalogPriceRuleHandler::new(database.clone()))?
        .register::<BulkDeleteCatalogPriceRule, _>(BulkDeleteCatalogPriceRuleHandler::new(
            database.clone(),
        ))?
        .build();

    Ok(dispatcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::setup_db;

    #[tokio::test]
    async fn registers_every_catalog_price_rule_request() {
        let (_dir, database) = setup_db().await;
        let dispatcher = build_dispatcher(&database).expect("wiring");

        assert_eq!(
            dispatcher.registered_requests(),
            vec![
                "AddCatalogPriceRule",
                "BulkDeleteCatalogPriceRule",
                "DeleteCatalogPriceRule",
                "GetCatalogPriceRuleForEditing",
                "GetCatalogPriceRuleList",
            ]
        );
    }
}
