use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use catalog_query_core::{
    catalog_price_rule::{
        AddCatalogPriceRule, BulkDeleteCatalogPriceRule, CatalogPriceRuleDraft,
        DeleteCatalogPriceRule, GetCatalogPriceRuleForEditing, GetCatalogPriceRuleList,
    },
    Dispatcher,
};

use crate::error::AppError;

#[derive(Debug, Parser)]
#[command(name = "catalog-query", version, about = "Inspect and manage catalog price rules")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List catalog price rules with names in the given language.
    List {
        #[arg(long = "lang", allow_negative_numbers = true)]
        language_id: i64,
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,
        #[arg(long, allow_negative_numbers = true)]
        offset: Option<i64>,
    },
    /// Show one catalog price rule with every translation.
    Show {
        #[arg(long, allow_negative_numbers = true)]
        id: i64,
    },
    /// Create a catalog price rule and print its id.
    Add {
        #[arg(long = "shop", default_value_t = 1, allow_negative_numbers = true)]
        shop_id: i64,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        priority: i64,
        #[arg(long = "currency", allow_negative_numbers = true)]
        currency_id: Option<i64>,
        #[arg(long = "country", allow_negative_numbers = true)]
        country_id: Option<i64>,
        #[arg(long = "group", allow_negative_numbers = true)]
        group_id: Option<i64>,
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        from_quantity: i64,
        /// Fixed price replacing the product price.
        #[arg(long, allow_negative_numbers = true)]
        price: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        reduction: f64,
        /// `amount` or `percentage`.
        #[arg(long, default_value = "percentage")]
        reduction_type: String,
        #[arg(long)]
        tax_included: bool,
        /// RFC 3339 timestamp, e.g. 2024-06-01T00:00:00Z.
        #[arg(long)]
        valid_from: Option<DateTime<Utc>>,
        #[arg(long)]
        valid_to: Option<DateTime<Utc>>,
        /// Localized name as LANG_ID=NAME. Repeat for each language.
        #[arg(long = "name", value_parser = parse_name, allow_hyphen_values = true)]
        names: Vec<(i64, String)>,
    },
    /// Delete one or more catalog price rules. Several ids are deleted atomically.
    Delete {
        #[arg(long = "id", required = true, allow_negative_numbers = true)]
        ids: Vec<i64>,
    },
}

impl Command {
    /// Name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::List { .. } => "list",
            Self::Show { .. } => "show",
            Self::Add { .. } => "add",
            Self::Delete { .. } => "delete",
        }
    }
}

fn parse_name(raw: &str) -> Result<(i64, String), String> {
    let (language, name) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected LANG_ID=NAME, got `{raw}`"))?;
    let language = language
        .trim()
        .parse::<i64>()
        .map_err(|err| format!("invalid language id `{language}`: {err}"))?;
    Ok((language, name.to_string()))
}

/// Builds the request for `command`, dispatches it and renders the result.
///
/// Raw arguments are only turned into request objects here, so malformed
/// input fails before anything reaches the dispatcher.
pub async fn execute(
    command: Command,
    dispatcher: &Dispatcher,
    now: DateTime<Utc>,
) -> Result<Value, AppError> {
    match command {
        Command::List {
            language_id,
            limit,
            offset,
        } => {
            let query = GetCatalogPriceRuleList::new(language_id, limit, offset)?;
            let rules = dispatcher.dispatch(query).await?;
            Ok(serde_json::to_value(rules)?)
        }
        Command::Show { id } => {
            let query = GetCatalogPriceRuleForEditing::new(id)?;
            let rule = dispatcher.dispatch(query).await?;
            let active = rule.is_active_at(now);
            Ok(json!({ "rule": rule, "active": active }))
        }
        Command::Add {
            shop_id,
            priority,
            currency_id,
            country_id,
            group_id,
            from_quantity,
            price,
            reduction,
            reduction_type,
            tax_included,
            valid_from,
            valid_to,
            names,
        } => {
            let command = AddCatalogPriceRule::new(CatalogPriceRuleDraft {
                shop_id,
                priority,
                currency_id,
                country_id,
                group_id,
                from_quantity,
                price,
                reduction,
                reduction_type,
                reduction_tax_included: tax_included,
                valid_from,
                valid_to,
                names,
            })?;
            let id = dispatcher.dispatch(command).await?;
            Ok(json!({ "id": id }))
        }
        Command::Delete { ids } if ids.len() == 1 => {
            let command = DeleteCatalogPriceRule::new(ids[0])?;
            let deleted = vec![command.catalog_price_rule_id()];
            dispatcher.dispatch(command).await?;
            Ok(json!({ "deleted": deleted }))
        }
        Command::Delete { ids } => {
            let command = BulkDeleteCatalogPriceRule::new(ids)?;
            let deleted = command.catalog_price_rule_ids().to_vec();
            dispatcher.dispatch(command).await?;
            Ok(json!({ "deleted": deleted }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{seed, setup_db};
    use crate::wiring::build_dispatcher;
    use catalog_query_core::{catalog_price_rule::CatalogPriceRuleError, DispatchError, ValidationError};

    fn parse(args: &[&str]) -> Command {
        Cli::try_parse_from(args).expect("arguments should parse").command
    }

    #[test]
    fn parses_negative_numbers_so_validation_can_reject_them() {
        match parse(&["catalog-query", "list", "--lang", "-3", "--offset", "-1"]) {
            Command::List {
                language_id,
                limit,
                offset,
            } => {
                assert_eq!(language_id, -3);
                assert_eq!(limit, None);
                assert_eq!(offset, Some(-1));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn delete_requires_at_least_one_id() {
        assert!(Cli::try_parse_from(["catalog-query", "delete"]).is_err());
        match parse(&["catalog-query", "delete", "--id", "4", "--id", "9"]) {
            Command::Delete { ids } => assert_eq!(ids, vec![4, 9]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[tokio::test]
    async fn list_renders_rules_as_json() {
        let (_dir, database) = setup_db().await;
        seed(&database).await;
        let dispatcher = build_dispatcher(&database).unwrap();

        let output = execute(
            parse(&["catalog-query", "list", "--lang", "1", "--limit", "2", "--offset", "0"]),
            &dispatcher,
            Utc::now(),
        )
        .await
        .expect("list");

        let rules = output.as_array().expect("array");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0]["name"], "Staff");
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_dispatcher() {
        // An empty dispatcher would answer `HandlerNotFound` if it were reached.
        let dispatcher = Dispatcher::builder().build();

        let err = execute(
            parse(&["catalog-query", "list", "--lang", "0", "--limit", "-1"]),
            &dispatcher,
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::InvalidIdentifier { value: 0, .. })
        ));
    }

    #[tokio::test]
    async fn show_reports_activity_and_delete_lists_ids() {
        let (_dir, database) = setup_db().await;
        let ids = seed(&database).await;
        let dispatcher = build_dispatcher(&database).unwrap();

        let id = ids[2].value().to_string();
        let output = execute(parse(&["catalog-query", "show", "--id", &id]), &dispatcher, Utc::now())
            .await
            .expect("show");
        assert_eq!(output["active"], true);
        assert_eq!(output["rule"]["names"]["1"], "Bulk buyers");

        let first = ids[0].value().to_string();
        let output = execute(
            parse(&["catalog-query", "delete", "--id", &first, "--id", &id, "--id", &first]),
            &dispatcher,
            Utc::now(),
        )
        .await
        .expect("delete");
        assert_eq!(output["deleted"], json!([ids[0].value(), ids[2].value()]));

        let err = execute(parse(&["catalog-query", "delete", "--id", &id]), &dispatcher, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Dispatch(DispatchError::Handler(
                CatalogPriceRuleError::CatalogPriceRuleNotFound(_)
            ))
        ));
    }

    #[test]
    fn parses_localized_names() {
        match parse(&[
            "catalog-query",
            "add",
            "--reduction",
            "10",
            "--name",
            "1=Summer = sun",
            "--name",
            "-2=Été",
        ]) {
            Command::Add {
                names,
                shop_id,
                reduction_type,
                ..
            } => {
                assert_eq!(shop_id, 1);
                assert_eq!(reduction_type, "percentage");
                assert_eq!(
                    names,
                    vec![(1, "Summer = sun".to_string()), (-2, "Été".to_string())]
                );
            }
            other => panic!("unexpected command {other:?}"),
        }

        assert!(
            Cli::try_parse_from(["catalog-query", "add", "--reduction", "1", "--name", "Summer"])
                .is_err()
        );
    }

    #[tokio::test]
    async fn add_creates_a_rule_in_the_default_language() {
        let (_dir, database) = setup_db().await;
        let dispatcher = build_dispatcher(&database).unwrap();

        let output = execute(
            parse(&[
                "catalog-query",
                "add",
                "--priority",
                "4",
                "--reduction",
                "7.5",
                "--valid-from",
                "2024-06-01T00:00:00Z",
                "--name",
                "1=Summer",
            ]),
            &dispatcher,
            Utc::now(),
        )
        .await
        .expect("add");
        let id = output["id"].as_i64().expect("numeric id");

        let output = execute(parse(&["catalog-query", "list", "--lang", "1"]), &dispatcher, Utc::now())
            .await
            .expect("list");
        assert_eq!(output[0]["id"], id);
        assert_eq!(output[0]["name"], "Summer");
        assert_eq!(output[0]["priority"], 4);

        let err = execute(
            parse(&["catalog-query", "add", "--reduction", "150", "--name", "1=Too much"]),
            &dispatcher,
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::InvalidReduction { .. })
        ));
    }
}
