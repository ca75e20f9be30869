use std::{collections::BTreeMap, str::FromStr, time::Duration};

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    QueryBuilder, Row, Sqlite, SqlitePool,
};
use thiserror::Error;

use catalog_query_core::{
    types::{
        EditableCatalogPriceRule, PriceRuleSummary, ReductionType, UnknownReductionType,
        ValidityWindow,
    },
    CatalogPriceRuleId, LanguageId, Pagination, ShopId, ValidationError,
};

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens a pool for the provided connection string.
    ///
    /// Every pooled connection enforces foreign keys and uses WAL with a
    /// busy timeout.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(StorageError::InvalidUrl)?
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_millis(5000));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(StorageError::Connect)?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle for the configured languages.
    pub fn languages(&self) -> LanguageRepository {
        LanguageRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for catalog price rules and their localized names.
    pub fn catalog_price_rules(&self) -> CatalogPriceRuleRepository {
        CatalogPriceRuleRepository {
            pool: self.pool.clone(),
        }
    }
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid sqlite connection string: {0}")]
    InvalidUrl(sqlx::Error),
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository for configured shop languages.
#[derive(Clone)]
pub struct LanguageRepository {
    pool: SqlitePool,
}

impl LanguageRepository {
    /// Returns `true` when the language is configured.
    pub async fn exists(&self, language_id: LanguageId) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM languages WHERE id = ?")
            .bind(language_id.value())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Registers a language, replacing the iso code and name of an existing id.
    #[cfg(any(test, feature = "test-support"))]
    pub async fn upsert(
        &self,
        language_id: LanguageId,
        iso_code: &str,
        name: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO languages (id, iso_code, name) VALUES (?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET iso_code = excluded.iso_code, name = excluded.name",
        )
            .bind(language_id.value())
            .bind(iso_code)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Repository for catalog price rules.
#[derive(Clone)]
pub struct CatalogPriceRuleRepository {
    pool: SqlitePool,
}

impl CatalogPriceRuleRepository {
    /// Lists rules ordered by priority then id, bounded by `pagination`, with
    /// names taken from `language_id`.
    ///
    /// `LIMIT` and `OFFSET` are only emitted for values that are present.
    /// SQLite needs a `LIMIT` before `OFFSET`, so an offset without limit
    /// uses `LIMIT -1`, SQLite's "no bound".
    pub async fn fetch_page(
        &self,
        language_id: LanguageId,
        pagination: Pagination,
    ) -> Result<Vec<PriceRuleSummary>, CatalogPriceRuleRepoError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            r#"
SELECT r.id,
       COALESCE(n.name, '') AS name,
       r.priority,
       r.from_quantity,
       r.price,
       r.reduction,
       r.reduction_type,
       r.reduction_tax,
       r.valid_from,
       r.valid_to
  FROM catalog_price_rules AS r
  LEFT JOIN catalog_price_rule_names AS n
    ON n.rule_id = r.id
   AND n.language_id = "#,
        );
        query.push_bind(language_id.value());
        query.push(" ORDER BY r.priority ASC, r.id ASC");

        match (pagination.limit(), pagination.offset()) {
            (Some(limit), _) => {
                query.push(" LIMIT ");
                query.push_bind(saturating_i64(limit));
            }
            (None, Some(_)) => {
                query.push(" LIMIT -1");
            }
            (None, None) => {}
        }
        if let Some(offset) = pagination.offset() {
            query.push(" OFFSET ");
            query.push_bind(saturating_i64(offset));
        }

        let rows = query
            .build_query_as::<PriceRuleSummaryRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| row.into_domain().map_err(CatalogPriceRuleRepoError::from))
            .collect()
    }

    /// Loads one rule with every localized name, or `None` when missing.
    pub async fn fetch_for_editing(
        &self,
        rule_id: CatalogPriceRuleId,
    ) -> Result<Option<EditableCatalogPriceRule>, CatalogPriceRuleRepoError> {
        let row = sqlx::query_as::<_, EditableRuleRow>(
            "SELECT id, shop_id, priority, currency_id, country_id, group_id, from_quantity, \
             price, reduction, reduction_type, reduction_tax, valid_from, valid_to \
             FROM catalog_price_rules WHERE id = ?",
        )
        .bind(rule_id.value())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let name_rows = sqlx::query(
            "SELECT language_id, name FROM catalog_price_rule_names \
             WHERE rule_id = ? ORDER BY language_id",
        )
        .bind(rule_id.value())
        .fetch_all(&self.pool)
        .await?;

        let mut names = BTreeMap::new();
        for name_row in name_rows {
            let language_id = LanguageId::new(name_row.get("language_id")).map_err(RowError::from)?;
            names.insert(language_id, name_row.get::<String, _>("name"));
        }

        Ok(Some(row.into_domain(names)?))
    }

    /// Inserts a rule and its localized names, returning the new identifier.
    pub async fn insert(
        &self,
        rule: &NewCatalogPriceRule<'_>,
    ) -> Result<CatalogPriceRuleId, CatalogPriceRuleRepoError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "INSERT INTO catalog_price_rules \
             (shop_id, priority, currency_id, country_id, group_id, from_quantity, price, reduction, reduction_type, reduction_tax, valid_from, valid_to) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING id",
        )
        .bind(rule.shop_id.value())
        .bind(rule.priority)
        .bind(rule.currency_id)
        .bind(rule.country_id)
        .bind(rule.group_id)
        .bind(i64::from(rule.from_quantity))
        .bind(rule.price)
        .bind(rule.reduction)
        .bind(rule.reduction_type.as_str())
        .bind(rule.reduction_tax_included)
        .bind(rule.validity.from.map(to_rfc3339))
        .bind(rule.validity.to.map(to_rfc3339))
        .fetch_one(&mut *tx)
        .await?;

        let rule_id = CatalogPriceRuleId::new(row.get("id")).map_err(RowError::from)?;

        for (language_id, name) in rule.names {
            sqlx::query(
                "INSERT INTO catalog_price_rule_names (rule_id, language_id, name) VALUES (?, ?, ?)",
            )
            .bind(rule_id.value())
            .bind(language_id.value())
            .bind(*name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(rule_id)
    }

    /// Deletes a rule, returning `false` when it did not exist.
    ///
    /// Localized names go with it through `ON DELETE CASCADE`.
    pub async fn delete(&self, rule_id: CatalogPriceRuleId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM catalog_price_rules WHERE id = ?")
            .bind(rule_id.value())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Deletes all rules in one transaction.
    ///
    /// Nothing is deleted when any of the identifiers is unknown; the first
    /// unknown one is reported.
    pub async fn delete_many(
        &self,
        rule_ids: &[CatalogPriceRuleId],
    ) -> Result<(), CatalogPriceRuleRepoError> {
        let mut tx = self.pool.begin().await?;

        for rule_id in rule_ids {
            let result = sqlx::query("DELETE FROM catalog_price_rules WHERE id = ?")
                .bind(rule_id.value())
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(CatalogPriceRuleRepoError::NotFound(*rule_id));
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Data required to create a catalog price rule.
pub struct NewCatalogPriceRule<'a> {
    pub shop_id: ShopId,
    pub priority: i64,
    pub currency_id: Option<i64>,
    pub country_id: Option<i64>,
    pub group_id: Option<i64>,
    pub from_quantity: u32,
    pub price: Option<f64>,
    pub reduction: f64,
    pub reduction_type: ReductionType,
    pub reduction_tax_included: bool,
    pub validity: ValidityWindow,
    pub names: &'a [(LanguageId, &'a str)],
}

/// Errors that can occur while reading or mutating catalog price rules.
#[derive(Debug, Error)]
pub enum CatalogPriceRuleRepoError {
    #[error("catalog price rule {0} does not exist")]
    NotFound(CatalogPriceRuleId),
    #[error("stored catalog price rule is invalid: {0}")]
    InvalidRow(#[from] RowError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Stored values that cannot be turned into domain types.
#[derive(Debug, Error)]
pub enum RowError {
    #[error(transparent)]
    Identifier(#[from] ValidationError),
    #[error(transparent)]
    ReductionType(#[from] UnknownReductionType),
    #[error("from_quantity out of range: {0}")]
    FromQuantity(i64),
}

#[derive(Debug, sqlx::FromRow)]
struct PriceRuleSummaryRow {
    id: i64,
    name: String,
    priority: i64,
    from_quantity: i64,
    price: Option<f64>,
    reduction: f64,
    reduction_type: String,
    reduction_tax: bool,
    valid_from: Option<DateTime<Utc>>,
    valid_to: Option<DateTime<Utc>>,
}

impl PriceRuleSummaryRow {
    fn into_domain(self) -> Result<PriceRuleSummary, RowError> {
        Ok(PriceRuleSummary {
            id: CatalogPriceRuleId::new(self.id)?,
            name: self.name,
            priority: self.priority,
            from_quantity: to_quantity(self.from_quantity)?,
            reduction: self.reduction,
            reduction_type: self.reduction_type.parse()?,
            reduction_tax_included: self.reduction_tax,
            price: self.price,
            validity: ValidityWindow {
                from: self.valid_from,
                to: self.valid_to,
            },
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EditableRuleRow {
    id: i64,
    shop_id: i64,
    priority: i64,
    currency_id: Option<i64>,
    country_id: Option<i64>,
    group_id: Option<i64>,
    from_quantity: i64,
    price: Option<f64>,
    reduction: f64,
    reduction_type: String,
    reduction_tax: bool,
    valid_from: Option<DateTime<Utc>>,
    valid_to: Option<DateTime<Utc>>,
}

impl EditableRuleRow {
    fn into_domain(
        self,
        names: BTreeMap<LanguageId, String>,
    ) -> Result<EditableCatalogPriceRule, RowError> {
        Ok(EditableCatalogPriceRule {
            id: CatalogPriceRuleId::new(self.id)?,
            shop_id: ShopId::new(self.shop_id)?,
            priority: self.priority,
            currency_id: self.currency_id,
            country_id: self.country_id,
            group_id: self.group_id,
            from_quantity: to_quantity(self.from_quantity)?,
            price: self.price,
            reduction: self.reduction,
            reduction_type: self.reduction_type.parse()?,
            reduction_tax_included: self.reduction_tax,
            validity: ValidityWindow {
                from: self.valid_from,
                to: self.valid_to,
            },
            names,
        })
    }
}

fn to_quantity(value: i64) -> Result<u32, RowError> {
    u32::try_from(value).map_err(|_| RowError::FromQuantity(value))
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
