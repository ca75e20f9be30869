use thiserror::Error;

use catalog_query_core::{
    catalog_price_rule::CatalogPriceRuleError, DispatchError, RegistrationError, ValidationError,
};
use catalog_query_storage::StorageError;
use catalog_query_util::ConfigError;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("dispatcher wiring failed: {0}")]
    Registration(#[from] RegistrationError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError<CatalogPriceRuleError>),
    #[error("failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}
