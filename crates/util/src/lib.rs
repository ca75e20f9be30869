pub mod config;

use std::env;

pub use config::{AppConfig, ConfigError, Environment};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://catalog-query.db?mode=rwc";

/// Loads environment variables from `.env` when available.
///
/// Missing files are ignored so the function is safe in production builds
/// where dotenv files are not deployed.
pub fn load_env_file() {
    let _ = dotenvy::dotenv();
}

/// Returns the SQLite connection string.
///
/// The value is resolved from the `DATABASE_URL` environment variable and
/// falls back to [`DEFAULT_DATABASE_URL`] when the variable is not set.
pub fn database_url() -> String {
    env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}
