mod cli;
mod error;
mod handlers;
mod problem;
mod telemetry;
mod wiring;

use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use tracing::{debug, error, info};

use catalog_query_storage::Database;
use catalog_query_util::{load_env_file, AppConfig};

use crate::{
    cli::Cli,
    error::AppError,
    problem::{Problem, ProblemClass},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let problem = Problem::from(&err);
            if problem.class() == ProblemClass::WiringDefect {
                error!(stage = "app", problem = problem.problem_type(), error = %err, "dispatcher wiring defect");
            }
            eprintln!("{}", problem.to_json());
            problem.exit_code()
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    load_env_file();
    let config = AppConfig::from_env()?;
    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let database = Database::connect(&config.database_url, config.max_connections).await?;
    database.run_migrations().await?;

    let dispatcher = wiring::build_dispatcher(&database)?;
    info!(
        stage = "app",
        command = cli.command.name(),
        handlers = dispatcher.registered_requests().len(),
        "dispatcher ready"
    );

    let outcome = cli::execute(cli.command, &dispatcher, Utc::now()).await;
    debug!(
        stage = "telemetry",
        snapshot = %telemetry::render_metrics(&metrics),
        "metrics snapshot"
    );

    let output = outcome?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
