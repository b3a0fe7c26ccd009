//! Generator binary for the mileage ledger dataset.
//!
//! Loads configuration, produces one reconciled dataset and optionally
//! summarizes it and serves it over HTTP.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `mileage-config.yaml` (or `$MILEAGE_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Resolve the generation plan
//! 4. Open the configured store (`PostgreSQL` with migrations, or memory)
//! 5. Run generation and log the report
//! 6. Optionally aggregate daily summaries over the horizon
//! 7. Optionally serve the read-back API until `Ctrl-C`

mod error;
mod logging;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mileage_core::{
    AggregationJob, GenerationPlan, MileageConfig, StorageBackend, run_generation,
};
use mileage_db::{MemoryStore, MileageStore, PgMileageStore, PostgresConfig, PostgresPool};
use mileage_observer::{AppState, ServerConfig};
use tracing::{debug, info, warn};

use crate::error::EngineError;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, storage, generation, aggregation or
/// the API server fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let (config, loaded_from) = load_config()?;

    // 2. Initialize structured logging.
    logging::init(&config.logging);
    info!("mileage-engine starting");
    match loaded_from {
        Some(path) => info!(path = %path, "Configuration loaded"),
        None => info!("Config file not found, using defaults"),
    }

    // 3. Resolve the plan.
    let plan = GenerationPlan::from_config(&config, Utc::now().date_naive())?;

    // 4. Open the store and run.
    match config.storage.backend {
        StorageBackend::Postgres => {
            let storage = &config.storage;
            let pg_config = PostgresConfig::new(&storage.postgres_url)
                .with_max_connections(storage.max_connections)
                .with_connect_timeout(Duration::from_secs(storage.connect_timeout_secs))
                .with_idle_timeout(Duration::from_secs(storage.idle_timeout_secs));
            let pool = PostgresPool::connect(&pg_config).await?;
            pool.run_migrations().await?;
            let store = PgMileageStore::new(pool.clone(), plan.batch_size);
            let outcome = execute(store, &config, &plan).await;
            pool.close().await;
            outcome
        }
        StorageBackend::Memory => {
            warn!("Using the in-memory store; the dataset is lost on exit");
            execute(MemoryStore::new(), &config, &plan).await
        }
    }
}

/// Load configuration from the resolved path, or defaults if absent.
///
/// Returns the configuration and the path it was read from.
fn load_config() -> Result<(MileageConfig, Option<String>), EngineError> {
    let path = MileageConfig::resolve_path();
    if path.exists() {
        let config = MileageConfig::from_file(&path)?;
        Ok((config, Some(path.display().to_string())))
    } else {
        Ok((MileageConfig::parse("")?, None))
    }
}

/// Steps 5 to 7 against an opened store.
async fn execute<S: MileageStore + 'static>(
    store: S,
    config: &MileageConfig,
    plan: &GenerationPlan,
) -> Result<(), EngineError> {
    // 5. Generate.
    let report = run_generation(&store, plan).await?;
    info!(
        run_id = %report.run_id,
        seed = report.seed,
        start = %report.start_date,
        end = %report.end_date,
        accounts = report.accounts_created,
        organic_events = report.organic_events,
        corrections = report.corrections,
        initial_grants = report.initial_grants,
        batches = report.batches_flushed,
        elapsed_ms = report.elapsed_ms,
        "Dataset generated"
    );
    match serde_json::to_string(&report) {
        Ok(json) => debug!(report = %json, "Generation report"),
        Err(e) => warn!(error = %e, "Failed to serialize generation report"),
    }

    // 6. Aggregate.
    if config.aggregation.after_generation {
        let days = AggregationJob::new(&store)
            .aggregate_range(report.start_date, report.end_date)
            .await?;
        info!(days, "Daily summaries written");
    }

    // 7. Serve.
    if config.observer.enabled {
        let server_config = ServerConfig::from(&config.observer);
        let state = Arc::new(AppState::with_report(store, report));
        mileage_observer::start_server(&server_config, state).await?;
    }

    info!("mileage-engine finished");
    Ok(())
}
