//! Configuration, simulation and orchestration for the mileage generator.
//!
//! This crate turns a [`MileageConfig`] into a reconciled dataset and
//! keeps the daily summaries of that dataset up to date.
//!
//! # Modules
//!
//! - [`config`] -- Typed YAML configuration and validation
//! - [`horizon`] -- The simulated day range and the day-by-day driver
//! - [`simulator`] -- One day of randomized earn/use entries
//! - [`generation`] -- The run-once pipeline and its report
//! - [`aggregation`] -- Per-day earn/use summaries

pub mod aggregation;
pub mod config;
pub mod generation;
pub mod horizon;
pub mod simulator;

pub use aggregation::{AggregationError, AggregationJob};
pub use config::{
    AggregationConfig, ConfigError, DailyTransactionRange, GenerationConfig, LoggingConfig,
    MileageConfig, ObserverConfig, PersistenceConfig, StorageBackend, StorageConfig,
};
pub use generation::{GenerationError, GenerationPlan, GenerationReport, run_generation};
pub use horizon::{Horizon, HorizonDay, HorizonDriver};
pub use simulator::{DailyTransactionSimulator, DayStats, EntryChoice, choose_entry};
