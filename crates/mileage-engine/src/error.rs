//! Error types for the generator binary.
//!
//! [`EngineError`] wraps every failure mode of startup, generation and
//! serving so `main` can propagate with `?`.

/// Top-level error for the generator binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: mileage_core::ConfigError,
    },

    /// Connecting to or migrating the database failed.
    #[error("database error: {source}")]
    Database {
        /// The underlying database error.
        #[from]
        source: mileage_db::DbError,
    },

    /// The generation run failed.
    #[error("generation error: {source}")]
    Generation {
        /// The underlying generation error.
        #[from]
        source: mileage_core::GenerationError,
    },

    /// The post-run aggregation failed.
    #[error("aggregation error: {source}")]
    Aggregation {
        /// The underlying aggregation error.
        #[from]
        source: mileage_core::AggregationError,
    },

    /// The read-back API failed to start or stopped with an error.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying server error.
        #[from]
        source: mileage_observer::ServerError,
    },
}
