//! Read-back HTTP API for generated mileage datasets.
//!
//! This crate provides an Axum server that exposes the persisted
//! accounts, history and daily summaries, and lets an operator trigger
//! the daily summary job on demand.
//!
//! # Architecture
//!
//! Handlers are generic over [`MileageStore`](mileage_db::MileageStore)
//! and read straight from the store held in [`AppState`], so the same
//! router serves a `PostgreSQL` dataset or an in-memory one.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
