//! Storage layer for the mileage ledger generator.
//!
//! Generation writes through a [`BatchPersister`] into any [`MileageStore`].
//! Two backends exist: [`PgMileageStore`] for `PostgreSQL` and
//! [`MemoryStore`] for tests and database-free runs.
//!
//! # Architecture
//!
//! ```text
//! Generation
//!     |
//!     +-- push rows --> BatchPersister (bounded buffers)
//!                           |
//!                           +-- MileageStore
//!                                 |-- PgMileageStore
//!                                 |     |-- AccountStore  (mileage_account)
//!                                 |     |-- HistoryStore  (mileage_history)
//!                                 |     +-- SummaryStore  (mileage_daily_summary)
//!                                 +-- MemoryStore
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and migrations
//! - [`account_store`], [`history_store`], [`summary_store`] -- table access
//! - [`store`] -- The [`MileageStore`] contract
//! - [`pg`] -- `PostgreSQL` implementation of the contract
//! - [`memory`] -- In-memory implementation of the contract
//! - [`batch`] -- Bounded batch persistence
//! - [`error`] -- Shared error types

pub mod account_store;
pub mod batch;
pub mod error;
pub mod history_store;
pub mod memory;
pub mod pg;
pub mod postgres;
pub mod store;
pub mod summary_store;

// Re-export primary types for convenience.
pub use account_store::{AccountRow, AccountStore};
pub use batch::{BatchPersister, PersistError, PersistStats};
pub use error::DbError;
pub use history_store::{HistoryRow, HistoryStore};
pub use memory::MemoryStore;
pub use pg::PgMileageStore;
pub use postgres::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_CONNECTIONS, PostgresConfig,
    PostgresPool,
};
pub use store::MileageStore;
pub use summary_store::{SummaryRow, SummaryStore};
