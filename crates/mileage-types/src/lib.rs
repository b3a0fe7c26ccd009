//! Shared type definitions for the mileage ledger generator.
//!
//! This crate is the single source of truth for the records that flow
//! between the generator, the ledger bookkeeping, the storage layer and
//! the read-back API.
//!
//! # Modules
//!
//! - [`ids`] -- Dense member identifiers and run identifiers
//! - [`enums`] -- Ledger entry kinds
//! - [`structs`] -- Account, ledger entry and daily summary records

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{MileageKind, UnknownMileageKind};
pub use ids::{InvalidMemberId, MemberId, RunId};
pub use structs::{
    DESCRIPTION_ADJUSTMENT, DESCRIPTION_EARN, DESCRIPTION_INITIAL_GRANT, DESCRIPTION_USE,
    DailySummary, MileageAccount, MileageEvent,
};
