//! Target balances, running totals and reconciliation for the mileage ledger.
//!
//! Every generated ledger entry for a member contributes to that member's
//! running total. Generation is free to wander during the horizon, but once
//! it ends the per-member sum of all entries must equal the member's target
//! balance exactly. This crate owns the arithmetic behind that guarantee.
//!
//! # Modules
//!
//! - [`targets`] -- [`TargetBalances`]: deterministic per-member targets.
//! - [`accumulated`] -- [`AccumulatedBalances`]: dense running totals.
//! - [`reconcile`] -- Closing adjustments that force totals onto targets.
//! - [`verification`] -- Post-run check of persisted sums against targets.
//! - [`summary`] -- Per-day earn/use totals.
//!
//! # Invariant
//!
//! For every member `m` in `[1, N]`:
//!
//! ```text
//! sum(amount of every entry for m) == target(m)
//! ```
//!
//! # Usage
//!
//! ```
//! use chrono::Utc;
//! use mileage_ledger::{AccumulatedBalances, TargetBalances, reconcile};
//! use mileage_types::MemberId;
//!
//! let targets = TargetBalances::assign(5, 100_000).ok().unwrap_or_default();
//! let mut running = AccumulatedBalances::new(targets.len());
//! running.record(MemberId::FIRST, 35_000).ok();
//!
//! let adjustments: Vec<_> = reconcile::adjustments(&targets, &running, Utc::now())
//!     .filter_map(Result::ok)
//!     .collect();
//!
//! // Member 1 is over target; members 2..=5 get an initial grant.
//! assert_eq!(adjustments.len(), 5);
//! ```

pub mod accumulated;
pub mod reconcile;
pub mod summary;
pub mod targets;
pub mod verification;

// Re-export primary types at crate root.
pub use accumulated::AccumulatedBalances;
pub use reconcile::{Adjustment, AdjustmentReason};
pub use summary::{DailyTotals, summarize_events, totals_by_day};
pub use targets::TargetBalances;
pub use verification::{BalanceMismatch, VerificationResult, verify_events, verify_member_sums};

use mileage_types::MemberId;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur in ledger bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The population must contain at least one account.
    #[error("account population must contain at least one member")]
    EmptyPopulation,

    /// The maximum balance must not be negative.
    #[error("maximum balance must be non-negative, got {max_balance}")]
    NegativeMaxBalance {
        /// The rejected maximum.
        max_balance: i64,
    },

    /// A member outside `[1, N]` was referenced.
    #[error("member {member_id} is outside the population of {population}")]
    UnknownMember {
        /// The offending member.
        member_id: MemberId,
        /// Population size.
        population: usize,
    },

    /// A running total left the `i64` range.
    #[error("arithmetic overflow while {context}")]
    Overflow {
        /// What was being computed.
        context: &'static str,
    },
}
