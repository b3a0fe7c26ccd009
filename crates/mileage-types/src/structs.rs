//! Core record structs: accounts, ledger entries and daily summaries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::MileageKind;
use crate::ids::MemberId;

/// Description attached to organically generated earn entries.
pub const DESCRIPTION_EARN: &str = "Mileage earned";

/// Description attached to organically generated use entries.
pub const DESCRIPTION_USE: &str = "Mileage used";

/// Description attached to reconciliation entries for active accounts.
pub const DESCRIPTION_ADJUSTMENT: &str = "Balance adjustment";

/// Description attached to reconciliation entries for accounts that saw
/// no organic activity.
pub const DESCRIPTION_INITIAL_GRANT: &str = "Initial grant";

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// The balance row of one mileage account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MileageAccount {
    /// Owning member.
    pub member_id: MemberId,
    /// Ledger balance. Set once at creation to the member's target.
    pub balance: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Ledger entry
// ---------------------------------------------------------------------------

/// One mileage ledger entry (a history record).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MileageEvent {
    /// Storage-assigned identifier; `None` until persisted.
    pub id: Option<i64>,
    /// Member the entry belongs to.
    pub member_id: MemberId,
    /// Entry kind.
    pub kind: MileageKind,
    /// Signed amount: positive for `Earn`, negative otherwise.
    pub amount: i64,
    /// Human-readable description.
    pub description: String,
    /// When the entry took effect.
    pub occurred_at: DateTime<Utc>,
}

impl MileageEvent {
    /// Build an earn entry crediting `magnitude` points.
    pub fn earn(
        member_id: MemberId,
        magnitude: i64,
        description: &str,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            member_id,
            kind: MileageKind::Earn,
            amount: magnitude.saturating_abs(),
            description: description.to_owned(),
            occurred_at,
        }
    }

    /// Build a use entry debiting `magnitude` points.
    pub fn spend(
        member_id: MemberId,
        magnitude: i64,
        description: &str,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            member_id,
            kind: MileageKind::Use,
            amount: magnitude.saturating_abs().saturating_neg(),
            description: description.to_owned(),
            occurred_at,
        }
    }

    /// The calendar day (UTC) the entry belongs to.
    pub fn day(&self) -> NaiveDate {
        self.occurred_at.date_naive()
    }
}

// ---------------------------------------------------------------------------
// Daily summary
// ---------------------------------------------------------------------------

/// Per-day totals of earn and use activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    /// The aggregated calendar day.
    pub summary_date: NaiveDate,
    /// Sum of earn amounts.
    pub total_earn_amount: i64,
    /// Number of earn entries.
    pub total_earn_count: i64,
    /// Sum of use amounts, as a positive magnitude.
    pub total_use_amount: i64,
    /// Number of use entries.
    pub total_use_count: i64,
    /// `total_earn_amount - total_use_amount`.
    pub net_amount: i64,
    /// When the summary row was first written.
    pub created_at: DateTime<Utc>,
    /// When the summary row was last written.
    pub updated_at: DateTime<Utc>,
}
