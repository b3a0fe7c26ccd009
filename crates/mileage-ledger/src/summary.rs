//! Per-day earn/use totals.
//!
//! A [`DailyTotals`] folds the entries of one calendar day into counts and
//! amounts. Use amounts are stored as positive magnitudes, so
//! `net = earn - use` equals the signed sum of the day's earn and use
//! entries. `Expire` entries are not part of either column.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use mileage_types::{DailySummary, MileageEvent, MileageKind};

/// Running totals of one day's earn and use entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DailyTotals {
    /// Sum of earn amounts.
    pub earn_amount: i64,
    /// Number of earn entries.
    pub earn_count: i64,
    /// Sum of use magnitudes.
    pub use_amount: i64,
    /// Number of use entries.
    pub use_count: i64,
}

impl DailyTotals {
    /// Fold one entry into the totals. Saturates rather than wrapping.
    pub fn add(&mut self, event: &MileageEvent) {
        match event.kind {
            MileageKind::Earn => {
                self.earn_amount = self.earn_amount.saturating_add(event.amount);
                self.earn_count = self.earn_count.saturating_add(1);
            }
            MileageKind::Use => {
                self.use_amount = self.use_amount.saturating_add(event.amount.saturating_abs());
                self.use_count = self.use_count.saturating_add(1);
            }
            MileageKind::Expire => {}
        }
    }

    /// Whether no earn or use entry was folded in.
    pub const fn is_empty(&self) -> bool {
        self.earn_count == 0 && self.use_count == 0
    }

    /// `earn_amount - use_amount`.
    pub const fn net(&self) -> i64 {
        self.earn_amount.saturating_sub(self.use_amount)
    }

    /// Turn the totals into a summary row for `date`.
    pub const fn into_summary(
        self,
        date: NaiveDate,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> DailySummary {
        DailySummary {
            summary_date: date,
            total_earn_amount: self.earn_amount,
            total_earn_count: self.earn_count,
            total_use_amount: self.use_amount,
            total_use_count: self.use_count,
            net_amount: self.net(),
            created_at,
            updated_at,
        }
    }
}

/// Group entries by calendar day (UTC) and fold each group.
pub fn totals_by_day<'a>(
    events: impl IntoIterator<Item = &'a MileageEvent>,
) -> BTreeMap<NaiveDate, DailyTotals> {
    let mut days: BTreeMap<NaiveDate, DailyTotals> = BTreeMap::new();
    for event in events {
        days.entry(event.day()).or_default().add(event);
    }
    days
}

/// Build the summary of `date` from a set of entries.
///
/// Entries on other days are ignored. Returns `None` when the day has no
/// earn or use entries.
pub fn summarize_events<'a>(
    date: NaiveDate,
    events: impl IntoIterator<Item = &'a MileageEvent>,
    now: DateTime<Utc>,
) -> Option<DailySummary> {
    let mut totals = DailyTotals::default();
    for event in events.into_iter().filter(|e| e.day() == date) {
        totals.add(event);
    }
    if totals.is_empty() {
        return None;
    }
    Some(totals.into_summary(date, now, now))
}
