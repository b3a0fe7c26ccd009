//! Daily summary job.
//!
//! Folds a day's persisted history into a `mileage_daily_summary` row:
//! earn amount and count, use magnitude and count, and `net = earn - use`.
//! Re-running a day overwrites its totals but keeps the row's original
//! `created_at`.
//!
//! Closing adjustments are stamped with the reconciliation time, so they
//! belong to whatever day that is. When the horizon ends today (the
//! default) they fall on the final horizon day and its summary includes
//! them; with an `end_date` in the past they fall outside every horizon
//! day.

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use mileage_db::{DbError, MileageStore};
use mileage_types::DailySummary;

/// Errors that can occur while aggregating.
#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    /// A store call failed.
    #[error("store error: {0}")]
    Store(#[from] DbError),

    /// The range starts after it ends.
    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange {
        /// Requested first day.
        start: NaiveDate,
        /// Requested last day.
        end: NaiveDate,
    },
}

/// Computes and reads daily summaries against a store.
pub struct AggregationJob<'a, S> {
    store: &'a S,
}

impl<'a, S: MileageStore> AggregationJob<'a, S> {
    /// Create a job bound to `store`.
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Summarize one day and upsert the result.
    ///
    /// Returns `None` without writing when the day has no earn or use
    /// entries.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::Store`] if a store call fails.
    pub async fn aggregate_day(
        &self,
        date: NaiveDate,
    ) -> Result<Option<DailySummary>, AggregationError> {
        let totals = self.store.daily_totals(date).await?;
        if totals.is_empty() {
            warn!(date = %date, "No mileage history for date; summary skipped");
            return Ok(None);
        }

        let now = Utc::now();
        let stored = self
            .store
            .upsert_summary(&totals.into_summary(date, now, now))
            .await?;

        info!(
            date = %date,
            earn_amount = stored.total_earn_amount,
            earn_count = stored.total_earn_count,
            use_amount = stored.total_use_amount,
            use_count = stored.total_use_count,
            net = stored.net_amount,
            "Daily summary written"
        );
        Ok(Some(stored))
    }

    /// Summarize every day in `[start, end]`.
    ///
    /// Returns the number of days a summary was written for.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::InvalidRange`] if `start > end` and
    /// [`AggregationError::Store`] on the first failing day.
    pub async fn aggregate_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u32, AggregationError> {
        check_range(start, end)?;
        let mut aggregated: u32 = 0;
        for date in start.iter_days().take_while(|d| *d <= end) {
            if self.aggregate_day(date).await?.is_some() {
                aggregated = aggregated.saturating_add(1);
            }
        }
        info!(start = %start, end = %end, aggregated, "Aggregation range complete");
        Ok(aggregated)
    }

    /// The stored summary of one day.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::Store`] if the lookup fails.
    pub async fn summary_for(
        &self,
        date: NaiveDate,
    ) -> Result<Option<DailySummary>, AggregationError> {
        Ok(self.store.summary_for(date).await?)
    }

    /// Stored summaries in `[start, end]`, ascending by date.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::InvalidRange`] if `start > end` and
    /// [`AggregationError::Store`] if the lookup fails.
    pub async fn summaries_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailySummary>, AggregationError> {
        check_range(start, end)?;
        Ok(self.store.summaries_between(start, end).await?)
    }
}

fn check_range(start: NaiveDate, end: NaiveDate) -> Result<(), AggregationError> {
    if start > end {
        return Err(AggregationError::InvalidRange { start, end });
    }
    Ok(())
}
