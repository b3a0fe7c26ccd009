//! The storage contract shared by the `PostgreSQL` and in-memory backends.
//!
//! Generation, aggregation and the read-back API are written against
//! [`MileageStore`] so the same pipeline runs unchanged against a real
//! database or against [`crate::MemoryStore`] in tests.

use std::future::Future;

use chrono::NaiveDate;
use mileage_ledger::DailyTotals;
use mileage_types::{DailySummary, MemberId, MileageAccount, MileageEvent, MileageKind};

use crate::error::DbError;

/// Persistence operations for accounts, history and daily summaries.
pub trait MileageStore: Send + Sync {
    /// Insert account rows and return how many were written.
    fn insert_accounts(
        &self,
        accounts: &[MileageAccount],
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// Append history entries and return how many were written.
    ///
    /// Entry ids are assigned by the store; any `id` on the input is ignored.
    fn insert_events(
        &self,
        events: &[MileageEvent],
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// Delete every account, history entry and summary.
    fn reset(&self) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Fetch one account.
    fn find_account(
        &self,
        member_id: MemberId,
    ) -> impl Future<Output = Result<Option<MileageAccount>, DbError>> + Send;

    /// History of one member ordered by `occurred_at`, then id, optionally
    /// restricted to one kind.
    fn events_by_member(
        &self,
        member_id: MemberId,
        kind: Option<MileageKind>,
    ) -> impl Future<Output = Result<Vec<MileageEvent>, DbError>> + Send;

    /// Number of history entries of one member, optionally of one kind.
    fn count_events_by_member(
        &self,
        member_id: MemberId,
        kind: Option<MileageKind>,
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// Signed sum of history amounts per member, for members with entries.
    fn member_sums(&self) -> impl Future<Output = Result<Vec<(MemberId, i64)>, DbError>> + Send;

    /// Earn/use totals of the entries that occurred on `date` (UTC).
    fn daily_totals(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<DailyTotals, DbError>> + Send;

    /// Insert or replace the summary of `summary.summary_date`.
    ///
    /// An existing row keeps its `created_at`. Returns the stored row.
    fn upsert_summary(
        &self,
        summary: &DailySummary,
    ) -> impl Future<Output = Result<DailySummary, DbError>> + Send;

    /// Fetch the summary of one date.
    fn summary_for(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Option<DailySummary>, DbError>> + Send;

    /// Summaries in `[start, end]`, ascending by date.
    fn summaries_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<Vec<DailySummary>, DbError>> + Send;
}
