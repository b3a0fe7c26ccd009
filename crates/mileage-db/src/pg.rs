//! [`MileageStore`] backed by `PostgreSQL`.

use chrono::NaiveDate;
use mileage_ledger::DailyTotals;
use mileage_types::{DailySummary, MemberId, MileageAccount, MileageEvent, MileageKind};

use crate::account_store::AccountStore;
use crate::error::DbError;
use crate::history_store::HistoryStore;
use crate::postgres::PostgresPool;
use crate::store::MileageStore;
use crate::summary_store::SummaryStore;

/// `PostgreSQL` implementation of [`MileageStore`].
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct PgMileageStore {
    pool: PostgresPool,
    batch_size: usize,
}

impl PgMileageStore {
    /// Wrap a connected pool. `batch_size` caps the rows per insert statement.
    pub const fn new(pool: PostgresPool, batch_size: usize) -> Self {
        Self { pool, batch_size }
    }

    /// The underlying pool.
    pub const fn pool(&self) -> &PostgresPool {
        &self.pool
    }

    fn accounts(&self) -> AccountStore<'_> {
        AccountStore::new(self.pool.pool()).with_batch_size(self.batch_size)
    }

    fn history(&self) -> HistoryStore<'_> {
        HistoryStore::new(self.pool.pool()).with_batch_size(self.batch_size)
    }

    fn summaries(&self) -> SummaryStore<'_> {
        SummaryStore::new(self.pool.pool())
    }
}

impl MileageStore for PgMileageStore {
    async fn insert_accounts(&self, accounts: &[MileageAccount]) -> Result<u64, DbError> {
        self.accounts().batch_insert(accounts).await
    }

    async fn insert_events(&self, events: &[MileageEvent]) -> Result<u64, DbError> {
        self.history().batch_insert(events).await
    }

    async fn reset(&self) -> Result<(), DbError> {
        sqlx::query(
            "TRUNCATE mileage_history, mileage_account, mileage_daily_summary RESTART IDENTITY",
        )
        .execute(self.pool.pool())
        .await?;
        tracing::info!("Cleared mileage tables");
        Ok(())
    }

    async fn find_account(&self, member_id: MemberId) -> Result<Option<MileageAccount>, DbError> {
        self.accounts().find(member_id).await
    }

    async fn events_by_member(
        &self,
        member_id: MemberId,
        kind: Option<MileageKind>,
    ) -> Result<Vec<MileageEvent>, DbError> {
        self.history().by_member(member_id, kind).await
    }

    async fn count_events_by_member(
        &self,
        member_id: MemberId,
        kind: Option<MileageKind>,
    ) -> Result<u64, DbError> {
        self.history().count_by_member(member_id, kind).await
    }

    async fn member_sums(&self) -> Result<Vec<(MemberId, i64)>, DbError> {
        self.history().member_sums().await
    }

    async fn daily_totals(&self, date: NaiveDate) -> Result<DailyTotals, DbError> {
        self.history().daily_totals(date).await
    }

    async fn upsert_summary(&self, summary: &DailySummary) -> Result<DailySummary, DbError> {
        self.summaries().upsert(summary).await
    }

    async fn summary_for(&self, date: NaiveDate) -> Result<Option<DailySummary>, DbError> {
        self.summaries().get(date).await
    }

    async fn summaries_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailySummary>, DbError> {
        self.summaries().between(start, end).await
    }
}
