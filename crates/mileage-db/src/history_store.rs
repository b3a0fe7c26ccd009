//! History persistence: batch append and per-member / per-day reads on
//! `mileage_history`.
//!
//! Amounts are signed in storage (earn positive, use negative), so a plain
//! `SUM(amount)` per member is that member's ledger balance.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use mileage_ledger::DailyTotals;
use mileage_types::{MemberId, MileageEvent, MileageKind};
use sqlx::PgPool;

use crate::error::DbError;

/// Default batch size for history inserts.
const DEFAULT_BATCH_SIZE: usize = 1_000;

/// Operations on the `mileage_history` table.
pub struct HistoryStore<'a> {
    pool: &'a PgPool,
    batch_size: usize,
}

impl<'a> HistoryStore<'a> {
    /// Create a history store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the maximum number of rows per insert statement.
    #[must_use]
    pub const fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = if size == 0 { 1 } else { size };
        self
    }

    /// Batch-append history entries with one UNNEST insert per chunk.
    ///
    /// Ids come from the `BIGSERIAL` column. Each chunk commits in its own
    /// transaction. Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if an insert fails.
    pub async fn batch_insert(&self, events: &[MileageEvent]) -> Result<u64, DbError> {
        let mut written: u64 = 0;

        for chunk in events.chunks(self.batch_size) {
            let mut tx = self.pool.begin().await?;

            let len = chunk.len();
            let mut member_ids = Vec::with_capacity(len);
            let mut kinds = Vec::with_capacity(len);
            let mut amounts = Vec::with_capacity(len);
            let mut descriptions = Vec::with_capacity(len);
            let mut occurred = Vec::with_capacity(len);

            for event in chunk {
                member_ids.push(event.member_id.to_db());
                kinds.push(event.kind.as_db_str());
                amounts.push(event.amount);
                descriptions.push(event.description.as_str());
                occurred.push(event.occurred_at);
            }

            let result = sqlx::query(
                r"INSERT INTO mileage_history (member_id, kind, amount, description, occurred_at)
                  SELECT * FROM UNNEST($1::BIGINT[], $2::TEXT[], $3::BIGINT[], $4::TEXT[], $5::TIMESTAMPTZ[])",
            )
            .bind(&member_ids)
            .bind(&kinds)
            .bind(&amounts)
            .bind(&descriptions)
            .bind(&occurred)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            written = written.saturating_add(result.rows_affected());
        }

        tracing::debug!(count = written, "Inserted history entries (batch UNNEST)");
        Ok(written)
    }

    /// History of one member ordered by `occurred_at`, then id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails and
    /// [`DbError::InvalidRow`] if a row cannot be decoded.
    pub async fn by_member(
        &self,
        member_id: MemberId,
        kind: Option<MileageKind>,
    ) -> Result<Vec<MileageEvent>, DbError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r"SELECT id, member_id, kind, amount, description, occurred_at
              FROM mileage_history
              WHERE member_id = $1 AND ($2::TEXT IS NULL OR kind = $2)
              ORDER BY occurred_at, id",
        )
        .bind(member_id.to_db())
        .bind(kind.map(MileageKind::as_db_str))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(HistoryRow::into_event).collect()
    }

    /// Number of entries of one member, optionally of one kind.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn count_by_member(
        &self,
        member_id: MemberId,
        kind: Option<MileageKind>,
    ) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar(
            r"SELECT COUNT(*) FROM mileage_history
              WHERE member_id = $1 AND ($2::TEXT IS NULL OR kind = $2)",
        )
        .bind(member_id.to_db())
        .bind(kind.map(MileageKind::as_db_str))
        .fetch_one(self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Signed sum of amounts per member, ascending by member.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails and
    /// [`DbError::InvalidRow`] if a member id is out of range.
    pub async fn member_sums(&self) -> Result<Vec<(MemberId, i64)>, DbError> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r"SELECT member_id, SUM(amount)::BIGINT AS total
              FROM mileage_history
              GROUP BY member_id
              ORDER BY member_id",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|(raw, total)| {
                MemberId::from_db(raw)
                    .map(|member_id| (member_id, total))
                    .ok_or_else(|| DbError::InvalidRow {
                        table: "mileage_history",
                        reason: format!("member_id {raw} out of range"),
                    })
            })
            .collect()
    }

    /// Earn/use totals of the entries that occurred on `date` (UTC).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails and
    /// [`DbError::Config`] if `date` is the last representable day.
    pub async fn daily_totals(&self, date: NaiveDate) -> Result<DailyTotals, DbError> {
        let (start, end) = day_bounds(date)?;
        let row = sqlx::query_as::<_, DailyTotalsRow>(
            r"SELECT
                  COALESCE(SUM(amount) FILTER (WHERE kind = 'EARN'), 0)::BIGINT AS earn_amount,
                  COUNT(*) FILTER (WHERE kind = 'EARN') AS earn_count,
                  COALESCE(SUM(-amount) FILTER (WHERE kind = 'USE'), 0)::BIGINT AS use_amount,
                  COUNT(*) FILTER (WHERE kind = 'USE') AS use_count
              FROM mileage_history
              WHERE occurred_at >= $1 AND occurred_at < $2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(self.pool)
        .await?;

        Ok(DailyTotals {
            earn_amount: row.earn_amount,
            earn_count: row.earn_count,
            use_amount: row.use_amount,
            use_count: row.use_count,
        })
    }
}

/// Half-open UTC instant range `[midnight(date), midnight(date + 1))`.
///
/// # Errors
///
/// Returns [`DbError::Config`] if the following day is not representable.
pub fn day_bounds(date: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>), DbError> {
    let next = date
        .checked_add_days(Days::new(1))
        .ok_or_else(|| DbError::Config(format!("no day follows {date}")))?;
    Ok((
        date.and_time(NaiveTime::MIN).and_utc(),
        next.and_time(NaiveTime::MIN).and_utc(),
    ))
}

/// A row from the `mileage_history` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoryRow {
    /// Storage-assigned id.
    pub id: i64,
    /// Owning member.
    pub member_id: i64,
    /// Kind as stored (`EARN`, `USE`, `EXPIRE`).
    pub kind: String,
    /// Signed amount.
    pub amount: i64,
    /// Human-readable description.
    pub description: String,
    /// When the entry took effect.
    pub occurred_at: DateTime<Utc>,
}

impl HistoryRow {
    /// Convert the row into a domain entry.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRow`] for an out-of-range member id or an
    /// unknown kind.
    pub fn into_event(self) -> Result<MileageEvent, DbError> {
        let member_id = MemberId::from_db(self.member_id).ok_or_else(|| DbError::InvalidRow {
            table: "mileage_history",
            reason: format!("member_id {} out of range", self.member_id),
        })?;
        let kind = MileageKind::from_db_str(&self.kind).ok_or_else(|| DbError::InvalidRow {
            table: "mileage_history",
            reason: format!("unknown kind {:?}", self.kind),
        })?;
        Ok(MileageEvent {
            id: Some(self.id),
            member_id,
            kind,
            amount: self.amount,
            description: self.description,
            occurred_at: self.occurred_at,
        })
    }
}

/// Aggregate row of one day's earn/use activity.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
struct DailyTotalsRow {
    earn_amount: i64,
    earn_count: i64,
    use_amount: i64,
    use_count: i64,
}
