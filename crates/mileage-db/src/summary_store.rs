//! Daily summary persistence on `mileage_daily_summary`.

use chrono::{DateTime, NaiveDate, Utc};
use mileage_types::DailySummary;
use sqlx::PgPool;

use crate::error::DbError;

/// Operations on the `mileage_daily_summary` table.
pub struct SummaryStore<'a> {
    pool: &'a PgPool,
}

impl<'a> SummaryStore<'a> {
    /// Create a summary store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert the summary or overwrite the totals of an existing one.
    ///
    /// `created_at` of an existing row is preserved; everything else comes
    /// from `summary`. Returns the row as stored.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn upsert(&self, summary: &DailySummary) -> Result<DailySummary, DbError> {
        let row = sqlx::query_as::<_, SummaryRow>(
            r"INSERT INTO mileage_daily_summary
                  (summary_date, total_earn_amount, total_earn_count, total_use_amount,
                   total_use_count, net_amount, created_at, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
              ON CONFLICT (summary_date) DO UPDATE SET
                  total_earn_amount = EXCLUDED.total_earn_amount,
                  total_earn_count  = EXCLUDED.total_earn_count,
                  total_use_amount  = EXCLUDED.total_use_amount,
                  total_use_count   = EXCLUDED.total_use_count,
                  net_amount        = EXCLUDED.net_amount,
                  updated_at        = EXCLUDED.updated_at
              RETURNING summary_date, total_earn_amount, total_earn_count, total_use_amount,
                        total_use_count, net_amount, created_at, updated_at",
        )
        .bind(summary.summary_date)
        .bind(summary.total_earn_amount)
        .bind(summary.total_earn_count)
        .bind(summary.total_use_amount)
        .bind(summary.total_use_count)
        .bind(summary.net_amount)
        .bind(summary.created_at)
        .bind(summary.updated_at)
        .fetch_one(self.pool)
        .await?;

        tracing::debug!(date = %summary.summary_date, "Upserted daily summary");
        Ok(row.into())
    }

    /// Fetch the summary of one date.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, date: NaiveDate) -> Result<Option<DailySummary>, DbError> {
        let row = sqlx::query_as::<_, SummaryRow>(
            r"SELECT summary_date, total_earn_amount, total_earn_count, total_use_amount,
                     total_use_count, net_amount, created_at, updated_at
              FROM mileage_daily_summary
              WHERE summary_date = $1",
        )
        .bind(date)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Summaries in `[start, end]`, ascending by date.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailySummary>, DbError> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r"SELECT summary_date, total_earn_amount, total_earn_count, total_use_amount,
                     total_use_count, net_amount, created_at, updated_at
              FROM mileage_daily_summary
              WHERE summary_date BETWEEN $1 AND $2
              ORDER BY summary_date",
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// A row from the `mileage_daily_summary` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SummaryRow {
    /// Aggregated date.
    pub summary_date: NaiveDate,
    /// Sum of earn amounts.
    pub total_earn_amount: i64,
    /// Number of earn entries.
    pub total_earn_count: i64,
    /// Sum of use magnitudes.
    pub total_use_amount: i64,
    /// Number of use entries.
    pub total_use_count: i64,
    /// Earn minus use.
    pub net_amount: i64,
    /// First write.
    pub created_at: DateTime<Utc>,
    /// Last write.
    pub updated_at: DateTime<Utc>,
}

impl From<SummaryRow> for DailySummary {
    fn from(row: SummaryRow) -> Self {
        Self {
            summary_date: row.summary_date,
            total_earn_amount: row.total_earn_amount,
            total_earn_count: row.total_earn_count,
            total_use_amount: row.total_use_amount,
            total_use_count: row.total_use_count,
            net_amount: row.net_amount,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
