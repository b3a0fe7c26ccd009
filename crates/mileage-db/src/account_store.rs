//! Account persistence: batch insert and point lookup on `mileage_account`.

use chrono::{DateTime, Utc};
use mileage_types::{MemberId, MileageAccount};
use sqlx::PgPool;

use crate::error::DbError;

/// Default batch size for account inserts.
const DEFAULT_BATCH_SIZE: usize = 1_000;

/// Operations on the `mileage_account` table.
pub struct AccountStore<'a> {
    pool: &'a PgPool,
    batch_size: usize,
}

impl<'a> AccountStore<'a> {
    /// Create an account store bound to a connection pool.
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

    /// Batch-insert account rows with one UNNEST insert per chunk.
    ///
    /// Each chunk commits in its own transaction. Returns the number of
    /// rows written.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if an insert fails, including a
    /// primary-key violation for an existing member.
    pub async fn batch_insert(&self, accounts: &[MileageAccount]) -> Result<u64, DbError> {
        let mut written: u64 = 0;

        for chunk in accounts.chunks(self.batch_size) {
            let mut tx = self.pool.begin().await?;

            let len = chunk.len();
            let mut member_ids = Vec::with_capacity(len);
            let mut balances = Vec::with_capacity(len);
            let mut created = Vec::with_capacity(len);
            let mut updated = Vec::with_capacity(len);

            for account in chunk {
                member_ids.push(account.member_id.to_db());
                balances.push(account.balance);
                created.push(account.created_at);
                updated.push(account.updated_at);
            }

            let result = sqlx::query(
                r"INSERT INTO mileage_account (member_id, balance, created_at, updated_at)
                  SELECT * FROM UNNEST($1::BIGINT[], $2::BIGINT[], $3::TIMESTAMPTZ[], $4::TIMESTAMPTZ[])",
            )
            .bind(&member_ids)
            .bind(&balances)
            .bind(&created)
            .bind(&updated)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            written = written.saturating_add(result.rows_affected());
        }

        tracing::debug!(count = written, "Inserted accounts (batch UNNEST)");
        Ok(written)
    }

    /// Fetch the account of one member.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails and
    /// [`DbError::InvalidRow`] if the stored member id is out of range.
    pub async fn find(&self, member_id: MemberId) -> Result<Option<MileageAccount>, DbError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r"SELECT member_id, balance, created_at, updated_at
              FROM mileage_account
              WHERE member_id = $1",
        )
        .bind(member_id.to_db())
        .fetch_optional(self.pool)
        .await?;

        row.map(AccountRow::into_account).transpose()
    }
}

/// A row from the `mileage_account` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    /// Owning member.
    pub member_id: i64,
    /// Stored balance.
    pub balance: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl AccountRow {
    /// Convert the row into a domain account.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRow`] if `member_id` is not a valid member.
    pub fn into_account(self) -> Result<MileageAccount, DbError> {
        let member_id = MemberId::from_db(self.member_id).ok_or_else(|| DbError::InvalidRow {
            table: "mileage_account",
            reason: format!("member_id {} out of range", self.member_id),
        })?;
        Ok(MileageAccount {
            member_id,
            balance: self.balance,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
