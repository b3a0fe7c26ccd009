//! Bounded write buffer between generation and the store.
//!
//! Generation produces rows one at a time; [`BatchPersister`] collects them
//! and hands them to the store in multi-row writes. Each buffer holds at most
//! `batch_size` rows: pushing the `batch_size`-th row flushes immediately,
//! and [`BatchPersister::flush`] writes whatever is left at the end of a
//! stage.
//!
//! ```text
//! push_account ─▶ [accounts ≤ B] ─┐
//!                                 ├─▶ MileageStore::insert_*
//! push_event   ─▶ [events   ≤ B] ─┘
//! ```

use mileage_types::{MileageAccount, MileageEvent};

use crate::error::DbError;
use crate::store::MileageStore;

// =========================================================================
// Error type
// =========================================================================

/// Errors that can occur while flushing buffered rows.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The store rejected a write.
    #[error("store write failed: {0}")]
    Store(#[from] DbError),

    /// The store acknowledged fewer rows than it was given.
    #[error("short write to {table}: expected {expected} rows, store wrote {written}")]
    ShortWrite {
        /// Which buffer was flushed.
        table: &'static str,
        /// Rows handed to the store.
        expected: u64,
        /// Rows the store reported as written.
        written: u64,
    },

    /// A zero batch size can never flush.
    #[error("batch size must be at least 1")]
    ZeroBatchSize,
}

// =========================================================================
// Stats
// =========================================================================

/// Counters of what a persister has written so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistStats {
    /// Account rows written.
    pub accounts_written: u64,
    /// History rows written.
    pub events_written: u64,
    /// Number of non-empty store writes.
    pub batches_flushed: u64,
}

// =========================================================================
// Persister
// =========================================================================

/// Buffers accounts and history entries and writes them in bounded batches.
pub struct BatchPersister<'a, S> {
    store: &'a S,
    batch_size: usize,
    accounts: Vec<MileageAccount>,
    events: Vec<MileageEvent>,
    stats: PersistStats,
}

impl<'a, S: MileageStore> BatchPersister<'a, S> {
    /// Create a persister writing to `store` in batches of `batch_size`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::ZeroBatchSize`] if `batch_size` is zero.
    pub fn new(store: &'a S, batch_size: usize) -> Result<Self, PersistError> {
        if batch_size == 0 {
            return Err(PersistError::ZeroBatchSize);
        }
        Ok(Self {
            store,
            batch_size,
            accounts: Vec::with_capacity(batch_size),
            events: Vec::with_capacity(batch_size),
            stats: PersistStats::default(),
        })
    }

    /// Configured batch size.
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Rows currently buffered (accounts plus events).
    pub const fn pending(&self) -> usize {
        self.accounts.len().saturating_add(self.events.len())
    }

    /// Counters so far.
    pub const fn stats(&self) -> PersistStats {
        self.stats
    }

    /// Buffer one account, flushing the account buffer when it is full.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] if a triggered flush fails.
    pub async fn push_account(&mut self, account: MileageAccount) -> Result<(), PersistError> {
        self.accounts.push(account);
        if self.accounts.len() >= self.batch_size {
            self.flush_accounts().await?;
        }
        Ok(())
    }

    /// Buffer one history entry, flushing the event buffer when it is full.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] if a triggered flush fails.
    pub async fn push_event(&mut self, event: MileageEvent) -> Result<(), PersistError> {
        self.events.push(event);
        if self.events.len() >= self.batch_size {
            self.flush_events().await?;
        }
        Ok(())
    }

    /// Write every buffered row: accounts first, then events.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] if either write fails. Rows of a failed
    /// write are dropped, not retried.
    pub async fn flush(&mut self) -> Result<PersistStats, PersistError> {
        self.flush_accounts().await?;
        self.flush_events().await?;
        Ok(self.stats)
    }

    async fn flush_accounts(&mut self) -> Result<(), PersistError> {
        if self.accounts.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.accounts);
        let written = self.store.insert_accounts(&batch).await?;
        check_written("mileage_account", batch.len(), written)?;

        self.stats.accounts_written = self.stats.accounts_written.saturating_add(written);
        self.stats.batches_flushed = self.stats.batches_flushed.saturating_add(1);
        self.accounts = Vec::with_capacity(self.batch_size);

        tracing::debug!(rows = written, "Flushed account batch");
        Ok(())
    }

    async fn flush_events(&mut self) -> Result<(), PersistError> {
        if self.events.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.events);
        let written = self.store.insert_events(&batch).await?;
        check_written("mileage_history", batch.len(), written)?;

        self.stats.events_written = self.stats.events_written.saturating_add(written);
        self.stats.batches_flushed = self.stats.batches_flushed.saturating_add(1);
        self.events = Vec::with_capacity(self.batch_size);

        tracing::debug!(rows = written, "Flushed history batch");
        Ok(())
    }
}

fn check_written(table: &'static str, expected: usize, written: u64) -> Result<(), PersistError> {
    let expected = u64::try_from(expected).unwrap_or(u64::MAX);
    if written == expected {
        Ok(())
    } else {
        Err(PersistError::ShortWrite {
            table,
            expected,
            written,
        })
    }
}
