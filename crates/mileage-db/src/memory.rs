//! In-memory [`MileageStore`] for tests and database-free runs.
//!
//! Mirrors the `PostgreSQL` semantics that callers rely on: ids are
//! assigned sequentially from 1, a duplicate account is a conflict,
//! history reads are ordered by `occurred_at` then id, and an upserted
//! summary keeps its original `created_at`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use mileage_ledger::DailyTotals;
use mileage_types::{DailySummary, MemberId, MileageAccount, MileageEvent, MileageKind};
use tokio::sync::RwLock;

use crate::error::DbError;
use crate::store::MileageStore;

#[derive(Debug, Default)]
struct MemoryState {
    accounts: BTreeMap<MemberId, MileageAccount>,
    events: Vec<MileageEvent>,
    next_event_id: i64,
    summaries: BTreeMap<NaiveDate, DailySummary>,
    write_sizes: Vec<usize>,
}

/// A [`MileageStore`] that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    pub async fn account_count(&self) -> usize {
        self.state.read().await.accounts.len()
    }

    /// Number of stored history entries.
    pub async fn event_count(&self) -> usize {
        self.state.read().await.events.len()
    }

    /// Every stored history entry in insertion order.
    pub async fn events(&self) -> Vec<MileageEvent> {
        self.state.read().await.events.clone()
    }

    /// Row count of every non-empty insert call, in call order.
    pub async fn write_sizes(&self) -> Vec<usize> {
        self.state.read().await.write_sizes.clone()
    }
}

impl MileageStore for MemoryStore {
    async fn insert_accounts(&self, accounts: &[MileageAccount]) -> Result<u64, DbError> {
        let mut state = self.state.write().await;
        if let Some(existing) = accounts
            .iter()
            .find(|a| state.accounts.contains_key(&a.member_id))
        {
            return Err(DbError::Conflict(format!(
                "account for member {} already exists",
                existing.member_id
            )));
        }
        for account in accounts {
            state.accounts.insert(account.member_id, account.clone());
        }
        if !accounts.is_empty() {
            state.write_sizes.push(accounts.len());
        }
        Ok(u64::try_from(accounts.len()).unwrap_or(u64::MAX))
    }

    async fn insert_events(&self, events: &[MileageEvent]) -> Result<u64, DbError> {
        let mut state = self.state.write().await;
        for event in events {
            state.next_event_id = state.next_event_id.saturating_add(1);
            let mut stored = event.clone();
            stored.id = Some(state.next_event_id);
            state.events.push(stored);
        }
        if !events.is_empty() {
            state.write_sizes.push(events.len());
        }
        Ok(u64::try_from(events.len()).unwrap_or(u64::MAX))
    }

    async fn reset(&self) -> Result<(), DbError> {
        *self.state.write().await = MemoryState::default();
        Ok(())
    }

    async fn find_account(&self, member_id: MemberId) -> Result<Option<MileageAccount>, DbError> {
        Ok(self.state.read().await.accounts.get(&member_id).cloned())
    }

    async fn events_by_member(
        &self,
        member_id: MemberId,
        kind: Option<MileageKind>,
    ) -> Result<Vec<MileageEvent>, DbError> {
        let state = self.state.read().await;
        let mut events: Vec<MileageEvent> = state
            .events
            .iter()
            .filter(|e| e.member_id == member_id && kind.is_none_or(|k| e.kind == k))
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.occurred_at, e.id));
        Ok(events)
    }

    async fn count_events_by_member(
        &self,
        member_id: MemberId,
        kind: Option<MileageKind>,
    ) -> Result<u64, DbError> {
        let state = self.state.read().await;
        let count = state
            .events
            .iter()
            .filter(|e| e.member_id == member_id && kind.is_none_or(|k| e.kind == k))
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn member_sums(&self) -> Result<Vec<(MemberId, i64)>, DbError> {
        let state = self.state.read().await;
        let mut sums: BTreeMap<MemberId, i64> = BTreeMap::new();
        for event in &state.events {
            let total = sums.entry(event.member_id).or_insert(0);
            *total = total.saturating_add(event.amount);
        }
        Ok(sums.into_iter().collect())
    }

    async fn daily_totals(&self, date: NaiveDate) -> Result<DailyTotals, DbError> {
        let state = self.state.read().await;
        let mut totals = DailyTotals::default();
        for event in state.events.iter().filter(|e| e.day() == date) {
            totals.add(event);
        }
        Ok(totals)
    }

    async fn upsert_summary(&self, summary: &DailySummary) -> Result<DailySummary, DbError> {
        let mut state = self.state.write().await;
        let mut stored = summary.clone();
        if let Some(existing) = state.summaries.get(&summary.summary_date) {
            stored.created_at = existing.created_at;
        }
        state.summaries.insert(stored.summary_date, stored.clone());
        Ok(stored)
    }

    async fn summary_for(&self, date: NaiveDate) -> Result<Option<DailySummary>, DbError> {
        Ok(self.state.read().await.summaries.get(&date).cloned())
    }

    async fn summaries_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailySummary>, DbError> {
        if start > end {
            return Ok(Vec::new());
        }
        Ok(self
            .state
            .read()
            .await
            .summaries
            .range(start..=end)
            .map(|(_, s)| s.clone())
            .collect())
    }
}
