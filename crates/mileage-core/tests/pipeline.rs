//! End-to-end generation runs against the in-memory store.
//!
//! Populations are kept small so every run finishes in milliseconds while
//! still spanning several days, several batches and every adjustment path.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::panic
)]

use chrono::NaiveDate;
use mileage_core::{
    AggregationJob, ConfigError, DailyTransactionRange, GenerationError, GenerationPlan, Horizon,
    run_generation,
};
use mileage_db::{DbError, MemoryStore, MileageStore, PersistError};
use mileage_ledger::{DailyTotals, TargetBalances, verify_member_sums};
use mileage_types::{
    DESCRIPTION_EARN, DESCRIPTION_USE, DailySummary, MemberId, MileageAccount, MileageEvent,
    MileageKind,
};

fn end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

fn plan(accounts: u32, days: u32, seed: u64) -> GenerationPlan {
    GenerationPlan {
        account_count: accounts,
        max_balance: 5_000,
        horizon: Horizon::ending(end_date(), days).unwrap(),
        daily_transactions: DailyTransactionRange { min: 20, max: 60 },
        seed: Some(seed),
        batch_size: 16,
        reset_before_run: true,
        verify_after_run: true,
    }
}

fn targets_of(plan: &GenerationPlan) -> TargetBalances {
    TargetBalances::assign(plan.account_count, plan.max_balance).unwrap()
}

#[tokio::test]
async fn every_member_lands_on_its_target() {
    for seed in [1, 2, 3, 42, 1_000] {
        let store = MemoryStore::new();
        let plan = plan(25, 4, seed);
        run_generation(&store, &plan).await.unwrap();

        let sums = store.member_sums().await.unwrap();
        assert!(
            verify_member_sums(&targets_of(&plan), &sums).is_balanced(),
            "seed {seed} left a member off target"
        );
    }
}

#[tokio::test]
async fn five_member_targets() {
    let store = MemoryStore::new();
    let mut plan = plan(5, 2, 11);
    plan.max_balance = 100_000;
    run_generation(&store, &plan).await.unwrap();

    let sums = store.member_sums().await.unwrap();
    let by_member: Vec<i64> = (1..=5)
        .map(|raw| {
            let member = MemberId::new(raw).unwrap();
            sums.iter()
                .find(|(m, _)| *m == member)
                .map_or(0, |(_, sum)| *sum)
        })
        .collect();
    assert_eq!(by_member, vec![20_000, 40_000, 60_000, 80_000, 100_000]);
}

#[tokio::test]
async fn single_member_single_day() {
    let store = MemoryStore::new();
    let plan = plan(1, 1, 5);
    let report = run_generation(&store, &plan).await.unwrap();

    assert_eq!(report.accounts_created, 1);
    assert_eq!(report.days.len(), 1);
    assert!(report.days[0].is_final);
    assert_eq!(report.start_date, report.end_date);

    let sums = store.member_sums().await.unwrap();
    assert_eq!(sums, vec![(MemberId::FIRST, 5_000)]);
}

#[tokio::test]
async fn idle_horizon_is_settled_by_initial_grants() {
    let store = MemoryStore::new();
    let mut plan = plan(4, 3, 8);
    plan.daily_transactions = DailyTransactionRange { min: 0, max: 0 };
    let report = run_generation(&store, &plan).await.unwrap();

    assert_eq!(report.organic_events, 0);
    assert_eq!(report.corrections, 0);
    // Every target is non-zero for max_balance 5_000 and four members.
    assert_eq!(report.initial_grants, 4);
    for event in store.events().await {
        assert_eq!(event.kind, MileageKind::Earn);
    }
}

#[tokio::test]
async fn same_seed_reproduces_entries() {
    let first = MemoryStore::new();
    let second = MemoryStore::new();
    let plan = plan(10, 3, 77);
    run_generation(&first, &plan).await.unwrap();
    run_generation(&second, &plan).await.unwrap();

    let shape = |events: Vec<MileageEvent>| -> Vec<(MemberId, i64)> {
        events.into_iter().map(|e| (e.member_id, e.amount)).collect()
    };
    assert_eq!(shape(first.events().await), shape(second.events().await));
}

#[tokio::test]
async fn different_seeds_differ_but_settle_identically() {
    let first = MemoryStore::new();
    let second = MemoryStore::new();
    run_generation(&first, &plan(10, 3, 1)).await.unwrap();
    run_generation(&second, &plan(10, 3, 2)).await.unwrap();

    let amounts = |events: Vec<MileageEvent>| -> Vec<i64> {
        events.into_iter().map(|e| e.amount).collect()
    };
    assert_ne!(amounts(first.events().await), amounts(second.events().await));
    assert_eq!(
        first.member_sums().await.unwrap(),
        second.member_sums().await.unwrap()
    );
}

#[tokio::test]
async fn writes_never_exceed_batch_size() {
    let store = MemoryStore::new();
    let plan = plan(30, 5, 9);
    let report = run_generation(&store, &plan).await.unwrap();

    let sizes = store.write_sizes().await;
    assert!(!sizes.is_empty());
    assert!(sizes.iter().all(|size| *size <= plan.batch_size));
    assert_eq!(
        u64::try_from(sizes.len()).unwrap(),
        report.batches_flushed
    );
}

#[tokio::test]
async fn report_matches_store_contents() {
    let store = MemoryStore::new();
    let plan = plan(20, 4, 123);
    let report = run_generation(&store, &plan).await.unwrap();

    assert_eq!(report.seed, 123);
    assert_eq!(report.accounts_created, 20);
    assert_eq!(store.account_count().await, 20);
    assert_eq!(
        u64::try_from(store.event_count().await).unwrap(),
        report.total_events()
    );

    let dates: Vec<NaiveDate> = report.days.iter().map(|d| d.date).collect();
    let expected: Vec<NaiveDate> = plan.horizon.iter().map(|d| d.date).collect();
    assert_eq!(dates, expected);

    for day in &report.days {
        assert!((20..=60).contains(&day.transactions));
        assert_eq!(day.earn_count + day.use_count, day.transactions);
    }
}

#[tokio::test]
async fn organic_entries_stay_inside_the_horizon() {
    let store = MemoryStore::new();
    let plan = plan(12, 3, 31);
    let report = run_generation(&store, &plan).await.unwrap();

    let organic: Vec<MileageEvent> = store
        .events()
        .await
        .into_iter()
        .filter(|e| e.description == DESCRIPTION_EARN || e.description == DESCRIPTION_USE)
        .collect();
    assert_eq!(u64::try_from(organic.len()).unwrap(), report.organic_events);
    for event in &organic {
        assert!(event.day() >= plan.horizon.start());
        assert!(event.day() <= plan.horizon.end());
        assert_eq!(event.kind.is_credit(), event.amount > 0);
    }
}

#[tokio::test]
async fn reset_allows_rerun() {
    let store = MemoryStore::new();
    let plan = plan(8, 2, 4);
    run_generation(&store, &plan).await.unwrap();
    let report = run_generation(&store, &plan).await.unwrap();

    assert_eq!(store.account_count().await, 8);
    assert_eq!(
        u64::try_from(store.event_count().await).unwrap(),
        report.total_events()
    );
}

#[tokio::test]
async fn rerun_without_reset_conflicts() {
    let store = MemoryStore::new();
    let mut plan = plan(8, 2, 4);
    run_generation(&store, &plan).await.unwrap();

    plan.reset_before_run = false;
    let result = run_generation(&store, &plan).await;
    assert!(matches!(
        result,
        Err(GenerationError::Persist(PersistError::Store(DbError::Conflict(_))))
    ));
}

#[tokio::test]
async fn inverted_daily_range_is_a_config_error() {
    let store = MemoryStore::new();
    let mut plan = plan(5, 2, 8);
    plan.daily_transactions = DailyTransactionRange { min: 50, max: 1 };

    let result = run_generation(&store, &plan).await;
    assert!(matches!(
        result,
        Err(GenerationError::Config(ConfigError::Invalid {
            field: "generation.daily_transactions",
            ..
        }))
    ));
    assert_eq!(store.event_count().await, 0);
}

#[tokio::test]
async fn rejected_plan_leaves_existing_dataset_untouched() {
    let store = MemoryStore::new();
    let good = plan(6, 2, 21);
    run_generation(&store, &good).await.unwrap();
    let accounts_before = store.account_count().await;
    let events_before = store.events().await;
    assert!(accounts_before > 0 && !events_before.is_empty());

    let mut no_members = good.clone();
    no_members.account_count = 0;
    let mut no_batch = good.clone();
    no_batch.batch_size = 0;
    let mut inverted = good.clone();
    inverted.daily_transactions = DailyTransactionRange { min: 9, max: 3 };

    for bad in [no_members, no_batch, inverted] {
        assert!(bad.reset_before_run);
        let result = run_generation(&store, &bad).await;
        assert!(matches!(result, Err(GenerationError::Config(_))), "{result:?}");
        assert_eq!(store.account_count().await, accounts_before);
        assert_eq!(store.events().await, events_before);
    }
}

#[tokio::test]
async fn adjustments_land_on_today_when_the_horizon_ends_today() {
    let store = MemoryStore::new();
    let mut plan = plan(12, 2, 31);
    plan.horizon = Horizon::ending(chrono::Utc::now().date_naive(), 2).unwrap();
    let report = run_generation(&store, &plan).await.unwrap();
    assert!(report.adjustment_events() > 0);

    let job = AggregationJob::new(&store);
    job.aggregate_range(plan.horizon.start(), plan.horizon.end())
        .await
        .unwrap();
    let summaries = job
        .summaries_between(plan.horizon.start(), plan.horizon.end())
        .await
        .unwrap();
    let net: i64 = summaries.iter().map(|s| s.net_amount).sum();
    assert_eq!(net, targets_of(&plan).total().unwrap());
}

#[tokio::test]
async fn summaries_cover_the_horizon() {
    let store = MemoryStore::new();
    let plan = plan(15, 3, 17);
    run_generation(&store, &plan).await.unwrap();

    let job = AggregationJob::new(&store);
    let written = job
        .aggregate_range(plan.horizon.start(), plan.horizon.end())
        .await
        .unwrap();
    assert_eq!(written, 3);

    let summaries = job
        .summaries_between(plan.horizon.start(), plan.horizon.end())
        .await
        .unwrap();
    let net: i64 = summaries.iter().map(|s| s.net_amount).sum();
    let expected: i64 = store
        .events()
        .await
        .iter()
        .filter(|e| e.day() >= plan.horizon.start() && e.day() <= plan.horizon.end())
        .map(|e| e.amount)
        .sum();
    assert_eq!(net, expected);
    for summary in &summaries {
        assert_eq!(
            summary.net_amount,
            summary.total_earn_amount - summary.total_use_amount
        );
    }
}

// =========================================================================
// Verification failure
// =========================================================================

/// Delegates to a [`MemoryStore`] but reports every member one point short.
struct ShortSumsStore {
    inner: MemoryStore,
}

impl MileageStore for ShortSumsStore {
    async fn insert_accounts(&self, accounts: &[MileageAccount]) -> Result<u64, DbError> {
        self.inner.insert_accounts(accounts).await
    }

    async fn insert_events(&self, events: &[MileageEvent]) -> Result<u64, DbError> {
        self.inner.insert_events(events).await
    }

    async fn reset(&self) -> Result<(), DbError> {
        self.inner.reset().await
    }

    async fn find_account(&self, member_id: MemberId) -> Result<Option<MileageAccount>, DbError> {
        self.inner.find_account(member_id).await
    }

    async fn events_by_member(
        &self,
        member_id: MemberId,
        kind: Option<MileageKind>,
    ) -> Result<Vec<MileageEvent>, DbError> {
        self.inner.events_by_member(member_id, kind).await
    }

    async fn count_events_by_member(
        &self,
        member_id: MemberId,
        kind: Option<MileageKind>,
    ) -> Result<u64, DbError> {
        self.inner.count_events_by_member(member_id, kind).await
    }

    async fn member_sums(&self) -> Result<Vec<(MemberId, i64)>, DbError> {
        let sums = self.inner.member_sums().await?;
        Ok(sums.into_iter().map(|(m, sum)| (m, sum - 1)).collect())
    }

    async fn daily_totals(&self, date: NaiveDate) -> Result<DailyTotals, DbError> {
        self.inner.daily_totals(date).await
    }

    async fn upsert_summary(&self, summary: &DailySummary) -> Result<DailySummary, DbError> {
        self.inner.upsert_summary(summary).await
    }

    async fn summary_for(&self, date: NaiveDate) -> Result<Option<DailySummary>, DbError> {
        self.inner.summary_for(date).await
    }

    async fn summaries_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailySummary>, DbError> {
        self.inner.summaries_between(start, end).await
    }
}

#[tokio::test]
async fn verification_reports_mismatches() {
    let store = ShortSumsStore {
        inner: MemoryStore::new(),
    };
    let result = run_generation(&store, &plan(30, 2, 6)).await;
    match result {
        Err(GenerationError::Verification { count, examples }) => {
            assert_eq!(count, 30);
            assert_eq!(examples.len(), 20);
            assert_eq!(examples[0].member_id, MemberId::FIRST);
        }
        other => panic!("expected a verification failure, got {other:?}"),
    }
}

#[tokio::test]
async fn verification_can_be_skipped() {
    let store = ShortSumsStore {
        inner: MemoryStore::new(),
    };
    let mut plan = plan(30, 2, 6);
    plan.verify_after_run = false;
    assert!(run_generation(&store, &plan).await.is_ok());
}
