//! The run-once generation pipeline.
//!
//! [`run_generation`] produces a complete, reconciled dataset in five
//! sequential stages, all writing through one [`BatchPersister`]:
//!
//! ```text
//! 1. reset        (optional)  clear accounts, history, summaries
//! 2. accounts                 assign targets, write one account per member
//! 3. horizon                  simulate each day, streaming history entries
//! 4. reconcile                one closing entry per off-target member
//! 5. verify       (optional)  compare persisted sums to targets
//! ```
//!
//! A failed stage aborts the run; nothing is retried and the partial
//! dataset is meant to be discarded.

use std::time::Instant;

use chrono::{NaiveDate, Utc};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{Instrument, info, info_span};

use mileage_db::{BatchPersister, DbError, MileageStore, PersistError};
use mileage_ledger::{
    AdjustmentReason, BalanceMismatch, LedgerError, TargetBalances, VerificationResult, reconcile,
    verify_member_sums,
};
use mileage_types::RunId;

use crate::config::{
    ConfigError, DailyTransactionRange, MileageConfig, validate_batch_size, validate_population,
};
use crate::horizon::{Horizon, HorizonDriver};
use crate::simulator::{DailyTransactionSimulator, DayStats};

// =========================================================================
// Error type
// =========================================================================

/// Errors that abort a generation run.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The settings cannot produce a dataset.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Target or running-total arithmetic failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A batched write failed.
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),

    /// A direct store call (reset, sums) failed.
    #[error("store error: {0}")]
    Store(#[from] DbError),

    /// Persisted per-member sums do not equal the targets.
    #[error("{count} member(s) do not match their target balance")]
    Verification {
        /// Number of mismatching members.
        count: usize,
        /// The first mismatches in member order.
        examples: Vec<BalanceMismatch>,
    },
}

// =========================================================================
// Plan
// =========================================================================

/// Validated, fully resolved settings of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPlan {
    /// Number of members.
    pub account_count: u32,
    /// Upper bound of targets.
    pub max_balance: i64,
    /// Days to simulate.
    pub horizon: Horizon,
    /// Per-day transaction count range.
    pub daily_transactions: DailyTransactionRange,
    /// Fixed seed, or `None` to draw one.
    pub seed: Option<u64>,
    /// Rows per bulk insert.
    pub batch_size: usize,
    /// Clear the store first.
    pub reset_before_run: bool,
    /// Verify persisted sums afterwards.
    pub verify_after_run: bool,
}

impl GenerationPlan {
    /// Validate `config` and resolve the horizon, ending on `today` unless
    /// the configuration names an end date.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation fails.
    pub fn from_config(config: &MileageConfig, today: NaiveDate) -> Result<Self, ConfigError> {
        config.validate()?;
        let generation = &config.generation;
        let end = generation.end_date.unwrap_or(today);
        Ok(Self {
            account_count: generation.account_count,
            max_balance: generation.max_balance,
            horizon: Horizon::ending(end, generation.horizon_days)?,
            daily_transactions: generation.daily_transactions,
            seed: generation.seed,
            batch_size: config.persistence.batch_size,
            reset_before_run: generation.reset_before_run,
            verify_after_run: generation.verify_after_run,
        })
    }

    /// Reject a plan that cannot produce a dataset.
    ///
    /// Plans built by [`GenerationPlan::from_config`] always pass; plans
    /// assembled by hand are checked here before anything touches the store.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_population(self.account_count, self.max_balance)?;
        self.daily_transactions.validate()?;
        validate_batch_size(self.batch_size)
    }
}

// =========================================================================
// Report
// =========================================================================

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// Identifier of the run.
    pub run_id: RunId,
    /// Seed every random draw derived from.
    pub seed: u64,
    /// First simulated day.
    pub start_date: NaiveDate,
    /// Last simulated day.
    pub end_date: NaiveDate,
    /// Account rows written.
    pub accounts_created: u64,
    /// Entries generated during the horizon.
    pub organic_events: u64,
    /// Closing entries for members whose total missed the target.
    pub corrections: u64,
    /// Closing entries for members with no organic entries.
    pub initial_grants: u64,
    /// Per-day counters in date order.
    pub days: Vec<DayStats>,
    /// Non-empty bulk writes issued.
    pub batches_flushed: u64,
    /// Wall-clock duration in milliseconds.
    pub elapsed_ms: u64,
}

impl GenerationReport {
    /// All closing entries.
    pub const fn adjustment_events(&self) -> u64 {
        self.corrections.saturating_add(self.initial_grants)
    }

    /// Every history entry written.
    pub const fn total_events(&self) -> u64 {
        self.organic_events.saturating_add(self.adjustment_events())
    }
}

// =========================================================================
// Pipeline
// =========================================================================

/// Generate, reconcile and persist one complete dataset.
///
/// The run is wrapped in a `generation` span carrying its run id and seed.
/// An invalid plan is rejected before the store is touched.
///
/// # Errors
///
/// Returns [`GenerationError::Config`] for an invalid plan, otherwise the
/// first [`GenerationError`] of any stage.
pub async fn run_generation<S: MileageStore>(
    store: &S,
    plan: &GenerationPlan,
) -> Result<GenerationReport, GenerationError> {
    plan.validate()?;
    let run_id = RunId::new();
    let seed = plan.seed.unwrap_or_else(|| rand::rng().random());
    if plan.seed.is_none() {
        info!(seed, "No seed configured; drew one from the OS");
    }

    let span = info_span!("generation", run_id = %run_id, seed);
    generate(store, plan, run_id, SmallRng::seed_from_u64(seed), seed)
        .instrument(span)
        .await
}

async fn generate<S: MileageStore>(
    store: &S,
    plan: &GenerationPlan,
    run_id: RunId,
    rng: SmallRng,
    seed: u64,
) -> Result<GenerationReport, GenerationError> {
    let started = Instant::now();
    info!(
        accounts = plan.account_count,
        max_balance = plan.max_balance,
        start = %plan.horizon.start(),
        end = %plan.horizon.end(),
        days = plan.horizon.days(),
        min_daily = plan.daily_transactions.min,
        max_daily = plan.daily_transactions.max,
        "Generation starting"
    );

    let targets = TargetBalances::assign(plan.account_count, plan.max_balance)?;
    let mut persister = BatchPersister::new(store, plan.batch_size)?;
    let mut simulator = DailyTransactionSimulator::new(&targets, plan.daily_transactions, rng)?;

    // 1. Reset
    if plan.reset_before_run {
        store.reset().await?;
    }

    // 2. Accounts
    for account in targets.accounts(Utc::now()) {
        persister.push_account(account).await?;
    }
    let accounts_created = persister.flush().await?.accounts_written;
    info!(accounts = accounts_created, "Accounts written");

    // 3. Horizon
    let mut driver = HorizonDriver::new(plan.horizon, targets.len());
    let days = driver.run(&mut simulator, &mut persister).await?;
    let organic_events = days
        .iter()
        .fold(0_u64, |acc, day| acc.saturating_add(day.transactions));
    let accumulated = driver.into_accumulated();
    info!(
        organic_events,
        active_members = accumulated.active_members(),
        "Horizon complete"
    );

    // 4. Reconcile
    let mut corrections: u64 = 0;
    let mut initial_grants: u64 = 0;
    for adjustment in reconcile::adjustments(&targets, &accumulated, Utc::now()) {
        let adjustment = adjustment?;
        match adjustment.reason {
            AdjustmentReason::Correction => corrections = corrections.saturating_add(1),
            AdjustmentReason::InitialGrant => initial_grants = initial_grants.saturating_add(1),
        }
        persister.push_event(adjustment.event).await?;
    }
    let stats = persister.flush().await?;
    info!(corrections, initial_grants, "Reconciliation complete");

    // 5. Verify
    if plan.verify_after_run {
        let sums = store.member_sums().await?;
        match verify_member_sums(&targets, &sums) {
            VerificationResult::Balanced => info!("Every member matches its target"),
            VerificationResult::Mismatch { count, examples } => {
                return Err(GenerationError::Verification { count, examples });
            }
        }
    }

    let report = GenerationReport {
        run_id,
        seed,
        start_date: plan.horizon.start(),
        end_date: plan.horizon.end(),
        accounts_created,
        organic_events,
        corrections,
        initial_grants,
        days,
        batches_flushed: stats.batches_flushed,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };

    info!(
        total_events = report.total_events(),
        batches = report.batches_flushed,
        elapsed_ms = report.elapsed_ms,
        "Generation complete"
    );

    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn plan_defaults_end_today() {
        let today = NaiveDate::from_ymd_opt(2024, 10, 31).unwrap();
        let plan = GenerationPlan::from_config(&MileageConfig::default(), today).unwrap();
        assert_eq!(plan.horizon.end(), today);
        assert_eq!(plan.horizon.start(), NaiveDate::from_ymd_opt(2024, 10, 2).unwrap());
        assert_eq!(plan.batch_size, 1_000);
    }

    #[test]
    fn plan_honors_configured_end_date() {
        let mut config = MileageConfig::default();
        config.generation.end_date = NaiveDate::from_ymd_opt(2023, 1, 5);
        config.generation.horizon_days = 5;
        let today = NaiveDate::from_ymd_opt(2024, 10, 31).unwrap();
        let plan = GenerationPlan::from_config(&config, today).unwrap();
        assert_eq!(plan.horizon.start(), NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
    }

    #[test]
    fn plan_rejects_invalid_config() {
        let mut config = MileageConfig::default();
        config.generation.daily_transactions = DailyTransactionRange { min: 10, max: 1 };
        let today = NaiveDate::from_ymd_opt(2024, 10, 31).unwrap();
        assert!(matches!(
            GenerationPlan::from_config(&config, today),
            Err(ConfigError::Invalid { .. })
        ));
    }

    fn hand_built_plan() -> GenerationPlan {
        GenerationPlan {
            account_count: 4,
            max_balance: 1_000,
            horizon: Horizon::ending(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 2).unwrap(),
            daily_transactions: DailyTransactionRange { min: 1, max: 3 },
            seed: Some(1),
            batch_size: 10,
            reset_before_run: true,
            verify_after_run: true,
        }
    }

    #[test]
    fn hand_built_plan_is_validated() {
        assert!(hand_built_plan().validate().is_ok());

        let rejected = |plan: GenerationPlan| match plan.validate() {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        };
        let mut plan = hand_built_plan();
        plan.account_count = 0;
        assert_eq!(rejected(plan), Some("generation.account_count"));

        let mut plan = hand_built_plan();
        plan.max_balance = -1;
        assert_eq!(rejected(plan), Some("generation.max_balance"));

        let mut plan = hand_built_plan();
        plan.account_count = u32::MAX;
        plan.max_balance = i64::MAX;
        assert_eq!(rejected(plan), Some("generation.max_balance"));

        let mut plan = hand_built_plan();
        plan.daily_transactions = DailyTransactionRange { min: 50, max: 1 };
        assert_eq!(rejected(plan), Some("generation.daily_transactions"));

        let mut plan = hand_built_plan();
        plan.batch_size = 0;
        assert_eq!(rejected(plan), Some("persistence.batch_size"));
    }

    #[test]
    fn report_totals_add_up() {
        let report = GenerationReport {
            run_id: RunId::new(),
            seed: 1,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            accounts_created: 3,
            organic_events: 10,
            corrections: 2,
            initial_grants: 1,
            days: Vec::new(),
            batches_flushed: 4,
            elapsed_ms: 0,
        };
        assert_eq!(report.adjustment_events(), 3);
        assert_eq!(report.total_events(), 13);
    }
}
