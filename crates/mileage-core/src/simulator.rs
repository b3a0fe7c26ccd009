//! One simulated calendar day of earn/use activity.
//!
//! Each entry picks a uniformly random member and steers that member
//! toward its target balance:
//!
//! 1. On the final day, a member below target earns
//!    `min(target - accumulated, 10_000)`.
//! 2. Otherwise a member at or above target uses `[100, 5_000]`.
//! 3. Otherwise the member earns `[100, 10_000]` with 70% probability and
//!    uses `[100, 5_000]` with 30%.
//!
//! Running totals may dip below zero or overshoot during the horizon;
//! reconciliation settles every member afterwards. Probabilities are
//! integer rolls over basis points, so no floating point is involved.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rand::Rng;
use serde::Serialize;

use mileage_db::{BatchPersister, MileageStore};
use mileage_ledger::{AccumulatedBalances, LedgerError, TargetBalances};
use mileage_types::{DESCRIPTION_EARN, DESCRIPTION_USE, MemberId, MileageEvent, MileageKind};

use crate::config::DailyTransactionRange;
use crate::generation::GenerationError;

/// Smallest organic earn.
pub const EARN_MIN: i64 = 100;

/// Largest organic earn.
pub const EARN_MAX: i64 = 10_000;

/// Smallest organic use.
pub const USE_MIN: i64 = 100;

/// Largest organic use.
pub const USE_MAX: i64 = 5_000;

/// Largest single final-day top-up.
pub const FINAL_DAY_EARN_CAP: i64 = 10_000;

/// Chance, in basis points, that a below-target member earns.
pub const EARN_PROBABILITY_BP: u32 = 7_000;

/// Denominator of [`EARN_PROBABILITY_BP`].
const BASIS_POINTS: u32 = 10_000;

/// The kind and magnitude chosen for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryChoice {
    /// Earn or use.
    pub kind: MileageKind,
    /// Positive magnitude; the sign follows from `kind`.
    pub magnitude: i64,
}

/// Decide the next entry of a member from its target and running total.
pub fn choose_entry(
    target: i64,
    accumulated: i64,
    is_final_day: bool,
    rng: &mut impl Rng,
) -> EntryChoice {
    if is_final_day && accumulated < target {
        return EntryChoice {
            kind: MileageKind::Earn,
            magnitude: target.saturating_sub(accumulated).min(FINAL_DAY_EARN_CAP),
        };
    }
    if accumulated >= target {
        return random_use(rng);
    }
    let roll: u32 = rng.random_range(0..BASIS_POINTS);
    if roll < EARN_PROBABILITY_BP {
        EntryChoice {
            kind: MileageKind::Earn,
            magnitude: rng.random_range(EARN_MIN..=EARN_MAX),
        }
    } else {
        random_use(rng)
    }
}

fn random_use(rng: &mut impl Rng) -> EntryChoice {
    EntryChoice {
        kind: MileageKind::Use,
        magnitude: rng.random_range(USE_MIN..=USE_MAX),
    }
}

/// Activity counters of one simulated day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayStats {
    /// The simulated day.
    pub date: NaiveDate,
    /// Entries generated.
    pub transactions: u64,
    /// Earn entries among them.
    pub earn_count: u64,
    /// Use entries among them.
    pub use_count: u64,
    /// Whether this was the last day of the horizon.
    pub is_final: bool,
}

impl DayStats {
    const fn new(date: NaiveDate, is_final: bool) -> Self {
        Self {
            date,
            transactions: 0,
            earn_count: 0,
            use_count: 0,
            is_final,
        }
    }

    const fn record(&mut self, kind: MileageKind) {
        self.transactions = self.transactions.saturating_add(1);
        match kind {
            MileageKind::Earn => self.earn_count = self.earn_count.saturating_add(1),
            MileageKind::Use => self.use_count = self.use_count.saturating_add(1),
            // Never generated during the horizon.
            MileageKind::Expire => {}
        }
    }
}

/// Generates one day of entries at a time from a single random source.
pub struct DailyTransactionSimulator<'t, R> {
    targets: &'t TargetBalances,
    range: DailyTransactionRange,
    population: u32,
    rng: R,
}

impl<'t, R: Rng> DailyTransactionSimulator<'t, R> {
    /// Create a simulator over the members of `targets`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Ledger`] if there are no members, or
    /// [`GenerationError::Config`] if `range.min` exceeds `range.max`.
    pub fn new(
        targets: &'t TargetBalances,
        range: DailyTransactionRange,
        rng: R,
    ) -> Result<Self, GenerationError> {
        let population = u32::try_from(targets.len()).unwrap_or(u32::MAX);
        if population == 0 {
            return Err(LedgerError::EmptyPopulation.into());
        }
        range.validate()?;
        Ok(Self {
            targets,
            range,
            population,
            rng,
        })
    }

    /// Draw the number of entries for a day, uniformly in `[min, max]`.
    pub fn draw_transaction_count(&mut self) -> u64 {
        if self.range.min == self.range.max {
            return self.range.min;
        }
        self.rng.random_range(self.range.min..=self.range.max)
    }

    /// Draw a member uniformly from `[1, N]`.
    pub fn draw_member(&mut self) -> MemberId {
        let raw = self.rng.random_range(1..=self.population);
        MemberId::new(raw).unwrap_or(MemberId::FIRST)
    }

    /// Draw a uniformly random second within `date` (UTC).
    pub fn draw_timestamp(&mut self, date: NaiveDate) -> DateTime<Utc> {
        let hour = self.rng.random_range(0..24);
        let minute = self.rng.random_range(0..60);
        let second = self.rng.random_range(0..60);
        let time = NaiveTime::from_hms_opt(hour, minute, second).unwrap_or(NaiveTime::MIN);
        date.and_time(time).and_utc()
    }

    /// Generate one entry on `date` and fold it into `accumulated`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the member is outside `accumulated` or its
    /// running total overflows.
    pub fn next_event(
        &mut self,
        date: NaiveDate,
        is_final_day: bool,
        accumulated: &mut AccumulatedBalances,
    ) -> Result<MileageEvent, LedgerError> {
        let member_id = self.draw_member();
        let target = self.targets.get(member_id).unwrap_or(0);
        let choice = choose_entry(
            target,
            accumulated.total(member_id),
            is_final_day,
            &mut self.rng,
        );
        let occurred_at = self.draw_timestamp(date);

        let event = match choice.kind {
            MileageKind::Earn => {
                MileageEvent::earn(member_id, choice.magnitude, DESCRIPTION_EARN, occurred_at)
            }
            MileageKind::Use | MileageKind::Expire => {
                MileageEvent::spend(member_id, choice.magnitude, DESCRIPTION_USE, occurred_at)
            }
        };
        accumulated.record(member_id, event.amount)?;
        Ok(event)
    }

    /// Generate a whole day, streaming entries through `persister`.
    ///
    /// The day's partial batch is flushed before returning.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] if bookkeeping or a store write fails.
    pub async fn simulate_day<S: MileageStore>(
        &mut self,
        date: NaiveDate,
        is_final_day: bool,
        accumulated: &mut AccumulatedBalances,
        persister: &mut BatchPersister<'_, S>,
    ) -> Result<DayStats, GenerationError> {
        let planned = self.draw_transaction_count();
        let mut stats = DayStats::new(date, is_final_day);

        for _ in 0..planned {
            let event = self.next_event(date, is_final_day, accumulated)?;
            stats.record(event.kind);
            persister.push_event(event).await?;
        }
        persister.flush().await?;

        tracing::info!(
            day = %date,
            transactions = stats.transactions,
            earn = stats.earn_count,
            used = stats.use_count,
            is_final = is_final_day,
            "Simulated day"
        );
        Ok(stats)
    }
}
