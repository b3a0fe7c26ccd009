//! The simulated day range and the loop that walks it.
//!
//! A horizon of `D` days ends on `end` and starts on `end - (D - 1)`.
//! [`HorizonDriver`] runs the simulator once per day in ascending order,
//! marks only the last day final, and owns the running totals for the
//! whole range.

use chrono::{Days, NaiveDate};
use rand::Rng;

use mileage_db::{BatchPersister, MileageStore};
use mileage_ledger::AccumulatedBalances;

use crate::config::ConfigError;
use crate::generation::GenerationError;
use crate::simulator::{DailyTransactionSimulator, DayStats};

/// An inclusive range of `days` consecutive calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon {
    start: NaiveDate,
    end: NaiveDate,
    days: u32,
}

/// One day of a horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HorizonDay {
    /// The calendar day.
    pub date: NaiveDate,
    /// Whether it is the last day.
    pub is_final: bool,
}

impl Horizon {
    /// The `days`-day horizon whose last day is `end`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `days` is zero or the start date
    /// is not representable.
    pub fn ending(end: NaiveDate, days: u32) -> Result<Self, ConfigError> {
        let back = days.checked_sub(1).ok_or_else(|| ConfigError::Invalid {
            field: "generation.horizon_days",
            reason: "must be at least 1".to_owned(),
        })?;
        let start = end
            .checked_sub_days(Days::new(u64::from(back)))
            .ok_or_else(|| ConfigError::Invalid {
                field: "generation.horizon_days",
                reason: format!("{days} days before {end} is out of range"),
            })?;
        Ok(Self { start, end, days })
    }

    /// First day.
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day.
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days.
    pub const fn days(&self) -> u32 {
        self.days
    }

    /// The days in ascending order, the last one flagged final.
    pub fn iter(&self) -> impl Iterator<Item = HorizonDay> + '_ {
        self.start
            .iter_days()
            .take_while(|date| *date <= self.end)
            .map(|date| HorizonDay {
                date,
                is_final: date == self.end,
            })
    }
}

/// Walks a horizon day by day, carrying running totals forward.
pub struct HorizonDriver {
    horizon: Horizon,
    accumulated: AccumulatedBalances,
}

impl HorizonDriver {
    /// Create a driver with empty running totals for `population` members.
    pub fn new(horizon: Horizon, population: usize) -> Self {
        Self {
            horizon,
            accumulated: AccumulatedBalances::new(population),
        }
    }

    /// The horizon being driven.
    pub const fn horizon(&self) -> &Horizon {
        &self.horizon
    }

    /// Simulate every day of the horizon in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`GenerationError`] raised by a day; later days
    /// are not simulated.
    pub async fn run<R: Rng, S: MileageStore>(
        &mut self,
        simulator: &mut DailyTransactionSimulator<'_, R>,
        persister: &mut BatchPersister<'_, S>,
    ) -> Result<Vec<DayStats>, GenerationError> {
        let mut stats = Vec::with_capacity(usize::try_from(self.horizon.days).unwrap_or(0));
        for day in self.horizon.iter() {
            let day_stats = simulator
                .simulate_day(day.date, day.is_final, &mut self.accumulated, persister)
                .await?;
            stats.push(day_stats);
        }
        Ok(stats)
    }

    /// Running totals so far.
    pub const fn accumulated(&self) -> &AccumulatedBalances {
        &self.accumulated
    }

    /// Hand the running totals over to reconciliation.
    pub fn into_accumulated(self) -> AccumulatedBalances {
        self.accumulated
    }
}
