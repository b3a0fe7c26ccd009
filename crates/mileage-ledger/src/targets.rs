//! Deterministic per-member target balances.
//!
//! Targets are spread over `[0, max_balance]` by member number:
//!
//! ```text
//! target(m) = (m * max_balance / N) mod (max_balance + 1)
//! ```
//!
//! The mapping is a pure function of `(N, max_balance)`, so two runs with
//! the same population always agree on every target regardless of seed.

use chrono::{DateTime, Utc};

use mileage_types::{MemberId, MileageAccount};

use crate::LedgerError;

/// The immutable target balance of every member, indexed by `member - 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetBalances {
    max_balance: i64,
    targets: Vec<i64>,
}

impl TargetBalances {
    /// Compute the target of every member in `[1, account_count]`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::EmptyPopulation`] for a zero population,
    /// [`LedgerError::NegativeMaxBalance`] for a negative maximum, and
    /// [`LedgerError::Overflow`] if `account_count * max_balance` does not
    /// fit in an `i64`.
    pub fn assign(account_count: u32, max_balance: i64) -> Result<Self, LedgerError> {
        if account_count == 0 {
            return Err(LedgerError::EmptyPopulation);
        }
        if max_balance < 0 {
            return Err(LedgerError::NegativeMaxBalance { max_balance });
        }

        let population = i64::from(account_count);
        let modulus = max_balance.checked_add(1).ok_or(LedgerError::Overflow {
            context: "computing target modulus",
        })?;

        let mut targets = Vec::with_capacity(account_count as usize);
        for raw in 1..=population {
            let scaled = raw.checked_mul(max_balance).ok_or(LedgerError::Overflow {
                context: "scaling member id by maximum balance",
            })?;
            // population >= 1 and modulus >= 1, so neither operation can fail.
            let target = scaled
                .checked_div(population)
                .and_then(|v| v.checked_rem(modulus))
                .ok_or(LedgerError::Overflow {
                    context: "reducing target balance",
                })?;
            targets.push(target);
        }

        tracing::debug!(
            accounts = account_count,
            max_balance,
            "Assigned target balances"
        );

        Ok(Self {
            max_balance,
            targets,
        })
    }

    /// Number of members in the population.
    pub const fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the population is empty.
    pub const fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// The configured maximum balance.
    pub const fn max_balance(&self) -> i64 {
        self.max_balance
    }

    /// Target of a single member, or `None` if outside the population.
    pub fn get(&self, member_id: MemberId) -> Option<i64> {
        self.targets.get(member_id.index()).copied()
    }

    /// Iterate `(member, target)` pairs in ascending member order.
    pub fn iter(&self) -> impl Iterator<Item = (MemberId, i64)> + '_ {
        self.targets
            .iter()
            .enumerate()
            .filter_map(|(idx, target)| MemberId::from_index(idx).map(|m| (m, *target)))
    }

    /// Sum of all targets, or `None` on overflow.
    pub fn total(&self) -> Option<i64> {
        self.targets
            .iter()
            .try_fold(0_i64, |acc, target| acc.checked_add(*target))
    }

    /// Stage one account row per member with `balance = target`.
    ///
    /// Rows are produced lazily so the caller can stream them into a
    /// bounded persistence buffer.
    pub fn accounts(&self, now: DateTime<Utc>) -> impl Iterator<Item = MileageAccount> + '_ {
        self.iter().map(move |(member_id, balance)| MileageAccount {
            member_id,
            balance,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(raw: u32) -> MemberId {
        MemberId::new(raw).unwrap_or(MemberId::FIRST)
    }

    #[test]
    fn five_members_follow_exact_formula() {
        let targets = TargetBalances::assign(5, 100_000).unwrap_or_default();
        let values: Vec<i64> = targets.iter().map(|(_, t)| t).collect();
        // 5 * 100000 / 5 = 100000, and 100000 mod 100001 = 100000.
        assert_eq!(values, vec![20_000, 40_000, 60_000, 80_000, 100_000]);
    }

    #[test]
    fn assignment_is_deterministic() {
        let a = TargetBalances::assign(1_000, 100_000).unwrap_or_default();
        let b = TargetBalances::assign(1_000, 100_000).unwrap_or_default();
        assert_eq!(a, b);
        assert_eq!(a.len(), 1_000);
    }

    #[test]
    fn targets_stay_within_range() {
        let targets = TargetBalances::assign(777, 5_000).unwrap_or_default();
        assert!(targets.iter().all(|(_, t)| (0..=5_000).contains(&t)));
    }

    #[test]
    fn small_populations_floor_to_zero() {
        // 1 * 3 / 10 = 0: low members can legitimately target zero.
        let targets = TargetBalances::assign(10, 3).unwrap_or_default();
        assert_eq!(targets.get(member(1)), Some(0));
        assert_eq!(targets.get(member(10)), Some(3));
    }

    #[test]
    fn zero_population_is_rejected() {
        assert!(matches!(
            TargetBalances::assign(0, 100),
            Err(LedgerError::EmptyPopulation)
        ));
    }

    #[test]
    fn negative_max_balance_is_rejected() {
        assert!(matches!(
            TargetBalances::assign(3, -1),
            Err(LedgerError::NegativeMaxBalance { max_balance: -1 })
        ));
    }

    #[test]
    fn overflowing_scale_is_rejected() {
        assert!(matches!(
            TargetBalances::assign(4, i64::MAX / 2),
            Err(LedgerError::Overflow { .. })
        ));
    }

    #[test]
    fn members_outside_population_have_no_target() {
        let targets = TargetBalances::assign(3, 100).unwrap_or_default();
        assert_eq!(targets.get(member(4)), None);
    }

    #[test]
    fn accounts_carry_target_as_balance() {
        let targets = TargetBalances::assign(4, 1_000).unwrap_or_default();
        let now = Utc::now();
        let accounts: Vec<MileageAccount> = targets.accounts(now).collect();
        assert_eq!(accounts.len(), 4);
        for account in &accounts {
            assert_eq!(Some(account.balance), targets.get(account.member_id));
            assert_eq!(account.created_at, now);
            assert_eq!(account.updated_at, now);
        }
    }

    #[test]
    fn total_sums_all_targets() {
        let targets = TargetBalances::assign(5, 100_000).unwrap_or_default();
        assert_eq!(targets.total(), Some(300_000));
    }
}
