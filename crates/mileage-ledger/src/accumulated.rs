//! Dense per-member running totals.
//!
//! Member ids are contiguous, so totals live in flat vectors indexed by
//! `member - 1` instead of a hash map. A member that has never received an
//! entry is "absent": [`AccumulatedBalances::get`] returns `None` for it,
//! which reconciliation treats differently from a member whose entries
//! happen to sum to zero.

use mileage_types::MemberId;

use crate::LedgerError;

/// Running totals of generated entries, one slot per member.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccumulatedBalances {
    totals: Vec<i64>,
    entry_counts: Vec<u32>,
}

impl AccumulatedBalances {
    /// Create empty totals for a population of `population` members.
    pub fn new(population: usize) -> Self {
        Self {
            totals: vec![0; population],
            entry_counts: vec![0; population],
        }
    }

    /// Number of member slots.
    pub const fn len(&self) -> usize {
        self.totals.len()
    }

    /// Whether there are no member slots.
    pub const fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Running total for a member, or `None` if it has no entries yet.
    pub fn get(&self, member_id: MemberId) -> Option<i64> {
        let idx = member_id.index();
        match self.entry_counts.get(idx) {
            Some(count) if *count > 0 => self.totals.get(idx).copied(),
            _ => None,
        }
    }

    /// Running total for a member, treating absence as zero.
    pub fn total(&self, member_id: MemberId) -> i64 {
        self.totals.get(member_id.index()).copied().unwrap_or(0)
    }

    /// Number of entries recorded for a member.
    pub fn entry_count(&self, member_id: MemberId) -> u32 {
        self.entry_counts
            .get(member_id.index())
            .copied()
            .unwrap_or(0)
    }

    /// Add a signed amount to a member's total and return the new total.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnknownMember`] if the member has no slot and
    /// [`LedgerError::Overflow`] if the total would leave the `i64` range.
    pub fn record(&mut self, member_id: MemberId, amount: i64) -> Result<i64, LedgerError> {
        let population = self.totals.len();
        let idx = member_id.index();
        let (Some(total), Some(count)) = (self.totals.get_mut(idx), self.entry_counts.get_mut(idx))
        else {
            return Err(LedgerError::UnknownMember {
                member_id,
                population,
            });
        };

        *total = total.checked_add(amount).ok_or(LedgerError::Overflow {
            context: "accumulating member total",
        })?;
        *count = count.saturating_add(1);
        Ok(*total)
    }

    /// Number of members that received at least one entry.
    pub fn active_members(&self) -> usize {
        self.entry_counts.iter().filter(|c| **c > 0).count()
    }
}
