//! Post-run verification of per-member sums against targets.
//!
//! After reconciliation the following must hold for every member `m`:
//!
//! ```text
//! sum(amount of every persisted entry for m) == target(m)
//! ```
//!
//! Storage reports sums only for members that have entries, so a member
//! missing from the reported sums is treated as summing to zero and must
//! therefore have a zero target. Sums reported for members outside the
//! population are mismatches too.
//!
//! A violation produces a [`VerificationResult::Mismatch`] -- the run's
//! dataset is inconsistent and must be discarded.

use std::collections::BTreeMap;

use mileage_types::{MemberId, MileageEvent};

use crate::TargetBalances;

/// Maximum number of individual mismatches retained in a report.
const MAX_REPORTED_MISMATCHES: usize = 20;

/// A member whose persisted sum differs from its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceMismatch {
    /// The member.
    pub member_id: MemberId,
    /// The expected sum, or `None` if the member is outside the population.
    pub target: Option<i64>,
    /// The sum found in storage.
    pub actual: i64,
}

impl core::fmt::Display for BalanceMismatch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.target {
            Some(target) => write!(
                f,
                "member {}: expected {target}, found {}",
                self.member_id, self.actual
            ),
            None => write!(
                f,
                "member {}: not in population, found {}",
                self.member_id, self.actual
            ),
        }
    }
}

/// The outcome of a verification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// Every member's sum equals its target.
    Balanced,
    /// At least one member is off target.
    Mismatch {
        /// Total number of mismatching members.
        count: usize,
        /// The first mismatches in member order (capped).
        examples: Vec<BalanceMismatch>,
    },
}

impl VerificationResult {
    /// Whether the dataset reconciled.
    pub const fn is_balanced(&self) -> bool {
        matches!(self, Self::Balanced)
    }
}

/// Compare storage-reported per-member sums against the targets.
///
/// `sums` may be in any order and may omit members with no entries.
pub fn verify_member_sums(
    targets: &TargetBalances,
    sums: &[(MemberId, i64)],
) -> VerificationResult {
    let mut seen = vec![false; targets.len()];
    let mut mismatches: BTreeMap<MemberId, BalanceMismatch> = BTreeMap::new();

    for (member_id, actual) in sums {
        if let Some(slot) = seen.get_mut(member_id.index()) {
            *slot = true;
        }
        let target = targets.get(*member_id);
        if target != Some(*actual) {
            mismatches.insert(
                *member_id,
                BalanceMismatch {
                    member_id: *member_id,
                    target,
                    actual: *actual,
                },
            );
        }
    }

    // Members with no entries sum to zero.
    for (member_id, target) in targets.iter() {
        let reported = seen.get(member_id.index()).copied().unwrap_or(false);
        if !reported && target != 0 {
            mismatches.insert(
                member_id,
                BalanceMismatch {
                    member_id,
                    target: Some(target),
                    actual: 0,
                },
            );
        }
    }

    if mismatches.is_empty() {
        return VerificationResult::Balanced;
    }

    let count = mismatches.len();
    let examples: Vec<BalanceMismatch> = mismatches
        .into_values()
        .take(MAX_REPORTED_MISMATCHES)
        .collect();

    tracing::warn!(
        count,
        first = %examples.first().map(ToString::to_string).unwrap_or_default(),
        "Per-member sums do not match targets"
    );

    VerificationResult::Mismatch { count, examples }
}

/// Sum a set of in-memory entries per member and verify them.
///
/// Convenience for callers holding the full entry set (tests, small
/// datasets). Entries whose sum overflows are reported at `i64::MAX`.
pub fn verify_events(targets: &TargetBalances, events: &[MileageEvent]) -> VerificationResult {
    let mut sums: BTreeMap<MemberId, i64> = BTreeMap::new();
    for event in events {
        let total = sums.entry(event.member_id).or_insert(0);
        *total = total.checked_add(event.amount).unwrap_or(i64::MAX);
    }
    let sums: Vec<(MemberId, i64)> = sums.into_iter().collect();
    verify_member_sums(targets, &sums)
}
