//! Closing adjustments that force running totals onto targets.
//!
//! Runs once, after the last simulated day. Every member falls into
//! exactly one row:
//!
//! | Running total | Target | Adjustment |
//! |---------------|--------|------------|
//! | present, `== target` | any | none |
//! | present, `!= target` | any | one `Earn`/`Use` for the difference |
//! | absent | `> 0` | one `Earn` initial grant of the full target |
//! | absent | `0` | none |
//!
//! All adjustments share the reconciliation timestamp rather than being
//! spread across the horizon.

use chrono::{DateTime, Utc};

use mileage_types::{DESCRIPTION_ADJUSTMENT, DESCRIPTION_INITIAL_GRANT, MemberId, MileageEvent};

use crate::{AccumulatedBalances, LedgerError, TargetBalances};

/// Why an adjustment entry was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdjustmentReason {
    /// The member had organic entries whose sum missed the target.
    Correction,
    /// The member had no organic entries and a non-zero target.
    InitialGrant,
}

/// A single closing entry together with the reason it was emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjustment {
    /// Why the entry exists.
    pub reason: AdjustmentReason,
    /// The ledger entry to persist.
    pub event: MileageEvent,
}

/// Compute the closing entry for one member, if any is needed.
///
/// `accumulated` is `None` when the member saw no organic entries.
///
/// # Errors
///
/// Returns [`LedgerError::Overflow`] if the difference between target and
/// running total does not fit in an `i64`.
pub fn adjustment_for(
    member_id: MemberId,
    target: i64,
    accumulated: Option<i64>,
    at: DateTime<Utc>,
) -> Result<Option<Adjustment>, LedgerError> {
    let Some(total) = accumulated else {
        if target == 0 {
            return Ok(None);
        }
        return Ok(Some(Adjustment {
            reason: AdjustmentReason::InitialGrant,
            event: MileageEvent::earn(member_id, target, DESCRIPTION_INITIAL_GRANT, at),
        }));
    };

    let difference = target.checked_sub(total).ok_or(LedgerError::Overflow {
        context: "computing closing difference",
    })?;

    let event = match difference {
        0 => return Ok(None),
        d if d > 0 => MileageEvent::earn(member_id, d, DESCRIPTION_ADJUSTMENT, at),
        d => {
            let magnitude = d.checked_neg().ok_or(LedgerError::Overflow {
                context: "negating closing difference",
            })?;
            MileageEvent::spend(member_id, magnitude, DESCRIPTION_ADJUSTMENT, at)
        }
    };

    Ok(Some(Adjustment {
        reason: AdjustmentReason::Correction,
        event,
    }))
}

/// Iterate the closing entries of the whole population in member order.
///
/// The iterator is lazy so adjustments can be streamed straight into a
/// bounded persistence buffer.
pub fn adjustments<'a>(
    targets: &'a TargetBalances,
    accumulated: &'a AccumulatedBalances,
    at: DateTime<Utc>,
) -> impl Iterator<Item = Result<Adjustment, LedgerError>> + 'a {
    targets.iter().filter_map(move |(member_id, target)| {
        adjustment_for(member_id, target, accumulated.get(member_id), at).transpose()
    })
}

#[cfg(test)]
mod tests {
    use mileage_types::MileageKind;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn member(raw: u32) -> MemberId {
        MemberId::new(raw).unwrap_or(MemberId::FIRST)
    }

    /// Flatten an adjustment into `(reason, kind, amount, description)`.
    fn adjust(
        target: i64,
        accumulated: Option<i64>,
    ) -> Option<(AdjustmentReason, MileageKind, i64, String)> {
        adjustment_for(member(1), target, accumulated, Utc::now())
            .ok()
            .flatten()
            .map(|a| (a.reason, a.event.kind, a.event.amount, a.event.description))
    }

    #[test]
    fn idle_member_with_zero_target_gets_nothing() {
        assert!(adjust(0, None).is_none());
    }

    #[test]
    fn idle_member_with_target_gets_initial_grant() {
        assert_eq!(
            adjust(500, None),
            Some((
                AdjustmentReason::InitialGrant,
                MileageKind::Earn,
                500,
                DESCRIPTION_INITIAL_GRANT.to_owned()
            ))
        );
    }

    #[test]
    fn matching_total_needs_no_adjustment() {
        assert!(adjust(700, Some(700)).is_none());
    }

    #[test]
    fn active_member_at_zero_with_zero_target_needs_nothing() {
        assert!(adjust(0, Some(0)).is_none());
    }

    #[test]
    fn under_target_member_earns_difference() {
        assert_eq!(
            adjust(10_000, Some(2_500)),
            Some((
                AdjustmentReason::Correction,
                MileageKind::Earn,
                7_500,
                DESCRIPTION_ADJUSTMENT.to_owned()
            ))
        );
    }

    #[test]
    fn over_target_member_uses_difference() {
        assert_eq!(
            adjust(1_000, Some(4_000)),
            Some((
                AdjustmentReason::Correction,
                MileageKind::Use,
                -3_000,
                DESCRIPTION_ADJUSTMENT.to_owned()
            ))
        );
    }

    #[test]
    fn negative_running_total_is_corrected() {
        assert_eq!(adjust(300, Some(-4_700)).map(|a| a.2), Some(5_000));
    }

    #[test]
    fn overflowing_difference_is_an_error() {
        let result = adjustment_for(member(1), 1, Some(i64::MIN), Utc::now());
        assert!(matches!(result, Err(LedgerError::Overflow { .. })));
    }

    #[test]
    fn population_adjustments_close_every_gap() {
        let targets = TargetBalances::assign(5, 100_000).unwrap_or_default();
        let mut running = AccumulatedBalances::new(targets.len());
        running.record(member(1), 20_000).ok(); // exact
        running.record(member(2), 50_000).ok(); // over by 10_000
        running.record(member(3), 10_000).ok(); // under by 50_000

        let at = Utc::now();
        let closing: Vec<Adjustment> = adjustments(&targets, &running, at)
            .filter_map(Result::ok)
            .collect();

        let summary: Vec<(u32, i64, AdjustmentReason)> = closing
            .iter()
            .map(|a| (a.event.member_id.get(), a.event.amount, a.reason))
            .collect();
        assert_eq!(
            summary,
            vec![
                (2, -10_000, AdjustmentReason::Correction),
                (3, 50_000, AdjustmentReason::Correction),
                (4, 80_000, AdjustmentReason::InitialGrant),
                (5, 100_000, AdjustmentReason::InitialGrant),
            ]
        );
        assert!(closing.iter().all(|a| a.event.occurred_at == at));
    }

    #[test]
    fn random_running_totals_always_close_on_target() {
        for seed in 0..25_u64 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let population: u32 = rng.random_range(1..=40);
            let targets = TargetBalances::assign(population, 50_000).unwrap_or_default();
            let mut running = AccumulatedBalances::new(targets.len());
            for (member_id, _) in targets.iter() {
                for _ in 0..rng.random_range(0..4_u32) {
                    running
                        .record(member_id, rng.random_range(-20_000..=20_000_i64))
                        .ok();
                }
            }

            let closing: Vec<Adjustment> = adjustments(&targets, &running, Utc::now())
                .filter_map(Result::ok)
                .collect();

            for (member_id, target) in targets.iter() {
                let own: Vec<&Adjustment> = closing
                    .iter()
                    .filter(|a| a.event.member_id == member_id)
                    .collect();
                assert!(own.len() <= 1, "seed {seed}: member {member_id} adjusted twice");
                let settled = own
                    .iter()
                    .fold(running.total(member_id), |sum, a| sum.saturating_add(a.event.amount));
                assert_eq!(settled, target, "seed {seed}: member {member_id}");
            }
        }
    }
}
