//! Weighted water-filling of a cash budget across competing purchases.
//!
//! Each candidate gets `cash_left × weight / weights_sum`. As soon as one
//! candidate's share covers its full cost it is funded completely, removed,
//! and the split restarts over the rest with what is left. A pass that funds
//! nobody is final: every remaining candidate keeps its proportional share.

use crate::fixed::Fixed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillCandidate {
    /// Money that buys everything this candidate wants.
    pub max_cost: Fixed,
    pub weight: Fixed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillOutcome {
    /// Money assigned per candidate, in input order.
    pub money: Vec<Fixed>,
    pub fully_funded: Vec<bool>,
    /// Number of proportional passes run. Never exceeds the candidate count.
    pub passes: usize,
}

impl FillOutcome {
    fn empty(len: usize) -> Self {
        Self {
            money: vec![Fixed::ZERO; len],
            fully_funded: vec![false; len],
            passes: 0,
        }
    }

    pub fn total(&self) -> Fixed {
        self.money.iter().copied().sum()
    }
}

pub fn water_fill(available: Fixed, candidates: &[FillCandidate]) -> FillOutcome {
    let mut outcome = FillOutcome::empty(candidates.len());
    // Inverse-cost weights reach ~2^58 raw each; the sum is kept in i128.
    let mut weights_sum: i128 = candidates
        .iter()
        .filter(|c| c.weight > Fixed::ZERO)
        .map(|c| c.weight.raw() as i128)
        .sum();
    if weights_sum <= 0 || available <= Fixed::ZERO {
        return outcome;
    }

    let mut cash_left = available;
    let mut needs_redistribution = true;
    while needs_redistribution {
        needs_redistribution = false;
        outcome.passes += 1;
        for (i, candidate) in candidates.iter().enumerate() {
            if outcome.fully_funded[i] || candidate.weight <= Fixed::ZERO {
                continue;
            }

            let share = proportional_share(cash_left, candidate.weight, weights_sum);
            if share >= candidate.max_cost {
                cash_left -= candidate.max_cost;
                outcome.money[i] = candidate.max_cost;
                outcome.fully_funded[i] = true;
                weights_sum -= candidate.weight.raw() as i128;
                needs_redistribution = weights_sum > 0;
                break;
            }
            outcome.money[i] = share;
        }
    }
    outcome
}

/// `cash × weight / weights_sum`; never more than `cash` since `weight <= weights_sum`.
fn proportional_share(cash: Fixed, weight: Fixed, weights_sum: i128) -> Fixed {
    Fixed::from_raw((cash.raw() as i128 * weight.raw() as i128 / weights_sum) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn candidate(max_cost: i64) -> FillCandidate {
        let max_cost = Fixed::from_int(max_cost);
        FillCandidate {
            max_cost,
            weight: Fixed::USABLE_MAX / max_cost,
        }
    }

    #[test]
    fn test_everything_fits() {
        let candidates = [candidate(10), candidate(20)];
        let outcome = water_fill(Fixed::from_int(100), &candidates);
        assert_eq!(outcome.money, vec![Fixed::from_int(10), Fixed::from_int(20)]);
        assert_eq!(outcome.fully_funded, vec![true, true]);
        assert_eq!(outcome.passes, 2);
    }

    #[test]
    fn test_cheapest_funded_first_then_split() {
        let candidates = [candidate(50), candidate(30), candidate(20)];
        let outcome = water_fill(Fixed::from_int(60), &candidates);

        assert_eq!(outcome.money[2], Fixed::from_int(20));
        assert_eq!(outcome.fully_funded, vec![false, false, true]);
        assert_eq!(outcome.passes, 2);
        // 40 left split 3:5 by inverse cost
        assert!((outcome.money[0] - Fixed::from_int(15)).abs() <= Fixed::from_raw(2));
        assert!((outcome.money[1] - Fixed::from_int(25)).abs() <= Fixed::from_raw(2));
        assert!(outcome.total() <= Fixed::from_int(60));
    }

    #[test]
    fn test_no_funds_or_no_weight() {
        let candidates = [candidate(10)];
        assert_eq!(water_fill(Fixed::ZERO, &candidates).total(), Fixed::ZERO);
        assert_eq!(water_fill(Fixed::from_int(-5), &candidates).total(), Fixed::ZERO);
        let weightless = [FillCandidate {
            max_cost: Fixed::ONE,
            weight: Fixed::ZERO,
        }];
        let outcome = water_fill(Fixed::from_int(10), &weightless);
        assert_eq!(outcome.total(), Fixed::ZERO);
        assert_eq!(outcome.passes, 0);
    }

    #[test]
    fn test_many_epsilon_costs_do_not_overflow_weights() {
        let candidates: Vec<_> = (0..64)
            .map(|_| FillCandidate {
                max_cost: Fixed::EPSILON,
                weight: Fixed::USABLE_MAX / Fixed::EPSILON,
            })
            .collect();
        let outcome = water_fill(Fixed::from_int(1000), &candidates);

        assert!(outcome.fully_funded.iter().all(|&funded| funded));
        assert_eq!(outcome.total(), Fixed::from_raw(64));
        assert_eq!(outcome.passes, 64);
    }

    proptest! {
        #[test]
        fn prop_never_overspends(
            available in 0i64..1_000_000,
            costs in prop::collection::vec(1i64..100_000, 0..12),
        ) {
            let candidates: Vec<_> = costs.iter().map(|&c| candidate(c)).collect();
            let available = Fixed::from_int(available);
            let outcome = water_fill(available, &candidates);
            prop_assert!(outcome.total() <= available);
            prop_assert!(outcome.passes <= candidates.len().max(1));
            for (money, c) in outcome.money.iter().zip(&candidates) {
                prop_assert!(*money >= Fixed::ZERO);
                prop_assert!(*money <= c.max_cost);
            }
        }
    }
}
