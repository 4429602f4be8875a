//! PulsePoints reward schedule and funding arithmetic.

use rust_decimal::Decimal;

/// Points awarded to the first user to perform an action on a project.
pub const BASE_REWARD: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Points shaved off for every distinct user who got there first.
pub const REWARD_DECAY: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

/// Peer-rank at which the reward reaches zero.
pub const ZERO_REWARD_RANK: u64 = 50;

/// Points for an action given how many distinct users already performed it on
/// the same project: `max(0, 5 - rank * 0.1)`, exact, never negative.
#[must_use]
pub fn reward_for_rank(peer_rank: u64) -> Decimal {
    if peer_rank >= ZERO_REWARD_RANK {
        return Decimal::ZERO;
    }
    let points = BASE_REWARD - Decimal::from(peer_rank) * REWARD_DECAY;
    points.max(Decimal::ZERO)
}

/// Share of the funding goal raised so far, as a percentage rounded to two
/// decimal places. A goal of zero (or less) yields 0 rather than dividing.
///
/// The value is not clamped: overfunded projects report more than 100.
#[must_use]
pub fn funding_percentage(raised: Decimal, goal: Decimal) -> Decimal {
    if goal <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    raised
        .checked_div(goal)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map_or(Decimal::ZERO, |pct| pct.round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_interaction_earns_full_reward() {
        assert_eq!(reward_for_rank(0), Decimal::from(5));
    }

    #[test]
    fn reward_decays_by_a_tenth_per_rank() {
        assert_eq!(reward_for_rank(1), Decimal::new(49, 1));
        assert_eq!(reward_for_rank(10), Decimal::from(4));
        assert_eq!(reward_for_rank(49), Decimal::new(1, 1));
    }

    #[test]
    fn reward_reaches_zero_at_fiftieth_rank() {
        assert_eq!(reward_for_rank(50), Decimal::ZERO);
    }

    #[test]
    fn reward_never_goes_negative() {
        assert_eq!(reward_for_rank(60), Decimal::ZERO);
        assert_eq!(reward_for_rank(u64::MAX), Decimal::ZERO);
    }

    #[test]
    fn reward_is_not_rounded() {
        assert_eq!(reward_for_rank(33).to_string(), "1.7");
    }

    #[test]
    fn funding_percentage_zero_goal_is_zero() {
        assert_eq!(
            funding_percentage(Decimal::ZERO, Decimal::ZERO),
            Decimal::ZERO
        );
        assert_eq!(
            funding_percentage(Decimal::from(500), Decimal::ZERO),
            Decimal::ZERO
        );
    }

    #[test]
    fn funding_percentage_computes_share_of_goal() {
        assert_eq!(
            funding_percentage(Decimal::from(250), Decimal::from(1000)),
            Decimal::from(25)
        );
    }

    #[test]
    fn funding_percentage_rounds_to_two_places() {
        assert_eq!(
            funding_percentage(Decimal::from(1), Decimal::from(3)),
            Decimal::new(3333, 2)
        );
    }

    #[test]
    fn funding_percentage_allows_overfunding() {
        assert_eq!(
            funding_percentage(Decimal::from(1500), Decimal::from(1000)),
            Decimal::from(150)
        );
    }
}
