//! Loyalty tier ladder.
//!
//! The tier is a pure, monotonic function of a requester's cumulative stats. Every threshold in a rung must be met
//! to reach that rung; recomputing with unchanged stats always yields the same tier.

use crate::db_types::{RequesterStats, Tier};

struct TierThresholds {
    tier: Tier,
    min_requests: i64,
    min_successful: i64,
    min_performances: i64,
}

const LADDER: [TierThresholds; 3] = [
    TierThresholds { tier: Tier::Platinum, min_requests: 50, min_successful: 40, min_performances: 10 },
    TierThresholds { tier: Tier::Gold, min_requests: 20, min_successful: 15, min_performances: 5 },
    TierThresholds { tier: Tier::Silver, min_requests: 5, min_successful: 3, min_performances: 2 },
];

/// Recomputes the tier for the given stats. Bronze is the floor.
pub fn tier_for(stats: &RequesterStats) -> Tier {
    LADDER
        .iter()
        .find(|rung| {
            stats.total_requests >= rung.min_requests
                && stats.successful_requests >= rung.min_successful
                && stats.performances_attended >= rung.min_performances
        })
        .map(|rung| rung.tier)
        .unwrap_or(Tier::Bronze)
}
