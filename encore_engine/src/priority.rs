//! Queue priority engine.
//!
//! Computes a deterministic total order over all pending requests for a performance. Price and loyalty tier dominate
//! the ordering (multiplicative), while wait time is additive so that an old low-priority request eventually surfaces
//! against a stream of new high-tier requests.
//!
//! The scoring formula is:
//!
//! ```text
//! score = tier_weight * class_multiplier * (price_in_rands / 10) + (minutes_waiting / 5)
//! ```
//!
//! The price and wait terms are deliberately not normalized against each other; the divisors are tuning constants
//! carried over from production and exposed here for product owners to adjust.
//!
//! `compute_order` is pure given its inputs; the current time is passed in as an argument. The order is recomputed on
//! every admission and on demand, not continuously — wait time only needs minute granularity.

use chrono::{DateTime, Utc};

use crate::db_types::{Request, RequestId, Tier};

/// Divisor applied to the price (in whole currency units) before the tier/class multipliers.
pub const PRICE_WEIGHT_DIVISOR: f64 = 10.0;
/// Wait time is credited in increments of this many minutes.
pub const WAIT_WEIGHT_MINUTES: f64 = 5.0;

/// Priority score for a single request. Higher scores sort earlier in the queue.
pub fn priority_score(request: &Request, tier: Tier, now: DateTime<Utc>) -> f64 {
    let tier_weight = tier.weight() as f64;
    let class_multiplier = request.request_class.multiplier() as f64;
    let price_weight = request.price.value() as f64 / 100.0 / PRICE_WEIGHT_DIVISOR;
    let minutes_waiting = (now - request.submitted_at).num_seconds().max(0) as f64 / 60.0;
    let wait_weight = minutes_waiting / WAIT_WEIGHT_MINUTES;
    tier_weight * class_multiplier * price_weight + wait_weight
}

/// Sorts the given requests into queue order: descending by score, with score ties broken by earlier submission and
/// finally by request id so that the result is fully deterministic.
pub fn compute_order(requests: &[(Request, Tier)], now: DateTime<Utc>) -> Vec<RequestId> {
    let mut scored: Vec<(f64, &Request)> =
        requests.iter().map(|(req, tier)| (priority_score(req, *tier, now), req)).collect();
    scored.sort_by(|(score_a, a), (score_b, b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.submitted_at.cmp(&b.submitted_at))
            .then_with(|| a.request_id.as_str().cmp(b.request_id.as_str()))
    });
    scored.into_iter().map(|(_, req)| req.request_id.clone()).collect()
}

#[cfg(test)]
mod test {
    use chrono::Duration;
    use encore_common::Cents;

    use super::*;
    use crate::db_types::{RequestClass, RequestStatus};

    fn request(id: &str, price_rands: i64, class: RequestClass, submitted_at: DateTime<Utc>) -> Request {
        Request {
            id: 0,
            request_id: RequestId(id.to_string()),
            performance_id: "perf-1".to_string(),
            requester_id: "user-1".to_string(),
            performer_id: "dj-1".to_string(),
            song_title: "song".to_string(),
            artist_name: "artist".to_string(),
            genre: "Unknown".to_string(),
            request_class: class,
            price: Cents::from_rands(price_rands),
            status: RequestStatus::Pending,
            queue_position: None,
            dedication: None,
            transaction_ref: format!("ch_{id}"),
            veto_reason: None,
            submitted_at,
            updated_at: submitted_at,
        }
    }

    #[test]
    fn higher_price_sorts_earlier_for_equal_class_and_tier() {
        let now = Utc::now();
        let a = request("a", 100, RequestClass::Standard, now);
        let b = request("b", 50, RequestClass::Standard, now);
        let order = compute_order(&[(b, Tier::Bronze), (a, Tier::Bronze)], now);
        assert_eq!(order, vec![RequestId("a".into()), RequestId("b".into())]);
    }

    #[test]
    fn equal_scores_tie_break_on_earlier_submission() {
        let now = Utc::now();
        let earlier = request("late-id", 50, RequestClass::Standard, now - Duration::minutes(10));
        let later = request("early-id", 50, RequestClass::Standard, now - Duration::minutes(10));
        // identical score and submission time: request id decides, deterministically
        let order = compute_order(&[(later.clone(), Tier::Bronze), (earlier.clone(), Tier::Bronze)], now);
        assert_eq!(order, vec![earlier.request_id.clone(), later.request_id.clone()]);

        let early = request("b", 50, RequestClass::Standard, now - Duration::seconds(30));
        let late = request("a", 50, RequestClass::Standard, now);
        // the early request has accrued more wait weight, so it scores higher outright
        let order = compute_order(&[(late, Tier::Bronze), (early.clone(), Tier::Bronze)], now);
        assert_eq!(order[0], early.request_id);
    }

    #[test]
    fn spotlight_outranks_standard_at_the_same_price() {
        let now = Utc::now();
        let spotlight = request("s", 50, RequestClass::Spotlight, now);
        let standard = request("t", 50, RequestClass::Standard, now);
        let order = compute_order(&[(standard, Tier::Silver), (spotlight.clone(), Tier::Silver)], now);
        assert_eq!(order[0], spotlight.request_id);
    }

    #[test]
    fn tier_multiplies_into_the_score() {
        let now = Utc::now();
        let platinum = request("p", 20, RequestClass::Standard, now);
        let bronze = request("q", 20, RequestClass::Standard, now);
        let order = compute_order(&[(bronze, Tier::Bronze), (platinum.clone(), Tier::Platinum)], now);
        assert_eq!(order[0], platinum.request_id);
    }

    #[test]
    fn wait_time_eventually_surfaces_a_low_priority_request() {
        let now = Utc::now();
        // Bronze standard R20 submitted 100 minutes ago: 1 * 1 * 2 + 20 = 22
        let old = request("old", 20, RequestClass::Standard, now - Duration::minutes(100));
        // Platinum spotlight R20 submitted just now: 4 * 3 * 2 + 0 = 24; R10 gives 12
        let fresh = request("fresh", 10, RequestClass::Spotlight, now);
        let order = compute_order(&[(fresh, Tier::Platinum), (old.clone(), Tier::Bronze)], now);
        assert_eq!(order[0], old.request_id);
    }

    #[test]
    fn score_matches_the_literal_formula() {
        let now = Utc::now();
        let req = request("x", 50, RequestClass::Spotlight, now - Duration::minutes(10));
        // 2 (Silver) * 3 (Spotlight) * 5 (R50 / 10) + 2 (10 min / 5)
        let score = priority_score(&req, Tier::Silver, now);
        assert!((score - 32.0).abs() < 1e-9, "score = {score}");
    }
}
