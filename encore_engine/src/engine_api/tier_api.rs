use log::*;

use crate::{
    db_types::RequesterStats,
    events::{EventProducers, TierChangedEvent},
    tier::tier_for,
    traits::{RequestGatewayDatabase, RequestGatewayError, StatsManagement},
};

/// Re-evaluates the requester's tier from the given stats snapshot. Persists and announces the change only when the
/// ladder actually moves; same-tier recomputations are silent.
pub async fn recompute_from_stats<B>(
    db: &B,
    producers: &EventProducers,
    stats: &RequesterStats,
) -> Result<(), RequestGatewayError>
where
    B: StatsManagement,
{
    let new_tier = tier_for(stats);
    if new_tier == stats.tier {
        return Ok(());
    }
    let changed = db.update_tier(&stats.requester_id, new_tier).await?;
    if !changed {
        return Ok(());
    }
    info!("⭐️ Requester {} moved from {} to {}", stats.requester_id, stats.tier, new_tier);
    for producer in &producers.tier_changed_producer {
        producer
            .publish_event(TierChangedEvent {
                requester_id: stats.requester_id.clone(),
                old_tier: stats.tier,
                new_tier,
            })
            .await;
    }
    Ok(())
}

/// `TierApi` exposes loyalty-tier reads and recomputation on its own, for callers that are not in the middle of an
/// admission or acceptance flow.
pub struct TierApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B: Clone> Clone for TierApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), producers: self.producers.clone() }
    }
}

impl<B> TierApi<B>
where B: RequestGatewayDatabase
{
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub async fn stats(&self, requester_id: &str) -> Result<RequesterStats, RequestGatewayError> {
        self.db.fetch_or_create_requester_stats(requester_id).await
    }

    /// Forces a tier re-evaluation from current stats. Returns the stats as they stand after the recomputation.
    pub async fn recompute_tier(&self, requester_id: &str) -> Result<RequesterStats, RequestGatewayError> {
        let stats = self.db.fetch_or_create_requester_stats(requester_id).await?;
        recompute_from_stats(&self.db, &self.producers, &stats).await?;
        self.db.fetch_or_create_requester_stats(requester_id).await
    }
}
