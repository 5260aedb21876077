use std::{collections::HashMap, fmt::Debug};

use chrono::Utc;
use log::*;

use crate::{
    db_types::{QueueRecord, Request, RequestId, RequestStatus, Tier},
    engine_api::{errors::QueueError, request_objects::QueueSnapshot, tier_api},
    events::{EventProducers, RequestAcceptedEvent},
    priority,
    traits::{RequestGatewayDatabase, RequestGatewayError},
};

/// How many times a queue mutation re-derives order from fresh state after losing a version race before giving up.
const MAX_WRITE_ATTEMPTS: u32 = 5;

/// `QueueApi` is the only component that writes a performance's queue. It keeps the queue sequence and every pending
/// request's `queue_position` mutually consistent, and serializes concurrent writers to the same performance through
/// the backend's versioned compare-and-swap write.
pub struct QueueApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for QueueApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "QueueApi")
    }
}

impl<B: Clone> Clone for QueueApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), producers: self.producers.clone() }
    }
}

impl<B> QueueApi<B>
where B: RequestGatewayDatabase
{
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    /// Recomputes the full priority order including the (already persisted, pending) new request and writes the new
    /// sequence. Returns the updated queue record.
    pub async fn insert(&self, performance_id: &str, request_id: &RequestId) -> Result<QueueRecord, QueueError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let queue = self.db.fetch_queue(performance_id).await?;
            let pending = self.db.fetch_pending_requests(performance_id).await?;
            if !pending.iter().any(|r| &r.request_id == request_id) {
                return Err(QueueError::RequestNotFound);
            }
            let with_tiers = self.attach_tiers(pending).await?;
            let ordered = priority::compute_order(&with_tiers, Utc::now());
            match self.db.write_queue(performance_id, &ordered, queue.version).await {
                Ok(updated) => {
                    debug!(
                        "🎶️ Request {request_id} inserted into queue for [{performance_id}]; {} pending",
                        updated.ordered_request_ids.len()
                    );
                    return Ok(updated);
                },
                Err(RequestGatewayError::QueueVersionConflict { .. }) => {
                    trace!("🎶️ Queue write conflict on [{performance_id}] (attempt {attempt}). Re-deriving order");
                },
                Err(e) => return Err(e.into()),
            }
        }
        Err(QueueError::Contention)
    }

    /// Performer-authored override. The explicit ordering replaces the computed order verbatim, provided the id set
    /// exactly matches the current pending set — no silent drops or insertions.
    pub async fn reorder(
        &self,
        performance_id: &str,
        acting_performer_id: &str,
        ordered: &[RequestId],
    ) -> Result<QueueRecord, QueueError> {
        let performance = self
            .db
            .fetch_performance(performance_id)
            .await?
            .ok_or(QueueError::PerformanceNotFound)?;
        if performance.performer_id != acting_performer_id {
            return Err(QueueError::Unauthorized);
        }
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let queue = self.db.fetch_queue(performance_id).await?;
            let pending = self.db.fetch_pending_requests(performance_id).await?;
            validate_reorder(&pending, ordered)?;
            match self.db.write_queue(performance_id, ordered, queue.version).await {
                Ok(updated) => {
                    debug!("🎶️ Queue for [{performance_id}] reordered by performer");
                    return Ok(updated);
                },
                Err(RequestGatewayError::QueueVersionConflict { .. }) => {
                    trace!("🎶️ Queue write conflict on [{performance_id}] (attempt {attempt}). Re-validating");
                },
                Err(e) => return Err(e.into()),
            }
        }
        Err(QueueError::Contention)
    }

    /// Removes the id from the sequence and renumbers the remaining positions densely. The removed request's own
    /// position is cleared by its status transition out of `Pending`.
    pub async fn remove(&self, performance_id: &str, request_id: &RequestId) -> Result<QueueRecord, QueueError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let queue = self.db.fetch_queue(performance_id).await?;
            let ordered: Vec<RequestId> =
                queue.ordered_request_ids.iter().filter(|id| *id != request_id).cloned().collect();
            match self.db.write_queue(performance_id, &ordered, queue.version).await {
                Ok(updated) => {
                    debug!(
                        "🎶️ Request {request_id} removed from queue for [{performance_id}]; {} remain",
                        updated.ordered_request_ids.len()
                    );
                    return Ok(updated);
                },
                Err(RequestGatewayError::QueueVersionConflict { .. }) => {
                    trace!("🎶️ Queue write conflict on [{performance_id}] (attempt {attempt}). Re-reading");
                },
                Err(e) => return Err(e.into()),
            }
        }
        Err(QueueError::Contention)
    }

    /// The ordered queue with full request records, in play order.
    pub async fn get_queue(&self, performance_id: &str) -> Result<QueueSnapshot, QueueError> {
        let queue = self.db.fetch_queue(performance_id).await?;
        let pending = self.db.fetch_pending_requests(performance_id).await?;
        let mut by_id: HashMap<RequestId, Request> =
            pending.into_iter().map(|r| (r.request_id.clone(), r)).collect();
        let requests: Vec<Request> =
            queue.ordered_request_ids.iter().filter_map(|id| by_id.remove(id)).collect();
        Ok(QueueSnapshot { performance_id: performance_id.to_string(), requests, version: queue.version })
    }

    /// Accepts a pending request: `Pending` → `Accepted`, removal from the queue, and a successful-request credit
    /// towards the requester's tier. Symmetric to a veto, but no money moves.
    pub async fn accept(
        &self,
        request_id: &RequestId,
        acting_performer_id: &str,
    ) -> Result<Request, QueueError> {
        let request = self.db.fetch_request(request_id).await?.ok_or(QueueError::RequestNotFound)?;
        if request.performer_id != acting_performer_id {
            return Err(QueueError::Unauthorized);
        }
        let request = self.db.update_request_status(request_id, RequestStatus::Accepted, None).await?;
        self.remove(&request.performance_id, request_id).await?;
        let stats = self.db.record_successful_request(&request.requester_id).await?;
        tier_api::recompute_from_stats(&self.db, &self.producers, &stats).await?;
        for producer in &self.producers.request_accepted_producer {
            producer.publish_event(RequestAcceptedEvent { request: request.clone() }).await;
        }
        info!("🎶️ Request {request_id} accepted by performer {acting_performer_id}");
        Ok(request)
    }

    async fn attach_tiers(&self, pending: Vec<Request>) -> Result<Vec<(Request, Tier)>, QueueError> {
        let mut tiers: HashMap<String, Tier> = HashMap::new();
        for request in &pending {
            if !tiers.contains_key(&request.requester_id) {
                let stats = self.db.fetch_or_create_requester_stats(&request.requester_id).await?;
                tiers.insert(request.requester_id.clone(), stats.tier);
            }
        }
        Ok(pending
            .into_iter()
            .map(|r| {
                let tier = tiers.get(&r.requester_id).copied().unwrap_or_default();
                (r, tier)
            })
            .collect())
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

/// A reorder must name exactly the current pending set: same ids, no duplicates, nothing missing, nothing extra.
fn validate_reorder(pending: &[Request], ordered: &[RequestId]) -> Result<(), QueueError> {
    use std::collections::HashSet;
    let mut seen = HashSet::with_capacity(ordered.len());
    for id in ordered {
        if !seen.insert(id) {
            return Err(QueueError::InvalidReorder(format!("duplicate id {id}")));
        }
    }
    let pending_ids: HashSet<&RequestId> = pending.iter().map(|r| &r.request_id).collect();
    if let Some(extra) = ordered.iter().find(|id| !pending_ids.contains(id)) {
        return Err(QueueError::InvalidReorder(format!("{extra} is not a pending request for this performance")));
    }
    if ordered.len() != pending_ids.len() {
        return Err(QueueError::InvalidReorder(format!(
            "expected {} ids, got {}",
            pending_ids.len(),
            ordered.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use encore_common::Cents;

    use super::*;
    use crate::db_types::RequestClass;

    fn pending_request(id: &str) -> Request {
        let now = Utc::now();
        Request {
            id: 0,
            request_id: RequestId(id.to_string()),
            performance_id: "perf-1".to_string(),
            requester_id: "user-1".to_string(),
            performer_id: "dj-1".to_string(),
            song_title: "song".to_string(),
            artist_name: "artist".to_string(),
            genre: "Unknown".to_string(),
            request_class: RequestClass::Standard,
            price: Cents::from_rands(50),
            status: RequestStatus::Pending,
            queue_position: Some(1),
            dedication: None,
            transaction_ref: format!("ch_{id}"),
            veto_reason: None,
            submitted_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn reorder_must_cover_the_pending_set_exactly() {
        let pending = vec![pending_request("a"), pending_request("b")];
        let ok = [RequestId("b".into()), RequestId("a".into())];
        assert!(validate_reorder(&pending, &ok).is_ok());

        let missing = [RequestId("a".into())];
        assert!(matches!(validate_reorder(&pending, &missing), Err(QueueError::InvalidReorder(_))));

        let extra = [RequestId("a".into()), RequestId("b".into()), RequestId("c".into())];
        assert!(matches!(validate_reorder(&pending, &extra), Err(QueueError::InvalidReorder(_))));

        let duplicated = [RequestId("a".into()), RequestId("a".into())];
        assert!(matches!(validate_reorder(&pending, &duplicated), Err(QueueError::InvalidReorder(_))));
    }
}
