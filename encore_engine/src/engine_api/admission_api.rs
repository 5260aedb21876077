use log::*;

use crate::{
    db_types::{NewChargeRecord, NewRequest, RequestStatus},
    engine_api::{
        errors::AdmissionError,
        queue_api::QueueApi,
        request_objects::{AdmissionOutcome, NewRequestSubmission},
        tier_api,
    },
    events::{EventProducers, RequestAdmittedEvent},
    helpers::{new_request_id, split_payment},
    traits::{PaymentProvider, RequestGatewayDatabase, RequestGatewayError},
    verify::PaymentVerifier,
};

pub const DEFAULT_GENRE: &str = "Unknown";

/// `AdmissionApi` turns a verified payment into exactly one pending request in exactly one queue.
///
/// The flow is:
/// 1. Idempotency-key lookup. A retry of an already-admitted submission returns the prior result unchanged.
/// 2. The performance must exist and be accepting requests.
/// 3. The charge is verified against the performance's fixed price point.
/// 4. The charge and request are persisted as one atomic unit; the uniqueness of the transaction ref is what makes
///    double-spends impossible, not the advisory pre-check.
/// 5. The request enters the queue at its computed priority position, stats and earnings are credited, and an
///    admission event is published.
pub struct AdmissionApi<B, P>
where P: PaymentProvider
{
    db: B,
    verifier: PaymentVerifier<P>,
    queue: QueueApi<B>,
    producers: EventProducers,
}

impl<B, P> AdmissionApi<B, P>
where
    B: RequestGatewayDatabase,
    P: PaymentProvider,
{
    pub fn new(db: B, provider: P, producers: EventProducers) -> Self {
        let queue = QueueApi::new(db.clone(), producers.clone());
        Self { db, verifier: PaymentVerifier::new(provider), queue, producers }
    }

    pub fn with_verifier(mut self, verifier: PaymentVerifier<P>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn queue_api(&self) -> &QueueApi<B> {
        &self.queue
    }

    /// Admits one paid song request. See the type-level docs for the flow.
    pub async fn admit(&self, submission: NewRequestSubmission) -> Result<AdmissionOutcome, AdmissionError> {
        if let Some(outcome) = self.try_deduplicate(&submission.idempotency_key).await? {
            return Ok(outcome);
        }
        let performance = self
            .db
            .fetch_performance(&submission.performance_id)
            .await?
            .ok_or(AdmissionError::PerformanceNotFound)?;
        if !performance.accepts_requests() {
            debug!("📦️ Performance [{}] is not accepting requests", performance.performance_id);
            return Err(AdmissionError::NotAcceptingRequests);
        }
        let expected = performance.expected_price();
        self.verifier.verify(&submission.charge_ref, expected).await?;
        // Advisory only. The unique constraint on the transaction ref is the real guard.
        if self.db.fetch_charge_by_transaction_ref(&submission.charge_ref).await?.is_some() {
            debug!("📦️ Charge [{}] has already been consumed", submission.charge_ref);
            return Err(AdmissionError::PaymentAlreadyUsed);
        }

        let request_id = new_request_id();
        let split = split_payment(expected);
        let new_charge = NewChargeRecord {
            transaction_ref: submission.charge_ref.clone(),
            idempotency_key: submission.idempotency_key.clone(),
            request_id: request_id.clone(),
            performance_id: performance.performance_id.clone(),
            requester_id: submission.requester_id.clone(),
            performer_id: performance.performer_id.clone(),
            gross_amount: split.gross_amount,
            platform_fee: split.platform_fee,
            payee_earnings: split.payee_earnings,
        };
        let new_request = NewRequest {
            request_id: request_id.clone(),
            performance_id: performance.performance_id.clone(),
            requester_id: submission.requester_id.clone(),
            performer_id: performance.performer_id.clone(),
            song_title: submission.song_title.clone(),
            artist_name: submission.artist_name.clone(),
            genre: submission.genre.clone().unwrap_or_else(|| DEFAULT_GENRE.to_string()),
            request_class: submission.request_class,
            price: expected,
            dedication: submission.dedication.clone(),
            transaction_ref: submission.charge_ref.clone(),
        };
        let (charge, request) = match self.db.insert_charge_with_request(new_charge, new_request).await {
            Ok(pair) => pair,
            // A concurrent retry with the same key won the race. Return its result.
            Err(RequestGatewayError::IdempotencyKeyAlreadyUsed(key)) => {
                debug!("📦️ Lost admission race for idempotency key [{key}]. Returning the winner's result");
                return self
                    .try_deduplicate(&key)
                    .await?
                    .ok_or_else(|| AdmissionError::Database(RequestGatewayError::IdempotencyKeyAlreadyUsed(key)));
            },
            Err(e) => return Err(e.into()),
        };
        info!(
            "📦️ Request {} admitted for [{}]: {} by {} at {}",
            request.request_id, performance.performance_id, request.song_title, request.artist_name, request.price
        );

        let queue = self.queue.insert(&performance.performance_id, &request.request_id).await.map_err(|e| {
            warn!("📦️ Request {} admitted but queue insert failed: {e}", request.request_id);
            AdmissionError::Database(RequestGatewayError::DatabaseError(e.to_string()))
        })?;
        let queue_position = queue
            .ordered_request_ids
            .iter()
            .position(|id| id == &request.request_id)
            .map(|i| i as i64 + 1)
            .unwrap_or_default();

        let stats = self.db.record_admission(&submission.requester_id, &performance.performance_id).await?;
        tier_api::recompute_from_stats(&self.db, &self.producers, &stats).await?;
        self.db.credit_payee(&performance.performer_id, charge.payee_earnings, charge.gross_amount).await?;

        let request = self.db.fetch_request(&request.request_id).await?.unwrap_or(request);
        for producer in &self.producers.request_admitted_producer {
            producer
                .publish_event(RequestAdmittedEvent {
                    request: request.clone(),
                    charge: charge.clone(),
                    queue_position,
                })
                .await;
        }
        Ok(AdmissionOutcome { request, charge, deduplicated: false })
    }

    /// Looks up a prior admission for the idempotency key. If an earlier attempt committed the charge and request
    /// but died before the queue write, the retry finishes the job here, so same-key retries always converge on a
    /// queued pending request.
    async fn try_deduplicate(&self, idempotency_key: &str) -> Result<Option<AdmissionOutcome>, AdmissionError> {
        let Some(charge) = self.db.fetch_charge_by_idempotency_key(idempotency_key).await? else {
            return Ok(None);
        };
        let mut request = self
            .db
            .fetch_request(&charge.request_id)
            .await?
            .ok_or_else(|| AdmissionError::Database(RequestGatewayError::RequestNotFound(charge.request_id.clone())))?;
        if request.status == RequestStatus::Pending {
            let queue = self.db.fetch_queue(&request.performance_id).await?;
            if !queue.ordered_request_ids.contains(&request.request_id) {
                warn!(
                    "📦️ Request {} was admitted but never entered the queue for [{}]. Completing the admission",
                    request.request_id, request.performance_id
                );
                self.queue.insert(&request.performance_id, &request.request_id).await.map_err(|e| {
                    AdmissionError::Database(RequestGatewayError::DatabaseError(e.to_string()))
                })?;
                request = self.db.fetch_request(&request.request_id).await?.unwrap_or(request);
            }
        }
        debug!("📦️ Submission with idempotency key [{idempotency_key}] was already admitted as {}", request.request_id);
        Ok(Some(AdmissionOutcome { request, charge, deduplicated: true }))
    }
}
