use encore_common::Cents;
use log::*;

use crate::{
    db_types::{ChargeStatus, RequestStatus},
    engine_api::{
        errors::VetoError,
        queue_api::QueueApi,
        request_objects::{RefundOutcome, VetoOutcome},
    },
    events::{EventProducers, RefundProcessedEvent, RequestVetoedEvent},
    retry::{RetryPolicy, Sleeper, TokioSleeper},
    traits::{PaymentProvider, RequestGatewayDatabase},
    verify::provider_call,
    RequestId,
};

pub const DEFAULT_VETO_REASON: &str = "Vetoed by performer";

/// `VetoApi` runs the veto saga: the performer rejects a pending request, the request leaves the queue, and the
/// requester gets their money back.
///
/// The veto itself commits first and is never rolled back. The refund runs afterwards under a bounded retry policy;
/// if every attempt fails the failure is recorded durably for manual resolution and the request stays vetoed.
/// Vetoing a request whose charge was already refunded is a no-op success.
pub struct VetoApi<B, P, S = TokioSleeper> {
    db: B,
    provider: P,
    queue: QueueApi<B>,
    producers: EventProducers,
    policy: RetryPolicy,
    sleeper: S,
}

impl<B, P> VetoApi<B, P>
where
    B: RequestGatewayDatabase,
    P: PaymentProvider,
{
    pub fn new(db: B, provider: P, producers: EventProducers) -> Self {
        let queue = QueueApi::new(db.clone(), producers.clone());
        Self { db, provider, queue, producers, policy: RetryPolicy::refund_default(), sleeper: TokioSleeper }
    }
}

impl<B, P, S> VetoApi<B, P, S>
where
    B: RequestGatewayDatabase,
    P: PaymentProvider,
    S: Sleeper,
{
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> VetoApi<B, P, S2> {
        VetoApi {
            db: self.db,
            provider: self.provider,
            queue: self.queue,
            producers: self.producers,
            policy: self.policy,
            sleeper,
        }
    }

    /// Vetoes a request on behalf of the performer who owns its performance.
    pub async fn veto(
        &self,
        request_id: &RequestId,
        acting_performer_id: &str,
        reason: Option<&str>,
    ) -> Result<VetoOutcome, VetoError> {
        let request = self.db.fetch_request(request_id).await?.ok_or(VetoError::RequestNotFound)?;
        if request.performer_id != acting_performer_id {
            return Err(VetoError::Unauthorized);
        }
        let charge = self
            .db
            .fetch_charge_by_transaction_ref(&request.transaction_ref)
            .await?
            .ok_or(VetoError::RequestNotFound)?;
        if request.status == RequestStatus::Vetoed {
            // Repeated veto of an already-refunded request is a no-op success
            if charge.status == ChargeStatus::Refunded {
                debug!("🛑️ Request {request_id} is already vetoed and refunded. Nothing to do");
                return Ok(VetoOutcome { request, refund: RefundOutcome::AlreadyRefunded });
            }
            // Vetoed, but the earlier refund never landed. Retry the money side only.
            debug!("🛑️ Request {request_id} is vetoed with an outstanding refund. Retrying the refund");
            let refund = self.run_refund(&request.transaction_ref, request_id, &request.requester_id).await?;
            return Ok(VetoOutcome { request, refund });
        }
        let reason = reason.unwrap_or(DEFAULT_VETO_REASON);
        let request = self.db.update_request_status(request_id, RequestStatus::Vetoed, Some(reason)).await?;
        self.queue.remove(&request.performance_id, request_id).await?;
        info!("🛑️ Request {request_id} vetoed by performer {acting_performer_id}: {reason}");
        for producer in &self.producers.request_vetoed_producer {
            producer
                .publish_event(RequestVetoedEvent { request: request.clone(), reason: reason.to_string() })
                .await;
        }
        let refund = self.run_refund(&request.transaction_ref, request_id, &request.requester_id).await?;
        Ok(VetoOutcome { request, refund })
    }

    /// The refund half of the saga. Fails into durable bookkeeping rather than an error; the veto stands either way.
    async fn run_refund(
        &self,
        transaction_ref: &str,
        request_id: &RequestId,
        requester_id: &str,
    ) -> Result<RefundOutcome, VetoError> {
        let charge = self
            .db
            .fetch_charge_by_transaction_ref(transaction_ref)
            .await?
            .ok_or(VetoError::RequestNotFound)?;
        if charge.status == ChargeStatus::Refunded {
            return Ok(RefundOutcome::AlreadyRefunded);
        }
        let amount = charge.gross_amount;
        let result = self
            .policy
            .run(&self.sleeper, |attempt| {
                trace!("💸️ Refund attempt {attempt} for charge [{transaction_ref}]");
                provider_call(self.provider.refund(transaction_ref, amount))
            })
            .await;
        match result {
            Ok(receipt) => {
                let charge = self.db.mark_charge_refunded(transaction_ref, &receipt.refund_id).await?;
                info!("💸️ Refunded {} for request {request_id} (refund id [{}])", receipt.amount, receipt.refund_id);
                self.publish_refund(request_id, requester_id, amount, true).await;
                Ok(RefundOutcome::Refunded { charge })
            },
            Err(exhausted) => {
                let last_error = exhausted.last_error.to_string();
                error!(
                    "💸️ Refund for request {request_id} failed after {} attempts: {last_error}. Flagged for manual \
                     review",
                    exhausted.attempts
                );
                self.db.insert_failed_refund(request_id, exhausted.attempts, &last_error).await?;
                self.publish_refund(request_id, requester_id, amount, false).await;
                Ok(RefundOutcome::ManualReviewRequired { attempts: exhausted.attempts, last_error })
            },
        }
    }

    async fn publish_refund(
        &self,
        request_id: &RequestId,
        requester_id: &str,
        amount: Cents,
        succeeded: bool,
    ) {
        for producer in &self.producers.refund_processed_producer {
            producer
                .publish_event(RefundProcessedEvent {
                    request_id: request_id.clone(),
                    requester_id: requester_id.to_string(),
                    amount,
                    succeeded,
                })
                .await;
        }
    }
}
