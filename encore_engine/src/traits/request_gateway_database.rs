use thiserror::Error;

use crate::{
    db_types::{
        ChargeRecord,
        FailedRefund,
        InvalidStatusTransition,
        NewChargeRecord,
        NewPerformance,
        NewRequest,
        Performance,
        Request,
        RequestId,
        RequestStatus,
    },
    traits::{QueueManagement, StatsManagement},
};

/// The top-level contract for backends supporting the request engine.
///
/// This behaviour includes:
/// * Managing performances and whether they accept requests
/// * Consuming verified charges exactly once and admitting requests atomically
/// * Request status transitions with exhaustive validation
/// * Durable refund bookkeeping for the veto saga
#[allow(async_fn_in_trait)]
pub trait RequestGatewayDatabase: Clone + QueueManagement + StatsManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Creates or updates a performance, creating its (empty) queue record alongside it.
    async fn upsert_performance(&self, performance: NewPerformance) -> Result<Performance, RequestGatewayError>;

    async fn fetch_performance(&self, performance_id: &str) -> Result<Option<Performance>, RequestGatewayError>;

    /// Opens or closes a performance for new requests.
    async fn set_accepting_requests(
        &self,
        performance_id: &str,
        accepting: bool,
    ) -> Result<Performance, RequestGatewayError>;

    /// Fast-path idempotency lookup. The authoritative enforcement is the uniqueness constraint applied by
    /// [`Self::insert_charge_with_request`]; this lookup lets retried submissions short-circuit with the prior
    /// result without touching the payment provider again.
    async fn fetch_charge_by_idempotency_key(&self, key: &str)
        -> Result<Option<ChargeRecord>, RequestGatewayError>;

    /// Returns the charge record that consumed the given external charge reference, if any.
    async fn fetch_charge_by_transaction_ref(
        &self,
        transaction_ref: &str,
    ) -> Result<Option<ChargeRecord>, RequestGatewayError>;

    /// Persists the charge record and the new request as a single atomic unit. The charge insert must be an atomic
    /// insert-if-absent on both `transaction_ref` and `idempotency_key`; two concurrent admissions for the same
    /// retried submission must not both succeed.
    async fn insert_charge_with_request(
        &self,
        charge: NewChargeRecord,
        request: NewRequest,
    ) -> Result<(ChargeRecord, Request), RequestGatewayError>;

    async fn fetch_request(&self, request_id: &RequestId) -> Result<Option<Request>, RequestGatewayError>;

    /// Transitions a request to a new status after validating the transition. Moving out of `Pending` clears the
    /// request's queue position. An optional reason is recorded for vetoes.
    async fn update_request_status(
        &self,
        request_id: &RequestId,
        new_status: RequestStatus,
        reason: Option<&str>,
    ) -> Result<Request, RequestGatewayError>;

    /// Flips a completed charge to refunded, exactly once, stamping the refund time and provider refund id.
    async fn mark_charge_refunded(
        &self,
        transaction_ref: &str,
        refund_id: &str,
    ) -> Result<ChargeRecord, RequestGatewayError>;

    /// Durably records a refund that exhausted its retry budget, for manual resolution.
    async fn insert_failed_refund(
        &self,
        request_id: &RequestId,
        attempts: u32,
        last_error: &str,
    ) -> Result<FailedRefund, RequestGatewayError>;

    async fn fetch_failed_refunds_for_request(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<FailedRefund>, RequestGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), RequestGatewayError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum RequestGatewayError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("The requested performance {0} does not exist")]
    PerformanceNotFound(String),
    #[error("The requested request {0} does not exist")]
    RequestNotFound(RequestId),
    #[error("No charge record exists for transaction ref {0}")]
    ChargeNotFound(String),
    #[error("The charge {0} has already been consumed by another request")]
    TransactionRefAlreadyUsed(String),
    #[error("A charge record already exists for idempotency key {0}")]
    IdempotencyKeyAlreadyUsed(String),
    #[error("Queue for performance {performance_id} was modified concurrently (expected version {expected})")]
    QueueVersionConflict { performance_id: String, expected: i64 },
    #[error("{0}")]
    InvalidStatusTransition(#[from] InvalidStatusTransition),
    #[error("The charge for {0} is not in a refundable state")]
    ChargeNotRefundable(String),
}

impl From<sqlx::Error> for RequestGatewayError {
    fn from(e: sqlx::Error) -> Self {
        RequestGatewayError::DatabaseError(e.to_string())
    }
}
