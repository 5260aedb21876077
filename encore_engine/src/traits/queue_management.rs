use crate::{
    db_types::{QueueRecord, Request, RequestId},
    traits::RequestGatewayError,
};

/// Versioned access to a performance's queue.
///
/// The queue sequence is the source of truth for ordering; each pending request's `queue_position` is a denormalized
/// projection. [`Self::write_queue`] must persist both in one atomic unit so no reader ever observes them
/// disagreeing, and must be conditional on the version the caller read. Mutators retry on version conflicts,
/// re-deriving the order from fresh state — this is what serializes concurrent writers per performance.
#[allow(async_fn_in_trait)]
pub trait QueueManagement: Clone {
    /// Fetches the queue record (sequence + version) for a performance.
    async fn fetch_queue(&self, performance_id: &str) -> Result<QueueRecord, RequestGatewayError>;

    /// All requests with `Pending` status for the performance, in no particular order.
    async fn fetch_pending_requests(&self, performance_id: &str) -> Result<Vec<Request>, RequestGatewayError>;

    /// Replaces the queue sequence and renumbers every listed request's `queue_position` to its 1-based index, in a
    /// single atomic unit. Fails with [`RequestGatewayError::QueueVersionConflict`] if the stored version no longer
    /// matches `expected_version`.
    async fn write_queue(
        &self,
        performance_id: &str,
        ordered: &[RequestId],
        expected_version: i64,
    ) -> Result<QueueRecord, RequestGatewayError>;
}
