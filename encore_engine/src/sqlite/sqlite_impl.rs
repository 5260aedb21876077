//! `SqliteDatabase` is a concrete implementation of a request engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use encore_common::Cents;
use log::*;
use sqlx::SqlitePool;

use super::db::{charges, db_url, new_pool, performances, queues, refunds, requests, stats};
use crate::{
    db_types::{
        ChargeRecord,
        FailedRefund,
        NewChargeRecord,
        NewPerformance,
        NewRequest,
        PayeeBalance,
        Performance,
        QueueRecord,
        Request,
        RequestId,
        RequestStatus,
        RequesterStats,
        Tier,
    },
    traits::{QueueManagement, RequestGatewayDatabase, RequestGatewayError, StatsManagement},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new connection pool using the URL from the `ENCORE_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl RequestGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Creates or updates the performance and its queue record in a single transaction.
    async fn upsert_performance(&self, performance: NewPerformance) -> Result<Performance, RequestGatewayError> {
        let mut tx = self.pool.begin().await?;
        let result = performances::upsert_performance(performance, &mut tx).await?;
        queues::create_queue(&result.performance_id, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_performance(&self, performance_id: &str) -> Result<Option<Performance>, RequestGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let performance = performances::fetch_performance(performance_id, &mut conn).await?;
        Ok(performance)
    }

    async fn set_accepting_requests(
        &self,
        performance_id: &str,
        accepting: bool,
    ) -> Result<Performance, RequestGatewayError> {
        let mut conn = self.pool.acquire().await?;
        performances::set_accepting_requests(performance_id, accepting, &mut conn).await
    }

    async fn fetch_charge_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<ChargeRecord>, RequestGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let charge = charges::fetch_charge_by_idempotency_key(key, &mut conn).await?;
        Ok(charge)
    }

    async fn fetch_charge_by_transaction_ref(
        &self,
        transaction_ref: &str,
    ) -> Result<Option<ChargeRecord>, RequestGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let charge = charges::fetch_charge_by_transaction_ref(transaction_ref, &mut conn).await?;
        Ok(charge)
    }

    /// Takes a verified charge and the request it pays for, and in a single atomic transaction,
    /// * consumes the charge's transaction ref and idempotency key (the unique indices reject double-spends and
    ///   concurrent retries),
    /// * saves the new request in `Pending` status.
    ///
    /// Either both records exist afterwards, or neither does.
    async fn insert_charge_with_request(
        &self,
        charge: NewChargeRecord,
        request: NewRequest,
    ) -> Result<(ChargeRecord, Request), RequestGatewayError> {
        let mut tx = self.pool.begin().await?;
        let charge = charges::insert_charge(charge, &mut tx).await?;
        let request = requests::insert_request(request, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Charge [{}] and request {} committed", charge.transaction_ref, request.request_id);
        Ok((charge, request))
    }

    async fn fetch_request(&self, request_id: &RequestId) -> Result<Option<Request>, RequestGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let request = requests::fetch_request(request_id, &mut conn).await?;
        Ok(request)
    }

    async fn update_request_status(
        &self,
        request_id: &RequestId,
        new_status: RequestStatus,
        reason: Option<&str>,
    ) -> Result<Request, RequestGatewayError> {
        let mut tx = self.pool.begin().await?;
        let request = requests::update_status(request_id, new_status, reason, &mut tx).await?;
        tx.commit().await?;
        Ok(request)
    }

    async fn mark_charge_refunded(
        &self,
        transaction_ref: &str,
        refund_id: &str,
    ) -> Result<ChargeRecord, RequestGatewayError> {
        let mut conn = self.pool.acquire().await?;
        charges::mark_refunded(transaction_ref, refund_id, &mut conn).await
    }

    async fn insert_failed_refund(
        &self,
        request_id: &RequestId,
        attempts: u32,
        last_error: &str,
    ) -> Result<FailedRefund, RequestGatewayError> {
        let mut conn = self.pool.acquire().await?;
        refunds::insert_failed_refund(request_id, attempts, last_error, &mut conn).await
    }

    async fn fetch_failed_refunds_for_request(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<FailedRefund>, RequestGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let records = refunds::fetch_for_request(request_id, &mut conn).await?;
        Ok(records)
    }

    async fn close(&mut self) -> Result<(), RequestGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}

impl QueueManagement for SqliteDatabase {
    async fn fetch_queue(&self, performance_id: &str) -> Result<QueueRecord, RequestGatewayError> {
        let mut conn = self.pool.acquire().await?;
        queues::fetch_queue(performance_id, &mut conn).await
    }

    async fn fetch_pending_requests(&self, performance_id: &str) -> Result<Vec<Request>, RequestGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let pending = requests::fetch_pending_requests(performance_id, &mut conn).await?;
        Ok(pending)
    }

    /// Replaces the queue sequence and renumbers the listed requests' positions in one transaction, conditional on
    /// the version the caller read.
    async fn write_queue(
        &self,
        performance_id: &str,
        ordered: &[RequestId],
        expected_version: i64,
    ) -> Result<QueueRecord, RequestGatewayError> {
        let mut tx = self.pool.begin().await?;
        let queue = queues::write_queue(performance_id, ordered, expected_version, &mut tx).await?;
        requests::renumber_positions(performance_id, ordered, &mut tx).await?;
        tx.commit().await?;
        Ok(queue)
    }
}

impl StatsManagement for SqliteDatabase {
    async fn fetch_or_create_requester_stats(
        &self,
        requester_id: &str,
    ) -> Result<RequesterStats, RequestGatewayError> {
        let mut conn = self.pool.acquire().await?;
        stats::fetch_or_create_stats(requester_id, &mut conn).await
    }

    async fn record_admission(
        &self,
        requester_id: &str,
        performance_id: &str,
    ) -> Result<RequesterStats, RequestGatewayError> {
        let mut tx = self.pool.begin().await?;
        let stats = stats::record_admission(requester_id, performance_id, &mut tx).await?;
        tx.commit().await?;
        Ok(stats)
    }

    async fn record_successful_request(&self, requester_id: &str) -> Result<RequesterStats, RequestGatewayError> {
        let mut tx = self.pool.begin().await?;
        let stats = stats::record_successful_request(requester_id, &mut tx).await?;
        tx.commit().await?;
        Ok(stats)
    }

    async fn update_tier(&self, requester_id: &str, tier: Tier) -> Result<bool, RequestGatewayError> {
        let mut conn = self.pool.acquire().await?;
        stats::update_tier(requester_id, tier, &mut conn).await
    }

    async fn credit_payee(
        &self,
        performer_id: &str,
        earnings: Cents,
        gross: Cents,
    ) -> Result<(), RequestGatewayError> {
        let mut conn = self.pool.acquire().await?;
        stats::credit_payee(performer_id, earnings, gross, &mut conn).await
    }

    async fn fetch_payee_balance(&self, performer_id: &str) -> Result<Option<PayeeBalance>, RequestGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let balance = stats::fetch_payee_balance(performer_id, &mut conn).await?;
        Ok(balance)
    }
}
