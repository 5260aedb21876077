use encore_common::Cents;

use crate::{
    db_types::{PayeeBalance, RequesterStats, Tier},
    traits::RequestGatewayError,
};

/// Requester activity stats, loyalty tiers, and payee balances.
#[allow(async_fn_in_trait)]
pub trait StatsManagement: Clone {
    /// Fetches the stats row for a requester, creating a zeroed Bronze row if none exists yet.
    async fn fetch_or_create_requester_stats(
        &self,
        requester_id: &str,
    ) -> Result<RequesterStats, RequestGatewayError>;

    /// Records an admitted request: bumps `total_requests`, and `performances_attended` the first time this
    /// requester appears at this performance.
    async fn record_admission(
        &self,
        requester_id: &str,
        performance_id: &str,
    ) -> Result<RequesterStats, RequestGatewayError>;

    /// Records an accepted request: bumps `successful_requests`.
    async fn record_successful_request(&self, requester_id: &str) -> Result<RequesterStats, RequestGatewayError>;

    /// Stores a recomputed tier. Returns `false` when the stored tier already matches (no-op; downstream
    /// notification is skipped).
    async fn update_tier(&self, requester_id: &str, tier: Tier) -> Result<bool, RequestGatewayError>;

    /// Credits a performer for an admitted request: the payee share goes to the available balance, the gross amount
    /// to lifetime earnings.
    async fn credit_payee(
        &self,
        performer_id: &str,
        earnings: Cents,
        gross: Cents,
    ) -> Result<(), RequestGatewayError>;

    async fn fetch_payee_balance(&self, performer_id: &str) -> Result<Option<PayeeBalance>, RequestGatewayError>;
}
