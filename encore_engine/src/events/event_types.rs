use encore_common::Cents;
use serde::{Deserialize, Serialize};

use crate::db_types::{ChargeRecord, Request, RequestId, Tier};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestAdmittedEvent {
    pub request: Request,
    pub charge: ChargeRecord,
    pub queue_position: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestAcceptedEvent {
    pub request: Request,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestVetoedEvent {
    pub request: Request,
    pub reason: String,
}

/// Published when a refund reaches a terminal outcome, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundProcessedEvent {
    pub request_id: RequestId,
    pub requester_id: String,
    pub amount: Cents,
    pub succeeded: bool,
}

/// Published only on tier changes; recomputations that land on the same tier are silent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierChangedEvent {
    pub requester_id: String,
    pub old_tier: Tier,
    pub new_tier: Tier,
}

impl TierChangedEvent {
    pub fn is_upgrade(&self) -> bool {
        self.new_tier > self.old_tier
    }
}
