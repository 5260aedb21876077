use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use encore_common::Cents;
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------      RequestId      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct RequestId(pub String);

impl FromStr for RequestId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------    RequestStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum RequestStatus {
    /// The request has been admitted and is waiting in the queue.
    Pending,
    /// The performer has accepted the request. It is no longer in the queue.
    Accepted,
    /// The performer has vetoed the request. A refund flow has been triggered.
    Vetoed,
    /// An accepted request that has been played.
    Completed,
    /// The request expired before the performer acted on it.
    Expired,
}

impl RequestStatus {
    /// A request only holds a queue position while it is pending.
    pub fn holds_queue_position(&self) -> bool {
        matches!(self, RequestStatus::Pending)
    }

    /// Validates a status transition. The allowed transitions are:
    ///
    /// | From \ To | Pending | Accepted | Vetoed | Completed | Expired |
    /// |-----------|---------|----------|--------|-----------|---------|
    /// | Pending   | Err     | Ok       | Ok     | Err       | Ok      |
    /// | Accepted  | Err     | Err      | Err    | Ok        | Err     |
    /// | Vetoed    | Err     | Err      | Err    | Err       | Err     |
    /// | Completed | Err     | Err      | Err    | Err       | Err     |
    /// | Expired   | Err     | Err      | Err    | Err       | Err     |
    pub fn validate_transition(self, to: RequestStatus) -> Result<(), InvalidStatusTransition> {
        use RequestStatus::*;
        match (self, to) {
            (Pending, Accepted | Vetoed | Expired) => Ok(()),
            (Accepted, Completed) => Ok(()),
            (from, to) => Err(InvalidStatusTransition { from, to }),
        }
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("A request cannot move from {from} to {to}")]
pub struct InvalidStatusTransition {
    pub from: RequestStatus,
    pub to: RequestStatus,
}

impl Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "Pending"),
            RequestStatus::Accepted => write!(f, "Accepted"),
            RequestStatus::Vetoed => write!(f, "Vetoed"),
            RequestStatus::Completed => write!(f, "Completed"),
            RequestStatus::Expired => write!(f, "Expired"),
        }
    }
}

impl FromStr for RequestStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Accepted" => Ok(Self::Accepted),
            "Vetoed" => Ok(Self::Vetoed),
            "Completed" => Ok(Self::Completed),
            "Expired" => Ok(Self::Expired),
            s => Err(ConversionError(format!("Invalid request status: {s}"))),
        }
    }
}

impl From<String> for RequestStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid request status: {value}. But this conversion cannot fail. Defaulting to Pending");
            RequestStatus::Pending
        })
    }
}

//--------------------------------------    RequestClass     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum RequestClass {
    /// A regular paid request.
    Standard,
    /// A paid priority slot.
    Spotlight,
    /// A crowd-funded single request.
    Group,
}

impl RequestClass {
    /// Class multiplier used by the queue priority engine.
    pub fn multiplier(&self) -> i64 {
        match self {
            RequestClass::Spotlight => 3,
            RequestClass::Group => 2,
            RequestClass::Standard => 1,
        }
    }
}

impl Display for RequestClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestClass::Standard => write!(f, "Standard"),
            RequestClass::Spotlight => write!(f, "Spotlight"),
            RequestClass::Group => write!(f, "Group"),
        }
    }
}

impl FromStr for RequestClass {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Standard" => Ok(Self::Standard),
            "Spotlight" => Ok(Self::Spotlight),
            "Group" => Ok(Self::Group),
            s => Err(ConversionError(format!("Invalid request class: {s}"))),
        }
    }
}

//--------------------------------------        Tier         ---------------------------------------------------------
/// Loyalty rank derived from cumulative requester activity. The ordering of the variants matters: it is used to
/// detect upgrades vs downgrades.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Type, Serialize, Deserialize)]
pub enum Tier {
    #[default]
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl Tier {
    /// Tier weight used by the queue priority engine.
    pub fn weight(&self) -> i64 {
        match self {
            Tier::Platinum => 4,
            Tier::Gold => 3,
            Tier::Silver => 2,
            Tier::Bronze => 1,
        }
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Bronze => write!(f, "Bronze"),
            Tier::Silver => write!(f, "Silver"),
            Tier::Gold => write!(f, "Gold"),
            Tier::Platinum => write!(f, "Platinum"),
        }
    }
}

impl FromStr for Tier {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Bronze" => Ok(Self::Bronze),
            "Silver" => Ok(Self::Silver),
            "Gold" => Ok(Self::Gold),
            "Platinum" => Ok(Self::Platinum),
            s => Err(ConversionError(format!("Invalid tier: {s}"))),
        }
    }
}

//--------------------------------------    ChargeStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ChargeStatus {
    /// The charge has been verified and consumed by a request.
    Completed,
    /// The charge has been refunded in full.
    Refunded,
}

impl Display for ChargeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChargeStatus::Completed => write!(f, "Completed"),
            ChargeStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

impl FromStr for ChargeStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Completed" => Ok(Self::Completed),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid charge status: {s}"))),
        }
    }
}

//--------------------------------------      Request        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Request {
    pub id: i64,
    pub request_id: RequestId,
    pub performance_id: String,
    pub requester_id: String,
    pub performer_id: String,
    pub song_title: String,
    pub artist_name: String,
    pub genre: String,
    pub request_class: RequestClass,
    /// The amount actually charged. Immutable after admission.
    pub price: Cents,
    pub status: RequestStatus,
    /// 1-based, dense, unique within a performance's pending set. `None` unless the request is pending.
    pub queue_position: Option<i64>,
    pub dedication: Option<String>,
    /// The external charge reference consumed by this request.
    pub transaction_ref: String,
    pub veto_reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     NewRequest      ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub request_id: RequestId,
    pub performance_id: String,
    pub requester_id: String,
    pub performer_id: String,
    pub song_title: String,
    pub artist_name: String,
    pub genre: String,
    pub request_class: RequestClass,
    pub price: Cents,
    pub dedication: Option<String>,
    pub transaction_ref: String,
}

impl NewRequest {
    pub fn with_dedication(mut self, dedication: String) -> Self {
        self.dedication = Some(dedication);
        self
    }
}

//--------------------------------------    ChargeRecord     ---------------------------------------------------------
/// A financial transaction tied 1:1 to the charge reference from the payment capability.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ChargeRecord {
    pub id: i64,
    /// External charge id. Natural key; consumed by at most one request, ever.
    pub transaction_ref: String,
    pub idempotency_key: String,
    pub request_id: RequestId,
    pub performance_id: String,
    pub requester_id: String,
    pub performer_id: String,
    pub gross_amount: Cents,
    pub platform_fee: Cents,
    pub payee_earnings: Cents,
    pub status: ChargeStatus,
    /// The provider's refund id, once a refund has been processed.
    pub refund_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub refunded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewChargeRecord {
    pub transaction_ref: String,
    pub idempotency_key: String,
    pub request_id: RequestId,
    pub performance_id: String,
    pub requester_id: String,
    pub performer_id: String,
    pub gross_amount: Cents,
    pub platform_fee: Cents,
    pub payee_earnings: Cents,
}

//--------------------------------------  PerformanceStatus  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PerformanceStatus {
    Active,
    Ended,
}

impl Display for PerformanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PerformanceStatus::Active => write!(f, "Active"),
            PerformanceStatus::Ended => write!(f, "Ended"),
        }
    }
}

impl FromStr for PerformanceStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Ended" => Ok(Self::Ended),
            s => Err(ConversionError(format!("Invalid performance status: {s}"))),
        }
    }
}

//--------------------------------------    Performance      ---------------------------------------------------------
/// A single performer's live set accepting requests.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Performance {
    pub id: i64,
    pub performance_id: String,
    pub performer_id: String,
    pub status: PerformanceStatus,
    pub is_accepting_requests: bool,
    /// Price for a request during this performance.
    pub base_price: Cents,
    /// Price for the current set, when one is in progress. Takes precedence over `base_price`.
    pub set_price: Option<Cents>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Performance {
    pub fn accepts_requests(&self) -> bool {
        self.status == PerformanceStatus::Active && self.is_accepting_requests
    }

    /// Resolves the fixed price point for a new request. The set-level price is authoritative when present.
    pub fn expected_price(&self) -> Cents {
        self.set_price.unwrap_or(self.base_price)
    }
}

#[derive(Debug, Clone)]
pub struct NewPerformance {
    pub performance_id: String,
    pub performer_id: String,
    pub base_price: Cents,
    pub set_price: Option<Cents>,
}

impl NewPerformance {
    pub fn new<S: Into<String>>(performance_id: S, performer_id: S, base_price: Cents) -> Self {
        Self {
            performance_id: performance_id.into(),
            performer_id: performer_id.into(),
            base_price,
            set_price: None,
        }
    }

    pub fn with_set_price(mut self, price: Cents) -> Self {
        self.set_price = Some(price);
        self
    }
}

//--------------------------------------    QueueRecord      ---------------------------------------------------------
/// The ordered view of all pending requests for one performance. The sequence is the source of truth for ordering;
/// the `queue_position` fields on the requests are a denormalized projection kept in sync by the mutation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRecord {
    pub performance_id: String,
    pub ordered_request_ids: Vec<RequestId>,
    /// Optimistic-concurrency token. Every queue write must name the version it read.
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------   RequesterStats    ---------------------------------------------------------
/// Cumulative requester activity. The tier is a pure function of the counters and is never set directly.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RequesterStats {
    pub requester_id: String,
    pub total_requests: i64,
    pub successful_requests: i64,
    pub performances_attended: i64,
    pub upvotes_received: i64,
    pub tier: Tier,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    PayeeBalance     ---------------------------------------------------------
/// Running earnings totals for a performer.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PayeeBalance {
    pub performer_id: String,
    pub available_balance: Cents,
    pub total_earnings: Cents,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    FailedRefund     ---------------------------------------------------------
pub const NEEDS_MANUAL_REVIEW: &str = "NEEDS_MANUAL_REVIEW";

/// Durable record of a refund that exhausted its retry budget. Resolved out-of-band.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FailedRefund {
    pub id: i64,
    pub request_id: RequestId,
    pub attempts: i64,
    pub last_error: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pending_transitions() {
        use RequestStatus::*;
        assert!(Pending.validate_transition(Accepted).is_ok());
        assert!(Pending.validate_transition(Vetoed).is_ok());
        assert!(Pending.validate_transition(Expired).is_ok());
        assert!(Pending.validate_transition(Completed).is_err());
        assert!(Pending.validate_transition(Pending).is_err());
    }

    #[test]
    fn terminal_states_reject_all_transitions() {
        use RequestStatus::*;
        for from in [Vetoed, Completed, Expired] {
            for to in [Pending, Accepted, Vetoed, Completed, Expired] {
                assert_eq!(from.validate_transition(to), Err(InvalidStatusTransition { from, to }));
            }
        }
        // Accepted can only complete
        assert!(Accepted.validate_transition(Completed).is_ok());
        assert!(Accepted.validate_transition(Pending).is_err());
        assert!(Accepted.validate_transition(Vetoed).is_err());
    }

    #[test]
    fn tier_ordering_tracks_rank() {
        assert!(Tier::Bronze < Tier::Silver);
        assert!(Tier::Silver < Tier::Gold);
        assert!(Tier::Gold < Tier::Platinum);
        assert_eq!(Tier::default(), Tier::Bronze);
    }

    #[test]
    fn status_round_trips_through_strings() {
        for s in ["Pending", "Accepted", "Vetoed", "Completed", "Expired"] {
            let status: RequestStatus = s.parse().unwrap();
            assert_eq!(status.to_string(), s);
        }
        assert!("PENDING".parse::<RequestStatus>().is_err());
    }
}
