use encore_common::Cents;
use serde::{Deserialize, Serialize};

use crate::db_types::{ChargeRecord, Request, RequestClass, RequestId};

/// Everything the admission service needs to admit one paid request. The price is never part of the submission; it
/// is resolved from the performance's fixed price point and checked against the charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRequestSubmission {
    pub requester_id: String,
    pub performance_id: String,
    pub song_title: String,
    pub artist_name: String,
    pub genre: Option<String>,
    pub request_class: RequestClass,
    pub dedication: Option<String>,
    /// The external charge reference reported by the client after paying.
    pub charge_ref: String,
    /// Caller-supplied token marking retries of the same logical submission.
    pub idempotency_key: String,
}

impl NewRequestSubmission {
    pub fn new<S: Into<String>>(
        requester_id: S,
        performance_id: S,
        song_title: S,
        artist_name: S,
        charge_ref: S,
        idempotency_key: S,
    ) -> Self {
        Self {
            requester_id: requester_id.into(),
            performance_id: performance_id.into(),
            song_title: song_title.into(),
            artist_name: artist_name.into(),
            genre: None,
            request_class: RequestClass::Standard,
            dedication: None,
            charge_ref: charge_ref.into(),
            idempotency_key: idempotency_key.into(),
        }
    }

    pub fn with_class(mut self, class: RequestClass) -> Self {
        self.request_class = class;
        self
    }

    pub fn with_genre<S: Into<String>>(mut self, genre: S) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_dedication<S: Into<String>>(mut self, dedication: S) -> Self {
        self.dedication = Some(dedication.into());
        self
    }
}

/// The result of a successful admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionOutcome {
    pub request: Request,
    pub charge: ChargeRecord,
    /// True when this call was a retry and the prior result was returned instead of creating anything new.
    pub deduplicated: bool,
}

/// The ordered queue for one performance, with requests in play order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub performance_id: String,
    pub requests: Vec<Request>,
    pub version: i64,
}

impl QueueSnapshot {
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn position_of(&self, request_id: &RequestId) -> Option<i64> {
        self.requests.iter().position(|r| &r.request_id == request_id).map(|i| i as i64 + 1)
    }
}

/// Terminal outcome of the refund sub-flow of a veto.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RefundOutcome {
    /// The provider accepted the refund and the charge record has been flipped to refunded.
    Refunded { charge: ChargeRecord },
    /// The charge was already refunded by an earlier veto call. Nothing was done.
    AlreadyRefunded,
    /// All refund attempts failed. A `FailedRefund` record has been written for manual resolution; the veto itself
    /// stands.
    ManualReviewRequired { attempts: u32, last_error: String },
}

impl RefundOutcome {
    pub fn amount(&self) -> Option<Cents> {
        match self {
            RefundOutcome::Refunded { charge } => Some(charge.gross_amount),
            _ => None,
        }
    }
}

/// The result of a veto. The veto is never rolled back on refund failure; `refund` reports how the money side
/// concluded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VetoOutcome {
    pub request: Request,
    pub refund: RefundOutcome,
}
