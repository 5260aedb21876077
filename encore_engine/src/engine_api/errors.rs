use encore_common::Cents;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::InvalidStatusTransition,
    traits::{PaymentProviderError, RequestGatewayError},
    verify::VerificationError,
};

/// The wire-friendly shape of any engine failure. API layers map these onto user-facing messages; the codes are
/// stable and distinguish "payment problem" from "performer isn't taking requests" from "try again".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: &str, message: impl Into<String>) -> Self {
        Self { error_code: error_code.to_string(), message: message.into() }
    }
}

//--------------------------------------   AdmissionError    ---------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum AdmissionError {
    #[error("The requested performance does not exist")]
    PerformanceNotFound,
    #[error("This performer is not currently accepting requests")]
    NotAcceptingRequests,
    #[error("Payment not successful. {0}")]
    PaymentVerificationFailed(String),
    #[error("Payment amount {actual} does not match the request price {expected}")]
    AmountMismatch { expected: Cents, actual: Cents },
    #[error("This payment has already been used")]
    PaymentAlreadyUsed,
    #[error("The payment provider could not be reached: {0}")]
    ProviderUnavailable(PaymentProviderError),
    #[error("Storage error during admission: {0}")]
    Database(RequestGatewayError),
}

impl AdmissionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AdmissionError::PerformanceNotFound => "NOT_FOUND",
            AdmissionError::NotAcceptingRequests => "NOT_ACCEPTING_REQUESTS",
            AdmissionError::PaymentVerificationFailed(_) => "PAYMENT_VERIFICATION_FAILED",
            AdmissionError::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            AdmissionError::PaymentAlreadyUsed => "PAYMENT_ALREADY_USED",
            AdmissionError::ProviderUnavailable(_) => "PAYMENT_PROVIDER_UNAVAILABLE",
            AdmissionError::Database(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller can safely re-invoke `admit` with the same idempotency key.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdmissionError::ProviderUnavailable(_) | AdmissionError::Database(_))
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse::new(self.error_code(), self.to_string())
    }
}

impl From<VerificationError> for AdmissionError {
    fn from(e: VerificationError) -> Self {
        match e {
            VerificationError::NotSuccessful(state) => {
                AdmissionError::PaymentVerificationFailed(format!("Status: {state}"))
            },
            VerificationError::AmountMismatch { expected, actual } => {
                AdmissionError::AmountMismatch { expected, actual }
            },
            VerificationError::Provider(PaymentProviderError::ChargeNotFound(charge_ref)) => {
                AdmissionError::PaymentVerificationFailed(format!("No such charge: {charge_ref}"))
            },
            VerificationError::Provider(e) => AdmissionError::ProviderUnavailable(e),
        }
    }
}

impl From<RequestGatewayError> for AdmissionError {
    fn from(e: RequestGatewayError) -> Self {
        match e {
            RequestGatewayError::PerformanceNotFound(_) => AdmissionError::PerformanceNotFound,
            RequestGatewayError::TransactionRefAlreadyUsed(_) => AdmissionError::PaymentAlreadyUsed,
            e => AdmissionError::Database(e),
        }
    }
}

//--------------------------------------     QueueError      ---------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum QueueError {
    #[error("The requested performance does not exist")]
    PerformanceNotFound,
    #[error("The requested request does not exist")]
    RequestNotFound,
    #[error("Only the performer who owns this performance may do that")]
    Unauthorized,
    #[error("Invalid reorder: {0}")]
    InvalidReorder(String),
    #[error("{0}")]
    InvalidState(InvalidStatusTransition),
    #[error("The queue was modified concurrently too many times; try again")]
    Contention,
    #[error("Storage error during queue mutation: {0}")]
    Database(RequestGatewayError),
}

impl QueueError {
    pub fn error_code(&self) -> &'static str {
        match self {
            QueueError::PerformanceNotFound | QueueError::RequestNotFound => "NOT_FOUND",
            QueueError::Unauthorized => "UNAUTHORIZED",
            QueueError::InvalidReorder(_) => "INVALID_REORDER",
            QueueError::InvalidState(_) => "INVALID_STATE",
            QueueError::Contention => "QUEUE_CONTENTION",
            QueueError::Database(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, QueueError::Contention | QueueError::Database(_))
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse::new(self.error_code(), self.to_string())
    }
}

impl From<RequestGatewayError> for QueueError {
    fn from(e: RequestGatewayError) -> Self {
        match e {
            RequestGatewayError::PerformanceNotFound(_) => QueueError::PerformanceNotFound,
            RequestGatewayError::RequestNotFound(_) => QueueError::RequestNotFound,
            RequestGatewayError::InvalidStatusTransition(t) => QueueError::InvalidState(t),
            e => QueueError::Database(e),
        }
    }
}

//--------------------------------------      VetoError      ---------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum VetoError {
    #[error("The requested request does not exist")]
    RequestNotFound,
    #[error("Only the performer who owns this performance may veto requests")]
    Unauthorized,
    #[error("{0}")]
    InvalidState(InvalidStatusTransition),
    #[error("Storage error during veto: {0}")]
    Database(RequestGatewayError),
}

impl VetoError {
    pub fn error_code(&self) -> &'static str {
        match self {
            VetoError::RequestNotFound => "NOT_FOUND",
            VetoError::Unauthorized => "UNAUTHORIZED",
            VetoError::InvalidState(_) => "INVALID_STATE",
            VetoError::Database(_) => "INTERNAL_ERROR",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse::new(self.error_code(), self.to_string())
    }
}

impl From<RequestGatewayError> for VetoError {
    fn from(e: RequestGatewayError) -> Self {
        match e {
            RequestGatewayError::RequestNotFound(_) => VetoError::RequestNotFound,
            RequestGatewayError::InvalidStatusTransition(t) => VetoError::InvalidState(t),
            e => VetoError::Database(e),
        }
    }
}

impl From<QueueError> for VetoError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::RequestNotFound | QueueError::PerformanceNotFound => VetoError::RequestNotFound,
            QueueError::Unauthorized => VetoError::Unauthorized,
            QueueError::InvalidState(t) => VetoError::InvalidState(t),
            QueueError::InvalidReorder(msg) => {
                VetoError::Database(RequestGatewayError::DatabaseError(msg))
            },
            QueueError::Contention => VetoError::Database(RequestGatewayError::DatabaseError(
                "queue contention exhausted retries".to_string(),
            )),
            QueueError::Database(e) => VetoError::Database(e),
        }
    }
}
