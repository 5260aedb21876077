use std::fmt::Display;

use encore_common::Cents;
use thiserror::Error;

/// The provider-reported state of a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeState {
    Successful,
    Pending,
    Failed,
}

impl Display for ChargeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChargeState::Successful => write!(f, "successful"),
            ChargeState::Pending => write!(f, "pending"),
            ChargeState::Failed => write!(f, "failed"),
        }
    }
}

/// A charge as reported by the payment capability.
#[derive(Debug, Clone)]
pub struct Charge {
    pub charge_ref: String,
    pub state: ChargeState,
    pub amount: Cents,
    pub currency: String,
}

/// The provider's acknowledgement of a refund.
#[derive(Debug, Clone)]
pub struct RefundReceipt {
    pub refund_id: String,
    pub amount: Cents,
}

#[derive(Debug, Clone, Error)]
pub enum PaymentProviderError {
    #[error("The charge {0} does not exist at the payment provider")]
    ChargeNotFound(String),
    #[error("The provider rejected the refund: {0}")]
    RefundRejected(String),
    #[error("The call to the payment provider timed out")]
    Timeout,
    #[error("Error communicating with the payment provider: {0}")]
    Transport(String),
}

impl PaymentProviderError {
    /// Whether a caller may reasonably retry the same call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentProviderError::Timeout | PaymentProviderError::Transport(_))
    }
}

/// The external payment capability. The engine never charges anyone; it only confirms that charges reported by the
/// client actually happened, and issues refunds against them. Both calls must be safe to repeat for the same
/// `charge_ref` — the engine does not assume the provider dedupes, so it drives idempotency from its own records.
#[allow(async_fn_in_trait)]
pub trait PaymentProvider: Clone {
    /// Fetches the current status and amount of a charge.
    async fn get_charge(&self, charge_ref: &str) -> Result<Charge, PaymentProviderError>;

    /// Refunds the given amount against a charge. Returns the provider's refund id.
    async fn refund(&self, charge_ref: &str, amount: Cents) -> Result<RefundReceipt, PaymentProviderError>;
}
