//! Payment verification.
//!
//! Confirms that an externally reported charge actually succeeded and matches the expected amount before a request
//! is admitted. Purely a read-through check: nothing is mutated, and verifying the same charge twice is safe.

use std::{future::Future, time::Duration};

use encore_common::Cents;
use log::*;
use thiserror::Error;

use crate::traits::{Charge, ChargeState, PaymentProvider, PaymentProviderError};

/// Upper bound on any single call to the payment capability. Calls that exceed this surface as a retryable
/// [`PaymentProviderError::Timeout`], never as a hang.
pub const PAYMENT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Absolute tolerance, in cents, when comparing the provider-reported amount against the expected price. Covers
/// provider-side rounding; it is not a percentage.
pub const AMOUNT_TOLERANCE_CENTS: i64 = 100;

/// Runs a provider call under [`PAYMENT_CALL_TIMEOUT`].
pub(crate) async fn provider_call<T, F>(fut: F) -> Result<T, PaymentProviderError>
where F: Future<Output = Result<T, PaymentProviderError>> {
    match tokio::time::timeout(PAYMENT_CALL_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(PaymentProviderError::Timeout),
    }
}

#[derive(Debug, Clone, Error)]
pub enum VerificationError {
    #[error("Payment not successful. Status: {0}")]
    NotSuccessful(ChargeState),
    #[error("Payment amount {actual} does not match the expected price {expected}")]
    AmountMismatch { expected: Cents, actual: Cents },
    #[error(transparent)]
    Provider(#[from] PaymentProviderError),
}

/// Read-through verification of charges against the payment capability.
#[derive(Debug, Clone)]
pub struct PaymentVerifier<P> {
    provider: P,
    tolerance: Cents,
}

impl<P: PaymentProvider> PaymentVerifier<P> {
    pub fn new(provider: P) -> Self {
        Self { provider, tolerance: Cents::from(AMOUNT_TOLERANCE_CENTS) }
    }

    pub fn with_tolerance(mut self, tolerance: Cents) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Succeeds only if the provider reports the charge as successful and the amount is within tolerance of
    /// `expected`.
    pub async fn verify(&self, charge_ref: &str, expected: Cents) -> Result<Charge, VerificationError> {
        let charge = provider_call(self.provider.get_charge(charge_ref)).await?;
        if charge.state != ChargeState::Successful {
            debug!("🔍️ Charge [{charge_ref}] is not successful: {}", charge.state);
            return Err(VerificationError::NotSuccessful(charge.state));
        }
        if charge.amount.abs_diff(expected) > self.tolerance {
            debug!("🔍️ Charge [{charge_ref}] amount {} is outside tolerance of expected {expected}", charge.amount);
            return Err(VerificationError::AmountMismatch { expected, actual: charge.amount });
        }
        trace!("🔍️ Charge [{charge_ref}] verified for {expected}");
        Ok(charge)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Clone)]
    struct OneCharge(Charge);

    impl PaymentProvider for OneCharge {
        async fn get_charge(&self, charge_ref: &str) -> Result<Charge, PaymentProviderError> {
            if charge_ref == self.0.charge_ref {
                Ok(self.0.clone())
            } else {
                Err(PaymentProviderError::ChargeNotFound(charge_ref.to_string()))
            }
        }

        async fn refund(&self, _charge_ref: &str, _amount: Cents) -> Result<crate::traits::RefundReceipt, PaymentProviderError> {
            unimplemented!("not used in this test")
        }
    }

    fn charge(state: ChargeState, amount: i64) -> Charge {
        Charge { charge_ref: "ch_1".to_string(), state, amount: Cents::from(amount), currency: "ZAR".to_string() }
    }

    #[tokio::test]
    async fn successful_charge_within_tolerance_verifies() {
        let verifier = PaymentVerifier::new(OneCharge(charge(ChargeState::Successful, 5050)));
        let verified = verifier.verify("ch_1", Cents::from(5000)).await.unwrap();
        assert_eq!(verified.amount, Cents::from(5050));
    }

    #[tokio::test]
    async fn amounts_outside_tolerance_are_rejected() {
        let verifier = PaymentVerifier::new(OneCharge(charge(ChargeState::Successful, 5101)));
        let err = verifier.verify("ch_1", Cents::from(5000)).await.unwrap_err();
        assert!(matches!(err, VerificationError::AmountMismatch { .. }));
    }

    #[tokio::test]
    async fn non_successful_charges_are_rejected() {
        let verifier = PaymentVerifier::new(OneCharge(charge(ChargeState::Pending, 5000)));
        let err = verifier.verify("ch_1", Cents::from(5000)).await.unwrap_err();
        assert!(matches!(err, VerificationError::NotSuccessful(ChargeState::Pending)));
    }

    #[tokio::test]
    async fn unknown_charges_surface_the_provider_error() {
        let verifier = PaymentVerifier::new(OneCharge(charge(ChargeState::Successful, 5000)));
        let err = verifier.verify("ch_other", Cents::from(5000)).await.unwrap_err();
        assert!(matches!(err, VerificationError::Provider(PaymentProviderError::ChargeNotFound(_))));
    }
}
