//! A scriptable in-memory payment capability for tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use encore_common::Cents;

use crate::traits::{Charge, ChargeState, PaymentProvider, PaymentProviderError, RefundReceipt};

#[derive(Default)]
struct Inner {
    charges: HashMap<String, Charge>,
    /// How many refund calls should fail before refunds start succeeding. `u32::MAX` fails them all.
    refund_failures: u32,
    refund_calls: u32,
    refunded: Vec<(String, Cents)>,
}

/// An in-memory [`PaymentProvider`] whose charges and refund behaviour are scripted by the test.
///
/// Clones share state, so the provider handed to an API object can be interrogated afterwards.
#[derive(Clone, Default)]
pub struct TestPaymentProvider {
    inner: Arc<Mutex<Inner>>,
}

impl TestPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a successful charge for the given amount in ZAR.
    pub fn add_successful_charge(&self, charge_ref: &str, amount: Cents) {
        self.add_charge(charge_ref, ChargeState::Successful, amount);
    }

    pub fn add_charge(&self, charge_ref: &str, state: ChargeState, amount: Cents) {
        let charge =
            Charge { charge_ref: charge_ref.to_string(), state, amount, currency: "ZAR".to_string() };
        self.inner.lock().unwrap().charges.insert(charge_ref.to_string(), charge);
    }

    /// The next `count` refund calls will fail with a retryable transport error.
    pub fn fail_next_refunds(&self, count: u32) {
        self.inner.lock().unwrap().refund_failures = count;
    }

    /// All refund calls fail until further notice.
    pub fn fail_all_refunds(&self) {
        self.fail_next_refunds(u32::MAX);
    }

    pub fn refund_calls(&self) -> u32 {
        self.inner.lock().unwrap().refund_calls
    }

    /// The `(charge_ref, amount)` pairs of refunds that succeeded, in order.
    pub fn refunded(&self) -> Vec<(String, Cents)> {
        self.inner.lock().unwrap().refunded.clone()
    }
}

impl PaymentProvider for TestPaymentProvider {
    async fn get_charge(&self, charge_ref: &str) -> Result<Charge, PaymentProviderError> {
        let inner = self.inner.lock().unwrap();
        inner
            .charges
            .get(charge_ref)
            .cloned()
            .ok_or_else(|| PaymentProviderError::ChargeNotFound(charge_ref.to_string()))
    }

    async fn refund(&self, charge_ref: &str, amount: Cents) -> Result<RefundReceipt, PaymentProviderError> {
        let mut inner = self.inner.lock().unwrap();
        inner.refund_calls += 1;
        if !inner.charges.contains_key(charge_ref) {
            return Err(PaymentProviderError::ChargeNotFound(charge_ref.to_string()));
        }
        if inner.refund_failures > 0 {
            inner.refund_failures = inner.refund_failures.saturating_sub(1);
            return Err(PaymentProviderError::Transport("scripted refund failure".to_string()));
        }
        inner.refunded.push((charge_ref.to_string(), amount));
        let refund_id = format!("re_{}", inner.refund_calls);
        Ok(RefundReceipt { refund_id, amount })
    }
}
