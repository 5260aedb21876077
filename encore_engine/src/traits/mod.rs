//! Interface contracts of the engine's collaborators.
//!
//! Two kinds of seams are defined here:
//!
//! * Storage backends. [`RequestGatewayDatabase`] is the top-level contract a backend must satisfy to drive the
//!   admission and veto flows. [`QueueManagement`] covers the versioned per-performance queue, and
//!   [`StatsManagement`] covers requester stats, tiers and payee balances. The engine's correctness leans on the
//!   backend providing atomic insert-if-absent semantics for idempotency keys and charge references, and
//!   compare-and-swap semantics for queue writes.
//! * The external payment capability, [`PaymentProvider`], which the engine only ever reads charges from and issues
//!   refunds against.

mod payment_provider;
mod queue_management;
mod request_gateway_database;
mod stats_management;

pub use payment_provider::{Charge, ChargeState, PaymentProvider, PaymentProviderError, RefundReceipt};
pub use queue_management::QueueManagement;
pub use request_gateway_database::{RequestGatewayDatabase, RequestGatewayError};
pub use stats_management::StatsManagement;
