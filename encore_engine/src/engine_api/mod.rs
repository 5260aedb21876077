//! The request engine's public service layer.
//!
//! Each API object wraps a backend implementing the database traits and exposes one cohesive slice of the engine:
//!
//! * [`AdmissionApi`] turns verified payments into queued requests,
//! * [`QueueApi`] owns every queue mutation and keeps ordering and positions consistent,
//! * [`VetoApi`] runs the veto-and-refund saga,
//! * [`TierApi`] exposes loyalty stats and tier recomputation.

mod admission_api;
mod errors;
mod queue_api;
mod request_objects;
mod tier_api;
mod veto_api;

pub use admission_api::{AdmissionApi, DEFAULT_GENRE};
pub use errors::{AdmissionError, ErrorResponse, QueueError, VetoError};
pub use queue_api::QueueApi;
pub use request_objects::{AdmissionOutcome, NewRequestSubmission, QueueSnapshot, RefundOutcome, VetoOutcome};
pub use tier_api::TierApi;
pub use veto_api::{VetoApi, DEFAULT_VETO_REASON};
