//! Encore Request Engine
//!
//! The Encore request engine is the core of a live-event song-request platform: audience members pay for a song
//! request during a performance, and the performer works through a priority-ordered queue of admitted requests.
//! This library contains the core logic for request admission and queue ordering. It is provider-agnostic.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). You should never need to access the database directly.
//!    Instead, use the public API provided by the engine. The exception is the data types used in the database.
//!    These are defined in the [`db_types`] module and are public.
//! 2. The engine public API ([`mod@engine_api`]). This provides the public-facing functionality of the request
//!    engine: admitting paid requests, mutating queues, vetoing with refunds, and loyalty tiers. Specific backends
//!    need to implement the traits in the [`traits`] module in order to drive these flows.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted when certain
//! actions occur within the engine. For example, when a request is admitted, a `RequestAdmittedEvent` is emitted.
//! A simple actor framework is used so that you can easily hook into these events and perform custom actions.

pub mod db_types;
pub mod events;
pub mod helpers;
pub mod priority;
pub mod retry;
pub mod tier;
pub mod traits;
pub mod verify;

mod engine_api;
#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use db_types::RequestId;
pub use engine_api::{
    AdmissionApi,
    AdmissionError,
    AdmissionOutcome,
    ErrorResponse,
    NewRequestSubmission,
    QueueApi,
    QueueError,
    QueueSnapshot,
    RefundOutcome,
    TierApi,
    VetoApi,
    VetoError,
    VetoOutcome,
    DEFAULT_GENRE,
    DEFAULT_VETO_REASON,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
