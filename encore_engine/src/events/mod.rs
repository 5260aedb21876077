//! Best-effort notification hooks.
//!
//! The engine announces state changes (admissions, acceptances, vetoes, refunds, tier upgrades) through a simple
//! stateless pub-sub channel. Delivery is fire-and-forget: no flow in the engine depends on a subscriber receiving
//! an event, so a slow or absent notification layer can never affect correctness.

mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
