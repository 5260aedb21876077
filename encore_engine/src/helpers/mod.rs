//! Support functions shared by the engine APIs.

mod money_split;
mod request_ids;

pub use money_split::{split_payment, PaymentSplit, PLATFORM_COMMISSION_PERCENT};
pub use request_ids::new_request_id;
