//! Helpers for tests: database provisioning and a scriptable payment capability.

pub mod payments;
pub mod prepare_env;

pub use payments::TestPaymentProvider;
pub use prepare_env::{prepare_test_env, random_db_path};
