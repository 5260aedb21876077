mod rands;

pub mod op;

pub use rands::{Cents, CentsConversionError, RAND_CURRENCY_CODE, RAND_CURRENCY_CODE_LOWER};
