mod engine;
mod error;
mod types;

pub use engine::{round2, run_flat, run_projection, validate_inputs};
pub use error::RoiError;
pub use types::{
    DEFAULT_DISCOUNT_RATE, DEFAULT_EFFICIENCY_DRIFT, DEFAULT_INFLATION_RATE,
    DEFAULT_LIFETIME_YEARS, FlatRoiResult, MAX_LIFETIME_YEARS, PAYBACK_NOT_ACHIEVED,
    PaybackPeriod, ProjectionResult, RoiInputs,
};
