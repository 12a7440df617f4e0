pub mod error;
pub mod greeks;
pub mod models;
pub mod types;
pub mod validation;

#[cfg(feature = "strategies")]
pub mod strategies;

#[cfg(feature = "analysis")]
pub mod analysis;

pub use error::PricingError;
pub use types::*;

/// Standard result type for all pricing operations.
pub type PricingResult<T> = Result<T, PricingError>;
