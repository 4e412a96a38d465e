pub mod calibration;
pub mod error;
pub mod exogenous;
pub mod pricing;
pub mod types;
pub mod vfi;

#[cfg(feature = "tauchen")]
pub mod model;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use error::SovereignDefaultError;
pub use types::*;

/// Standard result type for all sovereign-default operations
pub type SovereignDefaultResult<T> = Result<T, SovereignDefaultError>;
