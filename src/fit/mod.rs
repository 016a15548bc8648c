//! Age/mass estimation against an isochrone grid.
//!
//! Responsibilities:
//!
//! - per-channel nearest-cell matching with the acceptance policy and fate codes
//! - the all-band combined fit
//! - Monte-Carlo uncertainties on the combined fit (parallel draws)

pub mod estimator;
pub mod monte_carlo;

pub use estimator::*;
pub use monte_carlo::*;
