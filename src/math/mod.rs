//! Numerical utilities: axis generation, NaN-aware interpolation, reductions.

pub mod axis;
pub mod interp;
pub mod stats;

pub use axis::*;
pub use interp::*;
pub use stats::*;
