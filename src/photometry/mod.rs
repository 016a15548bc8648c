//! Photometric normalisation: absolute magnitudes, quality cuts, extinction.

pub mod extinction;
pub mod normalize;
pub mod series;

pub use extinction::*;
pub use normalize::*;
pub use series::*;
