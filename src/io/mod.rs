//! Input/output helpers.
//!
//! - catalog CSV ingest (`ingest`)
//! - result exports (CSV/JSON) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
