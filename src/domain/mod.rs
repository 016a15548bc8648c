//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - closed identifiers (`Model`, `Survey`, `Filter`, `Channel`, `FateCode`)
//! - grid identity (`GridParameters`, `GridRequest`)
//! - fit outputs (`ChannelFit`, `StarFit`)
//! - the model/filter lookup table (`FilterTable`)

pub mod filters;
pub mod types;

pub use filters::*;
pub use types::*;
