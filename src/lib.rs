//! `iso-ages` library crate.
//!
//! Stellar ages and masses from isochrone grids: grid build and cache,
//! photometric normalisation, the four-channel grid-search estimator and
//! Monte-Carlo uncertainties.
//!
//! The binary (`isoage`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the grid and estimator can be driven from other front-ends

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod fit;
pub mod grid;
pub mod io;
pub mod math;
pub mod photometry;
pub mod report;
