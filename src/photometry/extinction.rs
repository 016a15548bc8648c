//! Interstellar extinction from E(B-V).
//!
//! `A_f = R · a_f · E(B-V)` with `R = 3.16` and `a_f` the filter's absorption
//! relative to V (`Filter::absorption`).

use tracing::debug;

use crate::domain::Filter;
use crate::error::IsoError;
use crate::photometry::series::{FilterMatrix, ScalarSeries};

/// Total-to-selective absorption ratio.
pub const R_V: f64 = 3.16;

/// Extinction in `filter` for a given E(B-V).
pub fn extinction(ebv: f64, filter: Filter) -> f64 {
    R_V * filter.absorption() * ebv
}

/// Colour excess `E(f1 - f2)` for a given E(B-V).
pub fn color_excess(ebv: f64, f1: Filter, f2: Filter) -> f64 {
    R_V * (f1.absorption() - f2.absorption()) * ebv
}

/// Where the extinction correction comes from.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Extinction {
    #[default]
    None,
    /// E(B-V) per star, turned into magnitudes with the absorption table.
    Ebv(ScalarSeries),
    /// Extinction magnitudes already resolved per `(star, filter)`.
    PerFilter(FilterMatrix),
}

impl Extinction {
    pub(crate) fn check(&self, n_stars: usize) -> Result<(), IsoError> {
        match self {
            Extinction::None => Ok(()),
            Extinction::Ebv(ebv) => ebv.expect_len(n_stars, "E(B-V)"),
            Extinction::PerFilter(m) if m.n_stars() != n_stars => Err(IsoError::Shape(format!(
                "extinction matrix has {} rows for {n_stars} stars",
                m.n_stars()
            ))),
            Extinction::PerFilter(_) => Ok(()),
        }
    }

    /// Magnitudes to subtract from `(star, filter)`.
    ///
    /// An unknown E(B-V) or a filter absent from the matrix contributes 0.
    pub fn magnitudes(&self, star: usize, filter: Filter) -> f64 {
        let a = match self {
            Extinction::None => 0.0,
            Extinction::Ebv(ebv) => extinction(ebv.get(star), filter),
            Extinction::PerFilter(m) => m.get(star, filter),
        };
        if a.is_finite() {
            a
        } else {
            debug!(star, filter = filter.label(), "no extinction value, using 0");
            0.0
        }
    }
}
