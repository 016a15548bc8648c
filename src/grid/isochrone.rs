//! The dense isochrone grid: magnitudes indexed by (mass, age, filter).

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::domain::{Filter, GaiaRelease};
use crate::error::IsoError;

/// Regularly sampled model magnitudes.
///
/// Each filter owns one `masses.len() × ages.len()` layer. Cells the model
/// cannot provide hold NaN.
///
/// Deserialisation goes through [`IsochroneGrid::new`], so a decoded grid
/// satisfies the same shape checks as a built one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridRepr")]
pub struct IsochroneGrid {
    /// M_sun, strictly increasing.
    masses: Vec<f64>,
    /// Myr, strictly increasing.
    ages: Vec<f64>,
    filters: Vec<Filter>,
    layers: Vec<DMatrix<f64>>,
}

/// Unchecked wire form of [`IsochroneGrid`].
#[derive(Deserialize)]
struct GridRepr {
    masses: Vec<f64>,
    ages: Vec<f64>,
    filters: Vec<Filter>,
    layers: Vec<DMatrix<f64>>,
}

impl TryFrom<GridRepr> for IsochroneGrid {
    type Error = IsoError;

    fn try_from(repr: GridRepr) -> Result<Self, Self::Error> {
        IsochroneGrid::new(repr.masses, repr.ages, repr.filters, repr.layers)
    }
}

impl IsochroneGrid {
    pub fn new(
        masses: Vec<f64>,
        ages: Vec<f64>,
        filters: Vec<Filter>,
        layers: Vec<DMatrix<f64>>,
    ) -> Result<Self, IsoError> {
        if masses.is_empty() || ages.is_empty() {
            return Err(IsoError::Shape("grid axes must not be empty".into()));
        }
        if !strictly_increasing(&masses) || !strictly_increasing(&ages) {
            return Err(IsoError::Shape("grid axes must be strictly increasing".into()));
        }
        if filters.len() != layers.len() {
            return Err(IsoError::Shape(format!(
                "{} filters but {} layers",
                filters.len(),
                layers.len()
            )));
        }
        for (i, f) in filters.iter().enumerate() {
            if filters[..i].contains(f) {
                return Err(IsoError::Shape(format!("duplicate filter {}", f.label())));
            }
        }
        if let Some(bad) = layers
            .iter()
            .find(|l| l.nrows() != masses.len() || l.ncols() != ages.len())
        {
            return Err(IsoError::Shape(format!(
                "layer is {}x{}, axes are {}x{}",
                bad.nrows(),
                bad.ncols(),
                masses.len(),
                ages.len()
            )));
        }

        Ok(Self {
            masses,
            ages,
            filters,
            layers,
        })
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    pub fn ages(&self) -> &[f64] {
        &self.ages
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.masses.len(), self.ages.len(), self.filters.len())
    }

    pub fn layer(&self, filter: Filter) -> Option<&DMatrix<f64>> {
        let idx = self.filters.iter().position(|f| *f == filter)?;
        Some(&self.layers[idx])
    }

    /// Gaia release of the triplet stored in the grid (DR2 if `G2` is present).
    pub fn gaia_release(&self) -> GaiaRelease {
        if self.filters.contains(&Filter::G2) {
            GaiaRelease::Dr2
        } else {
            GaiaRelease::Edr3
        }
    }

    /// Fraction of cells holding a finite magnitude, per filter.
    pub fn coverage(&self) -> Vec<(Filter, f64)> {
        let cells = (self.masses.len() * self.ages.len()) as f64;
        self.filters
            .iter()
            .zip(&self.layers)
            .map(|(f, l)| (*f, l.iter().filter(|v| v.is_finite()).count() as f64 / cells))
            .collect()
    }
}

fn strictly_increasing(v: &[f64]) -> bool {
    v.iter().all(|x| x.is_finite()) && v.windows(2).all(|w| w[1] > w[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_layers() {
        let err = IsochroneGrid::new(
            vec![0.1, 0.5],
            vec![1.0, 10.0, 100.0],
            vec![Filter::G],
            vec![DMatrix::zeros(3, 2)],
        );
        assert!(matches!(err, Err(IsoError::Shape(_))));
    }

    #[test]
    fn rejects_unsorted_axes_and_duplicate_filters() {
        assert!(
            IsochroneGrid::new(vec![0.5, 0.1], vec![1.0], vec![], vec![]).is_err()
        );
        assert!(
            IsochroneGrid::new(
                vec![0.1],
                vec![1.0],
                vec![Filter::G, Filter::G],
                vec![DMatrix::zeros(1, 1), DMatrix::zeros(1, 1)]
            )
            .is_err()
        );
    }

    #[test]
    fn coverage_counts_finite_cells() {
        let layer = DMatrix::from_row_slice(2, 2, &[1.0, f64::NAN, 2.0, 3.0]);
        let grid = IsochroneGrid::new(vec![0.1, 0.2], vec![1.0, 2.0], vec![Filter::K], vec![layer])
            .unwrap();
        assert_eq!(grid.coverage(), vec![(Filter::K, 0.75)]);
        assert_eq!(grid.gaia_release(), GaiaRelease::Edr3);
    }
}
