//! Monte-Carlo uncertainties for the all-band fit.
//!
//! Each draw perturbs every good band by `err · N(0, 1)`, reruns the combined
//! fit, and keeps the selected mass and age. The reported uncertainty is the
//! sample standard deviation over the draws. Draws are independent and run in
//! parallel; each one seeds its own RNG from `(seed, star, draw)` so results
//! do not depend on scheduling.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::StarFit;
use crate::fit::estimator::AgeMassEstimator;
use crate::math::sample_std;
use crate::photometry::{PhotometryTable, StarPhotometry};

/// Default number of perturbed realisations per star.
pub const MC_DRAWS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonteCarloConfig {
    pub draws: usize,
    pub seed: u64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            draws: MC_DRAWS,
            seed: 0,
        }
    }
}

/// Standard deviations of mass and age over the draws.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct McSpread {
    pub mass_std: f64,
    pub age_std: f64,
}

pub struct MonteCarlo<'a, 'g> {
    estimator: &'a AgeMassEstimator<'g>,
    config: MonteCarloConfig,
}

impl<'a, 'g> MonteCarlo<'a, 'g> {
    pub fn new(estimator: &'a AgeMassEstimator<'g>, config: MonteCarloConfig) -> Self {
        Self { estimator, config }
    }

    /// Spread for one star, or `None` if its unperturbed combined fit fails.
    pub fn spread(&self, star_index: usize, star: &StarPhotometry) -> Option<McSpread> {
        let (phot, good) = self.estimator.canonical(star);
        self.estimator.combined_cell(&phot, &good, &phot.map(|b| b.mag))?;

        let grid = self.estimator.grid();
        let cells: Vec<(f64, f64)> = (0..self.config.draws)
            .into_par_iter()
            .filter_map(|draw| {
                let mut rng = StdRng::seed_from_u64(draw_seed(self.config.seed, star_index, draw));
                let noise: [f64; 6] = std::array::from_fn(|_| StandardNormal.sample(&mut rng));
                let perturbed: [f64; 6] = std::array::from_fn(|k| phot[k].mag + phot[k].err * noise[k]);
                self.estimator
                    .combined_cell(&phot, &good, &perturbed)
                    .map(|(i, j)| (grid.masses()[i], grid.ages()[j]))
            })
            .collect();

        if cells.len() < self.config.draws {
            debug!(star = star_index, kept = cells.len(), "some draws found no cell");
        }
        let masses: Vec<f64> = cells.iter().map(|c| c.0).collect();
        let ages: Vec<f64> = cells.iter().map(|c| c.1).collect();
        Some(McSpread {
            mass_std: sample_std(&masses),
            age_std: sample_std(&ages),
        })
    }

    /// Attach spreads to `fits` (same order as `table`).
    ///
    /// Stars without a final mass or age keep `None`.
    pub fn apply(&self, table: &PhotometryTable, fits: &mut [StarFit]) {
        let mut done = 0;
        for (i, fit) in fits.iter_mut().enumerate().take(table.n_stars()) {
            if fit.mass.is_nan() && fit.age.is_nan() {
                continue;
            }
            if let Some(s) = self.spread(i, &table.star(i)) {
                fit.mass_std = Some(s.mass_std);
                fit.age_std = Some(s.age_std);
                done += 1;
            }
        }
        info!(stars = done, draws = self.config.draws, seed = self.config.seed, "monte carlo errors");
    }
}

fn draw_seed(seed: u64, star: usize, draw: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    star.hash(&mut hasher);
    draw.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use nalgebra::DMatrix;

    use super::*;
    use crate::domain::Filter;
    use crate::fit::estimator::EstimatorConfig;
    use crate::grid::IsochroneGrid;
    use crate::photometry::BandValue;

    fn grid() -> IsochroneGrid {
        let masses: Vec<f64> = (1..=20).map(|i| 0.05 * i as f64).collect();
        let ages: Vec<f64> = (0..10).map(|j| 10f64.powf(j as f64 / 3.0)).collect();
        let g = DMatrix::from_fn(20, 10, |i, j| 14.0 - 0.4 * i as f64 + 0.15 * j as f64);
        let k = DMatrix::from_fn(20, 10, |i, j| 10.0 - 0.3 * i as f64 + 0.05 * j as f64);
        IsochroneGrid::new(masses, ages, vec![Filter::G, Filter::K], vec![g, k]).unwrap()
    }

    fn star(err: f64) -> StarPhotometry {
        StarPhotometry::new(vec![
            (Filter::G, BandValue { mag: 12.15, err }),
            (Filter::K, BandValue { mag: 8.65, err }),
        ])
    }

    #[test]
    fn zero_error_gives_zero_spread() {
        let grid = grid();
        let est = AgeMassEstimator::new(&grid, EstimatorConfig::default());
        let mc = MonteCarlo::new(&est, MonteCarloConfig::default());
        let s = mc.spread(0, &star(0.0)).unwrap();
        assert_abs_diff_eq!(s.mass_std, 0.0);
        assert_abs_diff_eq!(s.age_std, 0.0);
    }

    #[test]
    fn same_seed_same_spread() {
        let grid = grid();
        let est = AgeMassEstimator::new(&grid, EstimatorConfig::default());
        let config = MonteCarloConfig { draws: 10, seed: 42 };
        let a = MonteCarlo::new(&est, config).spread(3, &star(0.1)).unwrap();
        let b = MonteCarlo::new(&est, config).spread(3, &star(0.1)).unwrap();
        assert_eq!(a, b);
        assert!(a.mass_std.is_finite() && a.mass_std >= 0.0);
    }

    #[test]
    fn star_without_combined_fit_gets_no_spread() {
        let grid = grid();
        let est = AgeMassEstimator::new(&grid, EstimatorConfig::default());
        let mc = MonteCarlo::new(&est, MonteCarloConfig::default());
        assert!(mc.spread(0, &StarPhotometry::new(vec![])).is_none());
    }

    #[test]
    fn apply_fills_only_fittable_stars() {
        use crate::photometry::{CutCounts, FilterMatrix};

        let grid = grid();
        let est = AgeMassEstimator::new(&grid, EstimatorConfig::default());
        let filters = vec![Filter::G, Filter::K];
        let table = PhotometryTable {
            mags: FilterMatrix::new(filters.clone(), DMatrix::from_row_slice(2, 2, &[12.15, 8.65, f64::NAN, f64::NAN]))
                .unwrap(),
            errs: FilterMatrix::new(filters, DMatrix::from_row_slice(2, 2, &[0.05, 0.05, 0.05, 0.05])).unwrap(),
            cuts: CutCounts::default(),
        };
        let mut fits = est.estimate(&table);
        MonteCarlo::new(&est, MonteCarloConfig::default()).apply(&table, &mut fits);
        assert!(fits[0].mass_std.is_some());
        assert!(fits[1].mass_std.is_none());
    }

    #[test]
    fn undetermined_star_gets_no_spread_even_with_a_combined_cell() {
        use crate::photometry::{CutCounts, FilterMatrix};

        // G alone fills no colour channel, though the all-band fit finds a cell.
        let layer = DMatrix::from_fn(20, 10, |i, j| 14.0 - 0.4 * i as f64 + 0.15 * j as f64);
        let masses: Vec<f64> = (1..=20).map(|i| 0.05 * i as f64).collect();
        let ages: Vec<f64> = (0..10).map(|j| 10f64.powf(j as f64 / 3.0)).collect();
        let grid = IsochroneGrid::new(masses, ages, vec![Filter::G], vec![layer]).unwrap();
        let est = AgeMassEstimator::new(&grid, EstimatorConfig::default());

        let table = PhotometryTable {
            mags: FilterMatrix::new(vec![Filter::G], DMatrix::from_element(1, 1, 12.15)).unwrap(),
            errs: FilterMatrix::new(vec![Filter::G], DMatrix::from_element(1, 1, 0.05)).unwrap(),
            cuts: CutCounts::default(),
        };
        let mc = MonteCarlo::new(&est, MonteCarloConfig { draws: 10, seed: 3 });
        assert!(mc.spread(0, &table.star(0)).is_some());

        let mut fits = est.estimate(&table);
        assert!(fits[0].mass.is_nan() && fits[0].age.is_nan());
        mc.apply(&table, &mut fits);
        assert!(fits[0].mass_std.is_none());
        assert!(fits[0].age_std.is_none());
    }
}
