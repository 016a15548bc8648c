//! Grid-search age/mass estimation.
//!
//! For every star the estimator turns each photometrically good canonical band
//! into a standardised residual field over the grid,
//!
//! ```text
//! σ = (10^(-0.4·(grid - star)) - 1) / (10^(0.4·err) - 10^(-0.4·err))
//! ```
//!
//! and then, per colour channel, takes the cell minimising `σ_a² + σ_b²`.
//! A channel is accepted if that minimum is within `SIGMA_THRESHOLD`, or if
//! the star's partner magnitude lies inside the colour span the isochrones
//! reach at the star's own magnitude.

use nalgebra::DMatrix;
use tracing::{debug, info};

use crate::domain::{Channel, ChannelFit, FateCode, Filter, StarFit, canonical_bands};
use crate::grid::IsochroneGrid;
use crate::math::{closest_in_column, nan_argmin, nan_mean, nan_min_max};
use crate::photometry::{BandValue, MAX_PHOT_ERR, PhotometryTable, StarPhotometry, is_phot_good};

/// Largest accepted channel distance (1.5σ combined).
pub const SIGMA_THRESHOLD: f64 = 2.25;
/// Magnitude window for collecting theoretical colours along an isochrone.
pub const COLOR_TOLERANCE: f64 = 0.1;
/// Errors are floored here so a zero error still yields finite residuals.
pub const MIN_PHOT_ERR: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorConfig {
    pub max_phot_err: f64,
    /// Accept stars above the colour span at the youngest grid age.
    pub border_age: bool,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            max_phot_err: MAX_PHOT_ERR,
            border_age: false,
        }
    }
}

/// Symmetrised flux-ratio error of a magnitude error.
pub fn odds_error(err: f64) -> f64 {
    let err = err.max(MIN_PHOT_ERR);
    10f64.powf(0.4 * err) - 10f64.powf(-0.4 * err)
}

/// Residual field of one band: `(10^(-0.4·(grid - mag)) - 1) / e`.
pub fn residual_field(layer: &DMatrix<f64>, mag: f64, e: f64) -> DMatrix<f64> {
    layer.map(|g| (10f64.powf(-0.4 * (g - mag)) - 1.0) / e)
}

/// NaN-safe mean mass and age over the fitted channels.
pub fn aggregate(channels: &[ChannelFit]) -> (f64, f64) {
    let ok = || channels.iter().filter(|c| c.fate == FateCode::FitOk);
    (nan_mean(ok().map(|c| c.mass)), nan_mean(ok().map(|c| c.age)))
}

/// Matches stars against one grid.
#[derive(Debug, Clone)]
pub struct AgeMassEstimator<'g> {
    grid: &'g IsochroneGrid,
    config: EstimatorConfig,
    bands: [Filter; 6],
    layers: [Option<&'g DMatrix<f64>>; 6],
}

impl<'g> AgeMassEstimator<'g> {
    pub fn new(grid: &'g IsochroneGrid, config: EstimatorConfig) -> Self {
        let bands = canonical_bands(grid.gaia_release());
        let layers = bands.map(|f| grid.layer(f));
        Self {
            grid,
            config,
            bands,
            layers,
        }
    }

    pub fn grid(&self) -> &'g IsochroneGrid {
        self.grid
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Canonical bands in slot order `J, H, K, G, Gbp, Grp`.
    pub fn bands(&self) -> [Filter; 6] {
        self.bands
    }

    /// Fit every star of `table`, in table order.
    pub fn estimate(&self, table: &PhotometryTable) -> Vec<StarFit> {
        let fits: Vec<StarFit> = (0..table.n_stars())
            .map(|i| self.fit_star(&table.star(i)))
            .collect();

        for channel in Channel::ALL {
            let n = fits
                .iter()
                .filter(|f| f.channel(channel).fate == FateCode::FitOk)
                .count();
            info!(channel = channel.label(), fitted = n, stars = fits.len(), "channel results");
        }
        fits
    }

    /// The star's canonical bands and which of them pass the quality test.
    pub(crate) fn canonical(&self, star: &StarPhotometry) -> ([BandValue; 6], [bool; 6]) {
        let phot = star.select(self.bands);
        let good = phot.map(|b| is_phot_good(b.mag, b.err, self.config.max_phot_err));
        (phot, good)
    }

    /// Four-channel fit of one star.
    pub fn fit_star(&self, star: &StarPhotometry) -> StarFit {
        let (phot, good) = self.canonical(star);
        if !good.iter().any(|g| *g) {
            return StarFit::undetermined();
        }
        let any_channel = Channel::ALL.iter().any(|c| {
            let (a, b) = c.slots();
            (phot[a].mag + phot[b].mag).is_finite()
        });
        if !any_channel {
            return StarFit::undetermined();
        }

        let sigma = self.residuals(&phot, &good, &phot.map(|b| b.mag));
        let channels = Channel::ALL.map(|c| self.fit_channel(c, &phot, &good, &sigma));
        let (mass, age) = aggregate(&channels);

        StarFit {
            channels,
            mass,
            age,
            mass_std: None,
            age_std: None,
        }
    }

    /// Residual fields for good bands that the grid carries.
    ///
    /// `mags` are the magnitudes to compare (possibly perturbed); errors and
    /// the good-band mask always come from the star's own photometry.
    pub(crate) fn residuals(
        &self,
        phot: &[BandValue; 6],
        good: &[bool; 6],
        mags: &[f64; 6],
    ) -> [Option<DMatrix<f64>>; 6] {
        std::array::from_fn(|k| {
            let layer = self.layers[k]?;
            good[k].then(|| residual_field(layer, mags[k], odds_error(phot[k].err)))
        })
    }

    fn fit_channel(
        &self,
        channel: Channel,
        phot: &[BandValue; 6],
        good: &[bool; 6],
        sigma: &[Option<DMatrix<f64>>; 6],
    ) -> ChannelFit {
        let (a, b) = channel.slots();
        let star_mag = phot[a].mag;
        let star_partner = phot[b].mag;
        if !star_mag.is_finite() || !(good[a] && good[b]) {
            return ChannelFit::unfit();
        }
        let (Some(mag_layer), Some(partner_layer), Some(sa), Some(sb)) =
            (self.layers[a], self.layers[b], &sigma[a], &sigma[b])
        else {
            return ChannelFit::unfit();
        };

        let cr = sa.zip_map(sb, |x, y| x * x + y * y);

        // Partner magnitudes of the isochrone points closest to the star's
        // magnitude, one per age column.
        let samples = (0..mag_layer.ncols()).filter_map(|q| {
            let (d, row) = closest_in_column(mag_layer, q, star_mag)?;
            (d.abs() < COLOR_TOLERANCE).then(|| partner_layer[(row, q)])
        });
        let span = nan_min_max(samples);
        let best = nan_argmin(&cr);
        let est = best.map_or(f64::NAN, |(v, _)| v);

        let inside = span.is_some_and(|(lo, hi)| star_partner >= lo && star_partner <= hi);
        if let (Some((_, (i, j))), Some(_)) = (best, span) {
            if est.is_finite() && (est <= SIGMA_THRESHOLD || inside) {
                return ChannelFit {
                    mass: self.grid.masses()[i],
                    age: self.grid.ages()[j],
                    fate: FateCode::FitOk,
                };
            }
        }

        let above = span.is_some_and(|(_, hi)| star_partner > hi);
        if self.config.border_age && est >= SIGMA_THRESHOLD && above {
            return ChannelFit {
                mass: f64::NAN,
                age: self.grid.ages()[0],
                fate: FateCode::FitOk,
            };
        }

        let fate = match span {
            Some((lo, _)) if star_partner < lo => FateCode::BelowGridEdge,
            Some(_) if above => FateCode::AboveGridEdge,
            _ => FateCode::OffGridDistance,
        };
        debug!(channel = channel.label(), est, ?span, ?fate, "channel rejected");
        ChannelFit {
            mass: f64::NAN,
            age: f64::NAN,
            fate,
        }
    }

    /// All-band fit: minimise `Σ σ²` over every good canonical band.
    ///
    /// Fate is fit-ok whenever any grid cell has a finite-or-infinite cost.
    pub fn combined_fit(&self, star: &StarPhotometry) -> ChannelFit {
        let (phot, good) = self.canonical(star);
        self.combined_cell(&phot, &good, &phot.map(|b| b.mag))
            .map_or_else(ChannelFit::unfit, |(i, j)| ChannelFit {
                mass: self.grid.masses()[i],
                age: self.grid.ages()[j],
                fate: FateCode::FitOk,
            })
    }

    /// Argmin cell of the summed residuals of `mags`.
    pub(crate) fn combined_cell(
        &self,
        phot: &[BandValue; 6],
        good: &[bool; 6],
        mags: &[f64; 6],
    ) -> Option<(usize, usize)> {
        let sigma = self.residuals(phot, good, mags);
        let mut fields = sigma.iter().flatten();
        let first = fields.next()?;
        let cr = fields.fold(first.map(|s| s * s), |acc, s| acc.zip_map(s, |c, x| c + x * x));
        nan_argmin(&cr).map(|(_, cell)| cell)
    }
}
