//! Apparent catalog photometry → absolute magnitudes ready for grid matching.
//!
//! Steps, in order:
//!
//! 1. distance modulus with propagated error
//! 2. Gaia BP/RP excess-factor cut
//! 3. 2MASS `qfl` and WISE `ccf` quality codes
//! 4. extinction subtraction plus the unresolved-binary offset
//!
//! Failed cuts overwrite the affected magnitude and error with NaN; the star
//! stays in the table.

use std::f64::consts::LN_10;

use tracing::{info, warn};

use crate::domain::{Filter, GaiaRelease};
use crate::error::IsoError;
use crate::photometry::extinction::Extinction;
use crate::photometry::series::{BandValue, FilterMatrix, ScalarSeries, StarPhotometry};

/// Default largest photometric error a band may carry and still be matched.
pub const MAX_PHOT_ERR: f64 = 0.2;
/// Magnitudes at or beyond this absolute value are missing-data codes.
pub const MAG_SENTINEL: f64 = 70.0;

/// `M = m - 5·log10(100 / parallax)`, parallax in mas. NaN for `parallax <= 0`.
pub fn app_to_abs_mag(app_mag: f64, parallax: f64) -> f64 {
    if !(parallax > 0.0) {
        return f64::NAN;
    }
    app_mag - 5.0 * (100.0 / parallax).log10()
}

/// Inverse of [`app_to_abs_mag`].
pub fn abs_to_app_mag(abs_mag: f64, parallax: f64) -> f64 {
    if !(parallax > 0.0) {
        return f64::NAN;
    }
    abs_mag + 5.0 * (100.0 / parallax).log10()
}

/// `σ_M = sqrt(σ_m² + (5/ln10/parallax)²·σ_parallax²)`.
pub fn abs_mag_error(app_mag_err: f64, parallax: f64, parallax_err: f64) -> f64 {
    let k = 5.0 / LN_10 / parallax;
    (app_mag_err * app_mag_err + k * k * parallax_err * parallax_err).sqrt()
}

/// Finite, error below `max_err`, and not a missing-data code.
pub fn is_phot_good(mag: f64, err: f64, max_err: f64) -> bool {
    mag.is_finite() && err < max_err && mag.abs() < MAG_SENTINEL
}

/// Largest acceptable |C*| / 3 for Gaia EDR3, as a function of G.
pub fn edr3_excess_threshold(g: f64) -> f64 {
    0.0059898 + 8.817481e-12 * g.powf(7.618399)
}

/// Largest acceptable |C*| / 3 for Gaia DR2, as a function of G.
pub fn dr2_excess_threshold(g: f64) -> f64 {
    0.004 + 8e-12 * g.powf(7.55)
}

/// Catalog photometry as supplied by the cross-matcher.
#[derive(Debug, Clone, PartialEq)]
pub struct ApparentPhotometry {
    pub mags: FilterMatrix,
    pub errs: FilterMatrix,
    /// mas
    pub parallax: ScalarSeries,
    pub parallax_err: ScalarSeries,
}

impl ApparentPhotometry {
    pub fn n_stars(&self) -> usize {
        self.mags.n_stars()
    }
}

/// Survey quality information. A missing column disables that cut.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QualityFlags {
    pub edr3_excess: Option<ScalarSeries>,
    pub dr2_excess: Option<ScalarSeries>,
    /// 2MASS `qfl`, three characters for J, H, K.
    pub qfl: Option<Vec<Option<String>>>,
    /// WISE `ccf`, four characters for W1..W4.
    pub ccf: Option<Vec<Option<String>>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizerConfig {
    /// Fraction of the equal-mass binary offset to apply (0 = single stars).
    pub binary_fraction: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self { binary_fraction: 0.0 }
    }
}

/// How many entries each step nulled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CutCounts {
    pub bad_parallax: usize,
    pub negative_error: usize,
    pub gaia_excess: usize,
    pub twomass_quality: usize,
    pub wise_quality: usize,
}

/// Normalised absolute photometry.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotometryTable {
    pub mags: FilterMatrix,
    pub errs: FilterMatrix,
    pub cuts: CutCounts,
}

impl PhotometryTable {
    pub fn n_stars(&self) -> usize {
        self.mags.n_stars()
    }

    pub fn star(&self, i: usize) -> StarPhotometry {
        let bands = self
            .mags
            .filters()
            .iter()
            .map(|&f| {
                (
                    f,
                    BandValue {
                        mag: self.mags.get(i, f),
                        err: self.errs.get(i, f),
                    },
                )
            })
            .collect();
        StarPhotometry::new(bands)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn normalize(
        &self,
        input: &ApparentPhotometry,
        flags: &QualityFlags,
        extinction: &Extinction,
    ) -> Result<PhotometryTable, IsoError> {
        let n = input.n_stars();
        input.mags.same_layout(&input.errs, "magnitude and error matrices differ")?;
        input.parallax.expect_len(n, "parallax")?;
        input.parallax_err.expect_len(n, "parallax error")?;
        if let Some(s) = &flags.edr3_excess {
            s.expect_len(n, "EDR3 excess factor")?;
        }
        if let Some(s) = &flags.dr2_excess {
            s.expect_len(n, "DR2 excess factor")?;
        }
        check_codes(&flags.qfl, n, "2MASS qfl")?;
        check_codes(&flags.ccf, n, "WISE ccf")?;
        extinction.check(n)?;

        let mut mags = input.mags.clone();
        let mut errs = input.errs.clone();
        let mut cuts = CutCounts::default();

        self.to_absolute(input, &mut mags, &mut errs, &mut cuts);

        for (release, series) in [
            (GaiaRelease::Edr3, &flags.edr3_excess),
            (GaiaRelease::Dr2, &flags.dr2_excess),
        ] {
            if let Some(series) = series {
                cuts.gaia_excess += excess_cut(release, series, &mut mags, &mut errs);
            }
        }
        if let Some(codes) = &flags.qfl {
            cuts.twomass_quality += code_cut(codes, &[Filter::J, Filter::H, Filter::K], 'A', &mut mags, &mut errs);
        }
        if let Some(codes) = &flags.ccf {
            cuts.wise_quality += code_cut(
                codes,
                &[Filter::W1, Filter::W2, Filter::W3, Filter::W4],
                '0',
                &mut mags,
                &mut errs,
            );
        }

        let binary_offset = 2.5 * 2f64.log10() * self.config.binary_fraction;
        let filters = mags.filters().to_vec();
        for i in 0..n {
            for &f in &filters {
                let m = mags.get(i, f);
                mags.set(i, f, m - extinction.magnitudes(i, f) + binary_offset);
            }
        }

        info!(
            stars = n,
            bad_parallax = cuts.bad_parallax,
            negative_error = cuts.negative_error,
            gaia_excess = cuts.gaia_excess,
            twomass_quality = cuts.twomass_quality,
            wise_quality = cuts.wise_quality,
            "photometry normalised"
        );

        Ok(PhotometryTable {
            mags,
            errs,
            cuts,
        })
    }

    fn to_absolute(
        &self,
        input: &ApparentPhotometry,
        mags: &mut FilterMatrix,
        errs: &mut FilterMatrix,
        cuts: &mut CutCounts,
    ) {
        let filters = input.mags.filters().to_vec();
        for i in 0..input.n_stars() {
            let plx = input.parallax.get(i);
            let plx_err = input.parallax_err.get(i);
            if !(plx > 0.0) {
                cuts.bad_parallax += 1;
            }
            for &f in &filters {
                let m = input.mags.get(i, f);
                let e = input.errs.get(i, f);
                if e < 0.0 {
                    warn!(star = i, filter = f.label(), err = e, "negative photometric error, band dropped");
                    cuts.negative_error += 1;
                    mags.set(i, f, f64::NAN);
                    errs.set(i, f, f64::NAN);
                    continue;
                }
                mags.set(i, f, app_to_abs_mag(m, plx));
                errs.set(i, f, if plx > 0.0 { abs_mag_error(e, plx, plx_err) } else { f64::NAN });
            }
        }
    }
}

fn check_codes(codes: &Option<Vec<Option<String>>>, n: usize, what: &str) -> Result<(), IsoError> {
    match codes {
        Some(c) if c.len() != n => Err(IsoError::Shape(format!("{what} has {} codes for {n} stars", c.len()))),
        _ => Ok(()),
    }
}

fn null_band(mags: &mut FilterMatrix, errs: &mut FilterMatrix, star: usize, filter: Filter) -> bool {
    let had_value = !mags.get(star, filter).is_nan();
    mags.set(star, filter, f64::NAN);
    errs.set(star, filter, f64::NAN);
    had_value
}

/// Null BP/RP where `|C*| > 3·threshold(G)`. Returns the number of stars cut.
fn excess_cut(release: GaiaRelease, excess: &ScalarSeries, mags: &mut FilterMatrix, errs: &mut FilterMatrix) -> usize {
    let [g, bp, rp] = release.triplet();
    if mags.column_index(g).is_none() {
        return 0;
    }
    let threshold = match release {
        GaiaRelease::Edr3 => edr3_excess_threshold,
        GaiaRelease::Dr2 => dr2_excess_threshold,
    };

    let mut cut = 0;
    for i in 0..mags.n_stars() {
        let c = excess.get(i);
        if c.abs() > 3.0 * threshold(mags.get(i, g)) {
            null_band(mags, errs, i, bp);
            null_band(mags, errs, i, rp);
            cut += 1;
        }
    }
    cut
}

/// Null each band whose code character is not `good`. A missing code nulls
/// every band. Returns the number of entries nulled.
fn code_cut(
    codes: &[Option<String>],
    filters: &[Filter],
    good: char,
    mags: &mut FilterMatrix,
    errs: &mut FilterMatrix,
) -> usize {
    if filters.iter().all(|f| mags.column_index(*f).is_none()) {
        return 0;
    }
    let mut nulled = 0;
    for (i, code) in codes.iter().enumerate() {
        for (k, &f) in filters.iter().enumerate() {
            let ok = code.as_deref().and_then(|c| c.chars().nth(k)) == Some(good);
            if !ok && null_band(mags, errs, i, f) {
                nulled += 1;
            }
        }
    }
    nulled
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    use super::*;

    fn input(filters: Vec<Filter>, mags: &[f64], errs: &[f64], plx: Vec<f64>) -> ApparentPhotometry {
        let n = plx.len();
        let k = filters.len();
        ApparentPhotometry {
            mags: FilterMatrix::new(filters.clone(), DMatrix::from_row_slice(n, k, mags)).unwrap(),
            errs: FilterMatrix::new(filters, DMatrix::from_row_slice(n, k, errs)).unwrap(),
            parallax_err: ScalarSeries::constant(n, 0.0),
            parallax: ScalarSeries::new(plx),
        }
    }

    #[test]
    fn distance_modulus_round_trip() {
        for &m in &[-3.0, 0.0, 7.25, 16.8] {
            for &p in &[0.3, 1.0, 10.0, 100.0, 768.5] {
                let back = abs_to_app_mag(app_to_abs_mag(m, p), p);
                assert_relative_eq!(back, m, epsilon = 1e-12);
            }
        }
        assert_relative_eq!(app_to_abs_mag(10.0, 10.0), 5.0, epsilon = 1e-12);
        assert!(app_to_abs_mag(10.0, 0.0).is_nan());
        assert!(app_to_abs_mag(10.0, -1.0).is_nan());
    }

    #[test]
    fn parallax_error_propagates() {
        let e = abs_mag_error(0.03, 10.0, 0.1);
        let k = 5.0 / LN_10 / 10.0;
        assert_relative_eq!(e, (0.03f64.powi(2) + k * k * 0.01).sqrt());
        assert_eq!(abs_mag_error(0.05, 10.0, 0.0), 0.05);
    }

    #[test]
    fn good_photometry_rules() {
        assert!(is_phot_good(12.0, 0.05, MAX_PHOT_ERR));
        assert!(!is_phot_good(12.0, 0.2, MAX_PHOT_ERR));
        assert!(!is_phot_good(f64::NAN, 0.01, MAX_PHOT_ERR));
        assert!(!is_phot_good(99.0, 0.01, MAX_PHOT_ERR));
        assert!(!is_phot_good(12.0, f64::NAN, MAX_PHOT_ERR));
    }

    #[test]
    fn excess_factor_nulls_bp_rp_only() {
        let photo = input(
            vec![Filter::G, Filter::Gbp, Filter::Grp],
            &[10.0, 10.5, 9.5, 10.0, 10.5, 9.5],
            &[0.01; 6],
            vec![10.0, 10.0],
        );
        // Absolute G is 5: threshold ≈ 0.00605.
        let flags = QualityFlags {
            edr3_excess: Some(ScalarSeries::new(vec![0.001, 0.5])),
            ..QualityFlags::default()
        };
        let table = Normalizer::default()
            .normalize(&photo, &flags, &Extinction::None)
            .unwrap();

        assert_relative_eq!(table.mags.get(1, Filter::G), 5.0, epsilon = 1e-12);
        assert!(table.mags.get(1, Filter::Gbp).is_nan());
        assert!(table.errs.get(1, Filter::Grp).is_nan());
        assert!(table.mags.get(0, Filter::Gbp).is_finite());
        assert_eq!(table.cuts.gaia_excess, 1);
    }

    #[test]
    fn twomass_and_wise_codes() {
        let photo = input(
            vec![Filter::J, Filter::H, Filter::K, Filter::W1, Filter::W2, Filter::W3, Filter::W4],
            &[9.0, 8.5, 8.4, 8.3, 8.3, 8.2, 8.1, 9.0, 8.5, 8.4, 8.3, 8.3, 8.2, 8.1],
            &[0.02; 14],
            vec![5.0, 5.0],
        );
        let flags = QualityFlags {
            qfl: Some(vec![Some("AAC".into()), None]),
            ccf: Some(vec![Some("0000".into()), Some("00h0".into())]),
            ..QualityFlags::default()
        };
        let table = Normalizer::default()
            .normalize(&photo, &flags, &Extinction::None)
            .unwrap();

        assert!(table.mags.get(0, Filter::J).is_finite());
        assert!(table.mags.get(0, Filter::K).is_nan());
        for f in [Filter::J, Filter::H, Filter::K] {
            assert!(table.mags.get(1, f).is_nan());
        }
        assert!(table.mags.get(0, Filter::W3).is_finite());
        assert!(table.mags.get(1, Filter::W3).is_nan());
        assert!(table.mags.get(1, Filter::W4).is_finite());
        assert_eq!(table.cuts.twomass_quality, 4);
        assert_eq!(table.cuts.wise_quality, 1);
    }

    #[test]
    fn extinction_and_binary_offset() {
        let photo = input(vec![Filter::V, Filter::K], &[10.0, 8.0], &[0.01, 0.01], vec![10.0]);
        let normalizer = Normalizer::new(NormalizerConfig {
            binary_fraction: 1.0,
            ..NormalizerConfig::default()
        });
        let ebv = Extinction::Ebv(ScalarSeries::new(vec![0.1]));
        let table = normalizer.normalize(&photo, &QualityFlags::default(), &ebv).unwrap();

        let offset = 2.5 * 2f64.log10();
        assert_relative_eq!(table.mags.get(0, Filter::V), 5.0 - 0.316 + offset, epsilon = 1e-12);
        assert_relative_eq!(
            table.mags.get(0, Filter::K),
            3.0 - 3.16 * 0.078 * 0.1 + offset,
            epsilon = 1e-12
        );
    }

    #[test]
    fn negative_errors_and_bad_parallax_are_soft() {
        let photo = input(vec![Filter::G, Filter::K], &[10.0, 8.0, 10.0, 8.0], &[-0.1, 0.02, 0.01, 0.02], vec![10.0, -2.0]);
        let table = Normalizer::default()
            .normalize(&photo, &QualityFlags::default(), &Extinction::None)
            .unwrap();
        assert!(table.mags.get(0, Filter::G).is_nan());
        assert!(table.mags.get(0, Filter::K).is_finite());
        assert!(table.mags.get(1, Filter::G).is_nan());
        assert_eq!(table.cuts.negative_error, 1);
        assert_eq!(table.cuts.bad_parallax, 1);
    }

    #[test]
    fn mismatched_lengths_are_errors() {
        let mut photo = input(vec![Filter::G], &[10.0, 11.0], &[0.01, 0.01], vec![10.0, 5.0]);
        photo.parallax = ScalarSeries::new(vec![10.0]);
        let err = Normalizer::default().normalize(&photo, &QualityFlags::default(), &Extinction::None);
        assert!(matches!(err, Err(IsoError::Shape(_))));
    }
}
