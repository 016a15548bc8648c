//! Dense grid construction from raw tracks.
//!
//! Each filter column is resampled in two separable passes: along mass for
//! every native age, then along age for every target mass. Slices with fewer
//! than two valid samples stay NaN; nothing is extrapolated.

use nalgebra::DMatrix;
use tracing::{debug, info};

use crate::domain::FilterTable;
use crate::domain::GridRequest;
use crate::error::IsoError;
use crate::grid::isochrone::IsochroneGrid;
use crate::grid::params::ResolvedModel;
use crate::grid::tracks::{RawTrack, TrackSource};
use crate::math::{interp_valid, lin_space, log_space};

/// Solar mass in kg (IAU 2015 nominal).
pub const M_SUN_KG: f64 = 1.988409870698051e30;
/// Jupiter mass in kg (IAU 2015 nominal).
pub const M_JUP_KG: f64 = 1.8981245973360505e27;

/// Jupiter masses per solar mass.
pub fn mjup_per_msun() -> f64 {
    M_SUN_KG / M_JUP_KG
}

/// Target axes for a request: linear masses (M_sun) and log-uniform ages (Myr).
pub fn target_axes(request: &GridRequest) -> Result<(Vec<f64>, Vec<f64>), IsoError> {
    let [m0, m1] = request.mass_range;
    let [a0, a1] = request.age_range;
    let masses = lin_space(m0, m1, request.mass_steps, "mass")?;
    let ages = log_space(a0, a1, request.age_steps, "age")?;
    Ok((masses, ages))
}

/// Build the grid for `request` from the tracks `source` provides.
///
/// Filters are laid out in `table` order. Every survey's track is loaded once.
pub fn build_grid(
    request: &GridRequest,
    model: &ResolvedModel,
    table: &FilterTable,
    source: &dyn TrackSource,
) -> Result<IsochroneGrid, IsoError> {
    let (masses, ages) = target_axes(request)?;
    let release = request.model.gaia_release();

    // Tracks are tabulated in Jupiter masses; only the query points move.
    let mass_queries: Vec<f64> = masses.iter().map(|m| m * mjup_per_msun()).collect();

    info!(
        model = %model.code,
        mass_steps = masses.len(),
        age_steps = ages.len(),
        "building isochrone grid"
    );

    let mut filters = Vec::new();
    let mut layers = Vec::new();
    for survey in request.unique_surveys() {
        let track = source.load(&model.code, survey, release)?;
        debug!(
            survey = survey.name(),
            native_masses = track.masses.len(),
            native_ages = track.ages.len(),
            "loaded track"
        );

        for (filter, native) in table.survey_entries(survey) {
            let column = track.column(native).ok_or_else(|| IsoError::MissingColumn {
                path: track.origin.clone(),
                column: native.to_string(),
            })?;
            layers.push(resample(&track, column, &mass_queries, &ages));
            filters.push(filter);
        }
    }

    let grid = IsochroneGrid::new(masses, ages, filters, layers)?;
    for (filter, frac) in grid.coverage() {
        debug!(filter = filter.label(), coverage = frac, "grid layer filled");
    }
    Ok(grid)
}

/// Two-pass resampling of one native column onto `(mass_queries, ages)`.
fn resample(track: &RawTrack, column: &DMatrix<f64>, mass_queries: &[f64], ages: &[f64]) -> DMatrix<f64> {
    let n_native_ages = track.ages.len();

    // Pass 1: mass axis, one native age at a time.
    let mut by_mass = DMatrix::from_element(mass_queries.len(), n_native_ages, f64::NAN);
    for k in 0..n_native_ages {
        let ys: Vec<f64> = column.column(k).iter().copied().collect();
        if let Some(vals) = interp_valid(&track.masses, &ys, mass_queries) {
            by_mass.set_column(k, &nalgebra::DVector::from_vec(vals));
        }
    }

    // Pass 2: age axis, one target mass at a time.
    let mut out = DMatrix::from_element(mass_queries.len(), ages.len(), f64::NAN);
    for i in 0..mass_queries.len() {
        let ys: Vec<f64> = by_mass.row(i).iter().copied().collect();
        if let Some(vals) = interp_valid(&track.ages, &ys, ages) {
            for (j, v) in vals.into_iter().enumerate() {
                out[(i, j)] = v;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::path::PathBuf;

    use approx::assert_relative_eq;

    use super::*;
    use crate::domain::{Filter, GaiaRelease, Model, Survey};
    use crate::grid::params::resolve_model;

    /// Track whose magnitude is `mass_mjup / 100 + log10(age)`: linear in
    /// mass, so pass 1 is exact on the knots of any age row.
    struct Synthetic {
        calls: Cell<usize>,
        hole: bool,
    }

    impl TrackSource for Synthetic {
        fn load(&self, _code: &str, survey: Survey, _release: GaiaRelease) -> Result<RawTrack, IsoError> {
            self.calls.set(self.calls.get() + 1);
            let masses: Vec<f64> = (0..=20).map(|i| 5.0 + 100.0 * i as f64).collect();
            let ages: Vec<f64> = vec![0.5, 1.0, 10.0, 100.0, 1000.0, 2000.0];
            let columns: Vec<String> = match survey {
                Survey::TwoMass => vec!["J".into(), "H".into(), "K".into()],
                _ => vec!["G2018".into(), "G2018_BP".into(), "G2018_RP".into()],
            };
            let data = columns
                .iter()
                .enumerate()
                .map(|(c, _)| {
                    DMatrix::from_fn(masses.len(), ages.len(), |i, j| {
                        if self.hole && j == 3 && i > 0 {
                            f64::NAN
                        } else {
                            masses[i] / 100.0 + ages[j].log10() + c as f64
                        }
                    })
                })
                .collect();
            Ok(RawTrack {
                masses,
                ages,
                columns,
                data,
                origin: PathBuf::from("synthetic"),
            })
        }
    }

    fn request() -> GridRequest {
        let mut req = GridRequest::new(Model::BtSettl, vec![Survey::Gaia, Survey::TwoMass]);
        req.mass_range = [0.1, 1.0];
        req.age_range = [1.0, 1000.0];
        req.mass_steps = 10;
        req.age_steps = 4;
        req
    }

    fn build(req: &GridRequest, source: &Synthetic) -> IsochroneGrid {
        let model = resolve_model(req);
        let table = FilterTable::for_surveys(req.model, &req.unique_surveys()).unwrap();
        build_grid(req, &model, &table, source).unwrap()
    }

    #[test]
    fn axes_are_increasing_and_span_the_request() {
        let source = Synthetic { calls: Cell::new(0), hole: false };
        let grid = build(&request(), &source);

        assert!(grid.masses().windows(2).all(|w| w[1] > w[0]));
        assert!(grid.ages().windows(2).all(|w| w[1] > w[0]));
        assert_eq!(grid.masses()[0], 0.1);
        assert_eq!(*grid.masses().last().unwrap(), 1.0);
        assert_eq!(grid.ages()[0], 1.0);
        assert_eq!(*grid.ages().last().unwrap(), 1000.0);
        assert_eq!(grid.shape(), (10, 4, 6));
        assert_eq!(source.calls.get(), 2);
    }

    #[test]
    fn values_follow_the_native_relation() {
        let source = Synthetic { calls: Cell::new(0), hole: false };
        let grid = build(&request(), &source);

        // Ages 1, 10, 100, 1000 are native knots, so pass 2 is exact too.
        let k = grid.layer(Filter::K).unwrap();
        for (i, m) in grid.masses().iter().enumerate() {
            for (j, a) in grid.ages().iter().enumerate() {
                let expected = m * mjup_per_msun() / 100.0 + a.log10() + 2.0;
                assert_relative_eq!(k[(i, j)], expected, epsilon = 1e-9);
            }
        }
        assert_eq!(grid.filters()[..3], [Filter::G2, Filter::Gbp2, Filter::Grp2]);
    }

    #[test]
    fn out_of_range_masses_are_nan() {
        let source = Synthetic { calls: Cell::new(0), hole: false };
        let mut req = request();
        // 2.0 M_sun is ~2095 M_jup, past the last native mass (2005).
        req.mass_range = [0.1, 2.0];
        let grid = build(&req, &source);
        let g = grid.layer(Filter::G2).unwrap();
        assert!(g.row(grid.masses().len() - 1).iter().all(|v| v.is_nan()));
        assert!(g.row(0).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn sparse_age_row_is_skipped_not_fatal() {
        // Native age 100 keeps a single valid mass: pass 1 leaves it NaN and
        // pass 2 bridges it from ages 10 and 1000.
        let source = Synthetic { calls: Cell::new(0), hole: true };
        let grid = build(&request(), &source);
        let j = grid.layer(Filter::J).unwrap();
        assert!(j.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn missing_native_column_is_an_error() {
        struct Empty;
        impl TrackSource for Empty {
            fn load(&self, _: &str, _: Survey, _: GaiaRelease) -> Result<RawTrack, IsoError> {
                Ok(RawTrack {
                    masses: vec![1.0, 2.0],
                    ages: vec![1.0, 2.0],
                    columns: vec!["X".into()],
                    data: vec![DMatrix::zeros(2, 2)],
                    origin: PathBuf::from("empty"),
                })
            }
        }
        let req = request();
        let model = resolve_model(&req);
        let table = FilterTable::for_surveys(req.model, &req.unique_surveys()).unwrap();
        let err = build_grid(&req, &model, &table, &Empty).unwrap_err();
        assert!(matches!(err, IsoError::MissingColumn { .. }));
    }
}
