//! Shared pipeline logic behind the `build` and `estimate` commands.
//!
//! grid (cache or build) -> catalog -> normalise -> estimate -> Monte-Carlo
//!
//! The command handlers only deal with presentation and exports.

use std::path::PathBuf;

use tracing::info;

use crate::config::Settings;
use crate::domain::{GridRequest, StarFit};
use crate::error::AppError;
use crate::fit::{AgeMassEstimator, EstimatorConfig, MonteCarlo, MonteCarloConfig};
use crate::grid::{CacheStatus, CachedGrid, CsvTrackSource, GridCache, load_isochrones, resolve_model};
use crate::io::ingest::{Catalog, load_catalog};
use crate::photometry::{Extinction, Normalizer, NormalizerConfig, PhotometryTable};

/// A grid ready for fitting.
#[derive(Debug, Clone)]
pub struct GridRun {
    pub model_code: String,
    pub cached: CachedGrid,
    pub status: CacheStatus,
}

/// Knobs of an `estimate` run that are not part of the grid request.
#[derive(Debug, Clone)]
pub struct EstimateOptions {
    pub catalog: PathBuf,
    pub border_age: bool,
    /// `None` skips the Monte-Carlo errors.
    pub monte_carlo: Option<MonteCarloConfig>,
    pub binary_fraction: f64,
}

/// All computed outputs of a single `isoage estimate` run.
#[derive(Debug, Clone)]
pub struct EstimateRun {
    pub grid: GridRun,
    pub catalog: Catalog,
    pub table: PhotometryTable,
    pub fits: Vec<StarFit>,
}

/// Load the requested grid from cache, or build and store it.
pub fn run_build(settings: &Settings, request: &GridRequest) -> Result<GridRun, AppError> {
    let source = CsvTrackSource::new(settings.search_paths());
    let cache = GridCache::new(&settings.cache_dir);
    let model_code = resolve_model(request).code;

    let (cached, status) = load_isochrones(request, &cache, &source)?;
    Ok(GridRun {
        model_code,
        cached,
        status,
    })
}

/// Execute the full estimation pipeline.
pub fn run_estimate(
    settings: &Settings,
    request: &GridRequest,
    options: &EstimateOptions,
) -> Result<EstimateRun, AppError> {
    let grid = run_build(settings, request)?;
    let catalog = load_catalog(&options.catalog)?;

    let extinction = catalog.ebv.clone().map_or(Extinction::None, Extinction::Ebv);
    let normalizer = Normalizer::new(NormalizerConfig {
        binary_fraction: options.binary_fraction,
    });
    let table = normalizer.normalize(&catalog.photometry, &catalog.flags, &extinction)?;

    let estimator = AgeMassEstimator::new(
        &grid.cached.grid,
        EstimatorConfig {
            max_phot_err: settings.max_phot_err,
            border_age: options.border_age,
        },
    );
    let mut fits = estimator.estimate(&table);

    if let Some(mc) = options.monte_carlo {
        MonteCarlo::new(&estimator, mc).apply(&table, &mut fits);
    }

    let determined = fits.iter().filter(|f| f.age.is_finite()).count();
    info!(stars = fits.len(), determined, "estimate finished");

    Ok(EstimateRun {
        grid,
        catalog,
        table,
        fits,
    })
}
