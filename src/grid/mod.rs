//! Isochrone grids: raw track loading, dense resampling, on-disk cache.

pub mod builder;
pub mod cache;
pub mod isochrone;
pub mod params;
pub mod tracks;

pub use builder::{build_grid, target_axes};
pub use cache::{CacheStatus, CachedGrid, GridCache, RebuildReason};
pub use isochrone::IsochroneGrid;
pub use params::{ResolvedModel, resolve_model};
pub use tracks::{CsvTrackSource, RawTrack, TrackSource};

use crate::domain::{FilterTable, GridRequest};
use crate::error::IsoError;

/// Resolve the request, then serve the grid from `cache` or build it from `source`.
pub fn load_isochrones(
    request: &GridRequest,
    cache: &GridCache,
    source: &dyn TrackSource,
) -> Result<(CachedGrid, CacheStatus), IsoError> {
    let surveys = request.unique_surveys();
    let table = FilterTable::for_surveys(request.model, &surveys)?;
    let model = resolve_model(request);
    cache.load_or_build(&model, &surveys, &table.filters(), || {
        build_grid(request, &model, &table, source)
    })
}
