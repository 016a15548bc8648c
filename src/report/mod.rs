//! Reporting: terminal tables, run summaries and the verbose age report.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::{Model, StarFit};
use crate::error::IsoError;

pub mod format;

pub use format::*;

/// `<catalog dir>/<catalog stem>_ages_<model>.txt`.
pub fn age_report_path(catalog: &Path, model: Model) -> PathBuf {
    let stem = catalog
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "catalog".to_string());
    catalog.with_file_name(format!("{stem}_ages_{}.txt", model.name()))
}

/// Write the verbose per-star age table.
pub fn write_age_report(path: &Path, fits: &[StarFit]) -> Result<(), IsoError> {
    fs::write(path, format_age_table(fits))?;
    info!(path = %path.display(), stars = fits.len(), "age report written");
    Ok(())
}
