//! Catalog CSV ingest.
//!
//! Turns a cross-matched catalog into the normaliser's inputs:
//! apparent magnitudes and errors per filter, parallaxes, quality flags and
//! an optional E(B-V) column.
//!
//! Schema:
//! - required: `parallax`, `parallax_error`, and at least one filter column
//! - per filter `<label>` column, a matching `<label>_err` column is required
//! - optional: `id`, `ebv`, `edr3_bp_rp_excess_factor_corr`,
//!   `dr2_bp_rp_excess_factor_corr`, `qfl`, `ccf`
//!
//! Empty cells read as NaN (or "no code"), so catalog fallback rows load fine.
//! Rows the CSV parser rejects are skipped and reported.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use nalgebra::DMatrix;
use tracing::{info, warn};

use crate::domain::Filter;
use crate::error::IsoError;
use crate::photometry::{ApparentPhotometry, FilterMatrix, QualityFlags, ScalarSeries};

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub ids: Vec<String>,
    pub photometry: ApparentPhotometry,
    pub flags: QualityFlags,
    pub ebv: Option<ScalarSeries>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl Catalog {
    pub fn n_stars(&self) -> usize {
        self.ids.len()
    }
}

pub fn load_catalog(path: &Path) -> Result<Catalog, IsoError> {
    let file = File::open(path)
        .map_err(|e| IsoError::Catalog(format!("failed to open '{}': {e}", path.display())))?;
    let catalog = read_catalog(file)?;
    info!(
        path = %path.display(),
        stars = catalog.n_stars(),
        filters = catalog.photometry.mags.filters().len(),
        skipped = catalog.row_errors.len(),
        "catalog loaded"
    );
    Ok(catalog)
}

pub fn read_catalog<R: Read>(input: R) -> Result<Catalog, IsoError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    let header_map = build_header_map(&headers);

    let plx_col = required(&header_map, "parallax")?;
    let plx_err_col = required(&header_map, "parallax_error")?;

    let mut filter_cols: Vec<(Filter, usize, usize)> = Vec::new();
    for filter in Filter::ALL {
        let label = filter.label().to_ascii_lowercase();
        if let Some(&col) = header_map.get(&label) {
            let err_col = required(&header_map, &format!("{label}_err"))?;
            filter_cols.push((filter, col, err_col));
        }
    }
    if filter_cols.is_empty() {
        return Err(IsoError::Catalog("no photometric filter columns found".into()));
    }

    let id_col = header_map.get("id").copied();
    let ebv_col = header_map.get("ebv").copied();
    let edr3_col = header_map.get("edr3_bp_rp_excess_factor_corr").copied();
    let dr2_col = header_map.get("dr2_bp_rp_excess_factor_corr").copied();
    let qfl_col = header_map.get("qfl").copied();
    let ccf_col = header_map.get("ccf").copied();

    let mut ids = Vec::new();
    let mut mags: Vec<f64> = Vec::new();
    let mut errs: Vec<f64> = Vec::new();
    let mut plx = Vec::new();
    let mut plx_err = Vec::new();
    let mut ebv = Vec::new();
    let mut edr3 = Vec::new();
    let mut dr2 = Vec::new();
    let mut qfl = Vec::new();
    let mut ccf = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(line, "skipping unparsable catalog row");
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let row_no = ids.len() + 1;
        ids.push(
            id_col
                .and_then(|c| cell(&record, c))
                .map_or_else(|| row_no.to_string(), str::to_string),
        );
        plx.push(parse_f64(&record, Some(plx_col)));
        plx_err.push(parse_f64(&record, Some(plx_err_col)));
        for &(_, col, err_col) in &filter_cols {
            mags.push(parse_f64(&record, Some(col)));
            errs.push(parse_f64(&record, Some(err_col)));
        }
        ebv.push(parse_f64(&record, ebv_col));
        edr3.push(parse_f64(&record, edr3_col));
        dr2.push(parse_f64(&record, dr2_col));
        qfl.push(qfl_col.and_then(|c| cell(&record, c)).map(str::to_string));
        ccf.push(ccf_col.and_then(|c| cell(&record, c)).map(str::to_string));
    }

    if ids.is_empty() {
        return Err(IsoError::Catalog("catalog has no readable rows".into()));
    }

    let n = ids.len();
    let filters: Vec<Filter> = filter_cols.iter().map(|(f, _, _)| *f).collect();
    let k = filters.len();
    let photometry = ApparentPhotometry {
        mags: FilterMatrix::new(filters.clone(), DMatrix::from_row_slice(n, k, &mags))?,
        errs: FilterMatrix::new(filters, DMatrix::from_row_slice(n, k, &errs))?,
        parallax: ScalarSeries::new(plx),
        parallax_err: ScalarSeries::new(plx_err),
    };
    let flags = QualityFlags {
        edr3_excess: edr3_col.map(|_| ScalarSeries::new(edr3)),
        dr2_excess: dr2_col.map(|_| ScalarSeries::new(dr2)),
        qfl: qfl_col.map(|_| qfl),
        ccf: ccf_col.map(|_| ccf),
    };

    Ok(Catalog {
        ids,
        photometry,
        flags,
        ebv: ebv_col.map(|_| ScalarSeries::new(ebv)),
        row_errors,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn required(header_map: &HashMap<String, usize>, name: &str) -> Result<usize, IsoError> {
    header_map
        .get(name)
        .copied()
        .ok_or_else(|| IsoError::Catalog(format!("missing required column `{name}`")))
}

fn cell(record: &StringRecord, col: usize) -> Option<&str> {
    record.get(col).filter(|s| !s.is_empty())
}

fn parse_f64(record: &StringRecord, col: Option<usize>) -> f64 {
    col.and_then(|c| cell(record, c))
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}
