//! Raw evolutionary tracks as shipped by each model.
//!
//! A track covers one survey's filters on the model's native, irregular
//! mass/age sampling. The CSV form is "long": one row per `(mass, age)` point
//! with a column per native filter name.
//!
//! ```text
//! mass,age,G2018,G2018_BP,G2018_RP
//! 10.5,1.0,14.21,15.80,12.90
//! ```
//!
//! Masses are in Jupiter masses, ages in Myr. Missing points are NaN.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use nalgebra::DMatrix;
use tracing::debug;

use crate::config::SearchPaths;
use crate::domain::{GaiaRelease, Survey};
use crate::error::IsoError;

/// Magnitudes of one survey on the model's native sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTrack {
    /// Jupiter masses, strictly increasing.
    pub masses: Vec<f64>,
    /// Myr, strictly increasing.
    pub ages: Vec<f64>,
    /// Native column names, one per `data` entry.
    pub columns: Vec<String>,
    /// `masses.len() × ages.len()` per column.
    pub data: Vec<DMatrix<f64>>,
    /// Where the track came from (for error messages).
    pub origin: PathBuf,
}

impl RawTrack {
    pub fn column(&self, name: &str) -> Option<&DMatrix<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(&self.data[idx])
    }
}

/// Something that can hand out raw tracks for a model code and survey.
pub trait TrackSource {
    fn load(&self, model_code: &str, survey: Survey, release: GaiaRelease) -> Result<RawTrack, IsoError>;
}

/// Reads `<model_code>_<survey tag>.csv` from the first search directory that has it.
#[derive(Debug, Clone)]
pub struct CsvTrackSource {
    paths: SearchPaths,
}

impl CsvTrackSource {
    pub fn new(paths: SearchPaths) -> Self {
        Self { paths }
    }

    pub fn file_name(model_code: &str, survey: Survey, release: GaiaRelease) -> String {
        format!("{model_code}_{}.csv", survey.track_tag(release))
    }
}

impl TrackSource for CsvTrackSource {
    fn load(&self, model_code: &str, survey: Survey, release: GaiaRelease) -> Result<RawTrack, IsoError> {
        let file = Self::file_name(model_code, survey, release);
        let path = self
            .paths
            .find(&file)
            .ok_or(IsoError::TrackNotFound { file })?;
        debug!(path = %path.display(), "reading raw track");
        read_track_csv(&path)
    }
}

pub fn read_track_csv(path: &Path) -> Result<RawTrack, IsoError> {
    let file = File::open(path)?;
    parse_track(file, path)
}

/// Parse a long-format track table.
pub fn parse_track<R: Read>(input: R, origin: &Path) -> Result<RawTrack, IsoError> {
    let malformed = |message: String| IsoError::MalformedTrack {
        path: origin.to_path_buf(),
        message,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    let mass_col = find_header(&headers, "mass").ok_or_else(|| malformed("no 'mass' column".into()))?;
    let age_col = find_header(&headers, "age").ok_or_else(|| malformed("no 'age' column".into()))?;
    let filter_cols: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != mass_col && *i != age_col)
        .map(|(i, name)| (i, name.trim_start_matches('\u{feff}').to_string()))
        .collect();

    let mut rows: Vec<(f64, f64, Vec<f64>)> = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let line = idx + 2;
        let mass = parse_cell(record.get(mass_col));
        let age = parse_cell(record.get(age_col));
        if !(mass.is_finite() && age.is_finite()) {
            return Err(malformed(format!("line {line}: mass and age must be finite numbers")));
        }
        let values = filter_cols
            .iter()
            .map(|(i, _)| parse_cell(record.get(*i)))
            .collect();
        rows.push((mass, age, values));
    }

    if rows.is_empty() {
        return Err(malformed("no data rows".into()));
    }

    let masses = sorted_unique(rows.iter().map(|r| r.0));
    let ages = sorted_unique(rows.iter().map(|r| r.1));
    let mass_idx = index_of(&masses);
    let age_idx = index_of(&ages);

    let mut data = vec![DMatrix::from_element(masses.len(), ages.len(), f64::NAN); filter_cols.len()];
    for (mass, age, values) in rows {
        let (Some(&i), Some(&j)) = (mass_idx.get(&axis_key(mass)), age_idx.get(&axis_key(age))) else {
            return Err(malformed(format!("no axis slot for mass {mass}, age {age}")));
        };
        for (layer, v) in data.iter_mut().zip(values) {
            layer[(i, j)] = v;
        }
    }

    Ok(RawTrack {
        masses,
        ages,
        columns: filter_cols.into_iter().map(|(_, name)| name).collect(),
        data,
        origin: origin.to_path_buf(),
    })
}

fn find_header(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
}

/// Empty cells and anything unparsable read as NaN.
fn parse_cell(cell: Option<&str>) -> f64 {
    match cell {
        Some(s) if !s.is_empty() => s.parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn sorted_unique(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = values.collect();
    v.sort_by(f64::total_cmp);
    v.dedup();
    v
}

fn index_of(values: &[f64]) -> HashMap<u64, usize> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| (axis_key(*v), i))
        .collect()
}

/// Bit pattern with `-0.0` folded onto `0.0`, matching how `dedup` merges them.
fn axis_key(v: f64) -> u64 {
    if v == 0.0 { 0f64.to_bits() } else { v.to_bits() }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACK: &str = "\
mass,age,J,H
20,10,9.0,8.5
10,1,8.0,
10,10,10.0,9.5
20,1,7.0,6.5
";

    #[test]
    fn long_rows_become_dense_layers() {
        let track = parse_track(TRACK.as_bytes(), Path::new("mem.csv")).unwrap();
        assert_eq!(track.masses, vec![10.0, 20.0]);
        assert_eq!(track.ages, vec![1.0, 10.0]);
        assert_eq!(track.columns, vec!["J".to_string(), "H".to_string()]);

        let j = track.column("J").unwrap();
        assert_eq!(j[(0, 0)], 8.0);
        assert_eq!(j[(1, 1)], 9.0);
        let h = track.column("H").unwrap();
        assert!(h[(0, 0)].is_nan());
        assert_eq!(h[(1, 0)], 6.5);
    }

    #[test]
    fn signed_zero_shares_one_axis_slot() {
        let text = "mass,age,J\n-0,1,5.0\n0,10,6.0\n10,1,7.0\n10,10,8.0\n";
        let track = parse_track(text.as_bytes(), Path::new("zero.csv")).unwrap();
        assert_eq!(track.masses.len(), 2);
        let j = track.column("J").unwrap();
        assert_eq!(j[(0, 0)], 5.0);
        assert_eq!(j[(0, 1)], 6.0);
        assert_eq!(j[(1, 1)], 8.0);
    }

    #[test]
    fn missing_age_column_is_malformed() {
        let err = parse_track("mass,J\n1,2\n".as_bytes(), Path::new("bad.csv")).unwrap_err();
        assert!(matches!(err, IsoError::MalformedTrack { .. }));
    }

    #[test]
    fn csv_source_resolves_through_search_paths() {
        let dir = tempfile::tempdir().unwrap();
        let name = CsvTrackSource::file_name("mist_p0.00_p0.0_p0.0", Survey::Gaia, GaiaRelease::Edr3);
        assert_eq!(name, "mist_p0.00_p0.0_p0.0_gaia_edr3.csv");
        std::fs::write(dir.path().join(&name), TRACK).unwrap();

        let source = CsvTrackSource::new(SearchPaths::new(vec![dir.path().to_path_buf()]));
        let track = source
            .load("mist_p0.00_p0.0_p0.0", Survey::Gaia, GaiaRelease::Edr3)
            .unwrap();
        assert_eq!(track.masses.len(), 2);

        let missing = source.load("parsec_p0.00", Survey::Gaia, GaiaRelease::Edr3);
        assert!(matches!(missing, Err(IsoError::TrackNotFound { .. })));
    }
}
