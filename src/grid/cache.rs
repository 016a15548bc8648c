//! On-disk grid cache.
//!
//! One artifact per `(model code, sorted surveys)` key. The file is a bincode
//! header `{magic, schema_version}` followed by the body
//! `{GridParameters, IsochroneGrid}`; the header is decoded on its own first so
//! a file from another schema is recognised without touching the body.
//!
//! A stored grid is reused when its discrete parameters equal the request and
//! its ranges cover the requested ones. Anything else, including a file that
//! fails to decode, means the grid is rebuilt and written back whole.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{Filter, GridParameters, Survey};
use crate::error::IsoError;
use crate::grid::isochrone::IsochroneGrid;
use crate::grid::params::ResolvedModel;

pub const CACHE_MAGIC: [u8; 8] = *b"ISOGRID\0";
/// Bump whenever the body layout or the filter tables change.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    magic: [u8; 8],
    schema_version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Body {
    params: GridParameters,
    grid: IsochroneGrid,
}

/// A grid together with the parameters it was built for.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedGrid {
    pub params: GridParameters,
    pub grid: IsochroneGrid,
}

/// Why a stored artifact could not serve a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RebuildReason {
    Missing,
    Unreadable(String),
    SchemaMismatch { found: u32 },
    ParametersChanged,
    RangeNotCovered,
    FiltersChanged,
}

impl fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebuildReason::Missing => write!(f, "no cached grid"),
            RebuildReason::Unreadable(msg) => write!(f, "cached grid unreadable ({msg})"),
            RebuildReason::SchemaMismatch { found } => {
                write!(f, "cache schema v{found}, expected v{SCHEMA_VERSION}")
            }
            RebuildReason::ParametersChanged => write!(f, "model parameters changed"),
            RebuildReason::RangeNotCovered => write!(f, "requested range exceeds cached range"),
            RebuildReason::FiltersChanged => write!(f, "cached filters differ"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Hit(CachedGrid),
    Rebuild(RebuildReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheStatus {
    Hit,
    Rebuilt(RebuildReason),
}

#[derive(Debug, Clone)]
pub struct GridCache {
    dir: PathBuf,
}

impl GridCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<model code>_<sorted survey names>.bin`.
    pub fn key(model: &ResolvedModel, surveys: &[Survey]) -> String {
        let mut names: Vec<&str> = surveys.iter().map(|s| s.name()).collect();
        names.sort_unstable();
        names.dedup();
        format!("{}_{}.bin", model.code, names.join("_"))
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Check the artifact at `path` against `requested` and the filters the
    /// caller needs.
    pub fn lookup(&self, path: &Path, requested: &GridParameters, filters: &[Filter]) -> Lookup {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Lookup::Rebuild(RebuildReason::Missing);
            }
            Err(e) => return Lookup::Rebuild(RebuildReason::Unreadable(e.to_string())),
        };

        let body = match decode(&bytes) {
            Ok(body) => body,
            Err(reason) => return Lookup::Rebuild(reason),
        };

        if !body.params.same_physics(requested) {
            return Lookup::Rebuild(RebuildReason::ParametersChanged);
        }
        if !body.params.covers(requested) {
            return Lookup::Rebuild(RebuildReason::RangeNotCovered);
        }
        if !filters.iter().all(|f| body.grid.filters().contains(f)) {
            return Lookup::Rebuild(RebuildReason::FiltersChanged);
        }

        Lookup::Hit(CachedGrid {
            params: body.params,
            grid: body.grid,
        })
    }

    /// Write `grid` to `path`, replacing whatever was there.
    ///
    /// The bytes go to a sibling temp file first and are renamed into place.
    pub fn store(&self, path: &Path, params: &GridParameters, grid: &IsochroneGrid) -> Result<(), IsoError> {
        fs::create_dir_all(&self.dir)?;
        let bytes = encode(params, grid)?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Return a grid serving `requested`, building and storing one if needed.
    pub fn load_or_build<F>(
        &self,
        model: &ResolvedModel,
        surveys: &[Survey],
        filters: &[Filter],
        build: F,
    ) -> Result<(CachedGrid, CacheStatus), IsoError>
    where
        F: FnOnce() -> Result<IsochroneGrid, IsoError>,
    {
        let path = self.path(&Self::key(model, surveys));
        match self.lookup(&path, &model.params, filters) {
            Lookup::Hit(cached) => {
                info!(path = %path.display(), "using cached grid");
                Ok((cached, CacheStatus::Hit))
            }
            Lookup::Rebuild(reason) => {
                match &reason {
                    RebuildReason::Missing => info!(path = %path.display(), "{reason}, building"),
                    _ => warn!(path = %path.display(), "{reason}, rebuilding"),
                }
                let grid = build()?;
                self.store(&path, &model.params, &grid)?;
                let cached = CachedGrid {
                    params: model.params.clone(),
                    grid,
                };
                Ok((cached, CacheStatus::Rebuilt(reason)))
            }
        }
    }
}

fn encode(params: &GridParameters, grid: &IsochroneGrid) -> Result<Vec<u8>, IsoError> {
    let config = bincode::config::standard();
    let header = Header {
        magic: CACHE_MAGIC,
        schema_version: SCHEMA_VERSION,
    };
    let body = Body {
        params: params.clone(),
        grid: grid.clone(),
    };

    let mut bytes = bincode::serde::encode_to_vec(&header, config)
        .map_err(|e| IsoError::Encode(e.to_string()))?;
    let body = bincode::serde::encode_to_vec(&body, config)
        .map_err(|e| IsoError::Encode(e.to_string()))?;
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

fn decode(bytes: &[u8]) -> Result<Body, RebuildReason> {
    let config = bincode::config::standard();
    let (header, read): (Header, usize) = bincode::serde::decode_from_slice(bytes, config)
        .map_err(|e| RebuildReason::Unreadable(e.to_string()))?;
    if header.magic != CACHE_MAGIC {
        return Err(RebuildReason::Unreadable("bad magic".into()));
    }
    if header.schema_version != SCHEMA_VERSION {
        return Err(RebuildReason::SchemaMismatch {
            found: header.schema_version,
        });
    }

    let (body, used): (Body, usize) = bincode::serde::decode_from_slice(&bytes[read..], config)
        .map_err(|e| RebuildReason::Unreadable(e.to_string()))?;
    if read + used != bytes.len() {
        return Err(RebuildReason::Unreadable("trailing bytes".into()));
    }
    Ok(body)
}
