use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{Filter, Model};

/// Errors raised by the library layers (grid, photometry, io, config).
///
/// Soft data problems (too few interpolation samples, failed quality cuts,
/// stars without usable photometry) are not errors: they surface as NaN values
/// and fate codes instead.
#[derive(Debug, Error)]
pub enum IsoError {
    #[error("invalid {what} range [{min}, {max}]: must be finite, positive, and increasing")]
    InvalidRange { what: &'static str, min: f64, max: f64 },

    #[error("{what} steps must be >= 2 (got {steps})")]
    InvalidSteps { what: &'static str, steps: usize },

    #[error("model '{}' has no native column for filter '{}'", model.name(), filter.label())]
    UnmappedFilter { model: Model, filter: Filter },

    #[error("track file '{}' has no column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("track file '{file}' not found in any search directory")]
    TrackNotFound { file: String },

    #[error("malformed track file '{}': {message}", path.display())]
    MalformedTrack { path: PathBuf, message: String },

    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("invalid catalog: {0}")]
    Catalog(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("cache encoding error: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl IsoError {
    /// Exit code used when the error reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            IsoError::InvalidRange { .. }
            | IsoError::InvalidSteps { .. }
            | IsoError::UnmappedFilter { .. }
            | IsoError::MissingColumn { .. }
            | IsoError::TrackNotFound { .. }
            | IsoError::MalformedTrack { .. }
            | IsoError::Catalog(_)
            | IsoError::Config(_)
            | IsoError::Io(_)
            | IsoError::Csv(_) => 2,
            IsoError::Shape(_) => 3,
            IsoError::Encode(_) => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<IsoError> for AppError {
    fn from(err: IsoError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
