//! Runtime settings and data-file search paths.
//!
//! Resolution order for each setting:
//! 1. environment (`.env` is loaded first via `dotenvy`)
//! 2. TOML config file passed with `--config`
//! 3. compiled defaults
//!
//! Settings are resolved once in `app::run` and handed to components; nothing
//! here keeps process-wide state.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::IsoError;

pub const ENV_DATA_DIRS: &str = "ISOAGES_DATA_DIRS";
pub const ENV_CACHE_DIR: &str = "ISOAGES_CACHE_DIR";

/// Ordered list of directories searched for track files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPaths {
    dirs: Vec<PathBuf>,
}

impl SearchPaths {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// First directory (in order) that contains `file_name`.
    pub fn find(&self, file_name: &str) -> Option<PathBuf> {
        self.dirs
            .iter()
            .map(|d| d.join(file_name))
            .find(|p| p.is_file())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directories holding raw track CSV files, searched in order.
    pub data_dirs: Vec<PathBuf>,
    /// Directory for grid cache artifacts.
    pub cache_dir: PathBuf,
    pub mass_steps: usize,
    pub age_steps: usize,
    pub max_phot_err: f64,
    pub binary_fraction: f64,
    pub monte_carlo_draws: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dirs: vec![PathBuf::from("isochrones")],
            cache_dir: PathBuf::from("isochrones"),
            mass_steps: 1000,
            age_steps: 500,
            max_phot_err: crate::photometry::MAX_PHOT_ERR,
            binary_fraction: 0.0,
            monte_carlo_draws: crate::fit::MC_DRAWS,
        }
    }
}

impl Settings {
    /// Load settings from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, IsoError> {
        dotenvy::dotenv().ok();

        let mut settings = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)?;
                Self::from_toml(&text)?
            }
            None => Settings::default(),
        };

        if let Ok(dirs) = std::env::var(ENV_DATA_DIRS) {
            settings.data_dirs = std::env::split_paths(&dirs).collect();
        }
        if let Ok(dir) = std::env::var(ENV_CACHE_DIR) {
            settings.cache_dir = PathBuf::from(dir);
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self, IsoError> {
        toml::from_str(text).map_err(|e| IsoError::Config(e.to_string()))
    }

    pub fn search_paths(&self) -> SearchPaths {
        SearchPaths::new(self.data_dirs.clone())
    }

    fn validate(&self) -> Result<(), IsoError> {
        if self.mass_steps < 2 || self.age_steps < 2 {
            return Err(IsoError::Config("mass_steps and age_steps must be >= 2".into()));
        }
        if !(self.max_phot_err.is_finite() && self.max_phot_err > 0.0) {
            return Err(IsoError::Config("max_phot_err must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.binary_fraction) {
            return Err(IsoError::Config("binary_fraction must lie in [0, 1]".into()));
        }
        if self.monte_carlo_draws < 2 {
            return Err(IsoError::Config("monte_carlo_draws must be >= 2".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let s = Settings::from_toml("mass_steps = 200\ndata_dirs = [\"/a\", \"/b\"]\n").unwrap();
        assert_eq!(s.mass_steps, 200);
        assert_eq!(s.age_steps, 500);
        assert_eq!(s.data_dirs, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(s.max_phot_err, 0.2);
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        assert!(matches!(
            Settings::from_toml("mass_steps = \"many\""),
            Err(IsoError::Config(_))
        ));
    }

    #[test]
    fn search_paths_return_first_match() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        std::fs::write(b.path().join("x.csv"), "m").unwrap();
        std::fs::write(a.path().join("y.csv"), "m").unwrap();
        std::fs::write(b.path().join("y.csv"), "m").unwrap();

        let paths = SearchPaths::new(vec![a.path().to_path_buf(), b.path().to_path_buf()]);
        assert_eq!(paths.find("x.csv"), Some(b.path().join("x.csv")));
        assert_eq!(paths.find("y.csv"), Some(a.path().join("y.csv")));
        assert_eq!(paths.find("z.csv"), None);
    }
}
