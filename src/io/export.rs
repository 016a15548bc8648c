//! Export per-star results to CSV and JSON.
//!
//! Both formats share one flat row type. Undetermined values (NaN) are written
//! as empty CSV cells and JSON `null`.

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::domain::{Channel, FateCode, StarFit};
use crate::error::IsoError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub id: String,
    pub mass: Option<f64>,
    pub age: Option<f64>,
    pub mass_std: Option<f64>,
    pub age_std: Option<f64>,
    #[serde(rename = "G-K_mass")]
    pub gk_mass: Option<f64>,
    #[serde(rename = "G-K_age")]
    pub gk_age: Option<f64>,
    #[serde(rename = "G-K_fate")]
    pub gk_fate: FateCode,
    #[serde(rename = "G-J_mass")]
    pub gj_mass: Option<f64>,
    #[serde(rename = "G-J_age")]
    pub gj_age: Option<f64>,
    #[serde(rename = "G-J_fate")]
    pub gj_fate: FateCode,
    #[serde(rename = "G-H_mass")]
    pub gh_mass: Option<f64>,
    #[serde(rename = "G-H_age")]
    pub gh_age: Option<f64>,
    #[serde(rename = "G-H_fate")]
    pub gh_fate: FateCode,
    #[serde(rename = "Gbp-Grp_mass")]
    pub bprp_mass: Option<f64>,
    #[serde(rename = "Gbp-Grp_age")]
    pub bprp_age: Option<f64>,
    #[serde(rename = "Gbp-Grp_fate")]
    pub bprp_fate: FateCode,
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

impl ResultRow {
    pub fn new(id: &str, fit: &StarFit) -> Self {
        let ch = |c: Channel| fit.channel(c);
        Self {
            id: id.to_string(),
            mass: finite(fit.mass),
            age: finite(fit.age),
            mass_std: fit.mass_std.and_then(finite),
            age_std: fit.age_std.and_then(finite),
            gk_mass: finite(ch(Channel::GK).mass),
            gk_age: finite(ch(Channel::GK).age),
            gk_fate: ch(Channel::GK).fate,
            gj_mass: finite(ch(Channel::GJ).mass),
            gj_age: finite(ch(Channel::GJ).age),
            gj_fate: ch(Channel::GJ).fate,
            gh_mass: finite(ch(Channel::GH).mass),
            gh_age: finite(ch(Channel::GH).age),
            gh_fate: ch(Channel::GH).fate,
            bprp_mass: finite(ch(Channel::BpRp).mass),
            bprp_age: finite(ch(Channel::BpRp).age),
            bprp_fate: ch(Channel::BpRp).fate,
        }
    }
}

pub fn result_rows(ids: &[String], fits: &[StarFit]) -> Vec<ResultRow> {
    ids.iter().zip(fits).map(|(id, fit)| ResultRow::new(id, fit)).collect()
}

/// Write per-star results to a CSV file.
pub fn write_results_csv(path: &Path, rows: &[ResultRow]) -> Result<(), IsoError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write per-star results as a pretty JSON array.
pub fn write_results_json(path: &Path, rows: &[ResultRow]) -> Result<(), IsoError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, rows)
        .map_err(|e| IsoError::Encode(format!("failed to write JSON '{}': {e}", path.display())))?;
    Ok(())
}
