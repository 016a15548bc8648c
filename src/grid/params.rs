//! Model parameter resolution.
//!
//! Each model is computed on a handful of discrete parameter values. A request
//! is snapped to the nearest available value per parameter, and the snapped
//! values name the track files (the "model code") and form the grid identity.

use crate::domain::{GridParameters, GridRequest, Model};

const MIST_FEH: [f64; 15] = [
    -4.0, -3.5, -3.0, -2.5, -2.0, -1.75, -1.5, -1.25, -1.0, -0.75, -0.5, -0.25, 0.0, 0.25, 0.5,
];
const MIST_AFE: [f64; 1] = [0.0];
const MIST_VCRIT: [f64; 2] = [0.0, 0.4];
const PARSEC_FEH: [f64; 1] = [0.0];
const AMARD_FEH: [f64; 7] = [-0.813, -0.336, -0.211, -0.114, 0.0, 0.165, 0.301];
const AMARD_VCRIT: [f64; 4] = [0.0, 0.2, 0.4, 0.6];
const SPOTS_FSPOT: [f64; 6] = [0.0, 0.17, 0.34, 0.51, 0.68, 0.85];
const DARTMOUTH_FEH: [f64; 1] = [0.0];
const DARTMOUTH_AFE: [f64; 1] = [0.0];

/// A request resolved against a model's available parameter values.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModel {
    /// Base name of the model's track files, e.g. `mist_p0.00_p0.0_p0.4`.
    pub code: String,
    pub params: GridParameters,
}

/// Snap the request's parameters and derive the model code.
pub fn resolve_model(request: &GridRequest) -> ResolvedModel {
    let model = request.model;
    let mut params = GridParameters {
        model,
        feh: 0.0,
        afe: 0.0,
        v_vcrit: 0.0,
        fspot: 0.0,
        magnetic: false,
        mass_range: request.mass_range,
        age_range: request.age_range,
    };

    let mut code = model.name().to_string();
    match model {
        Model::Mist => {
            params.feh = nearest(&MIST_FEH, request.feh);
            params.afe = nearest(&MIST_AFE, request.afe);
            params.v_vcrit = nearest(&MIST_VCRIT, request.v_vcrit);
            code.push_str(&signed_tag(params.feh, 2));
            code.push_str(&signed_tag(params.afe, 1));
            code.push_str(&signed_tag(params.v_vcrit, 1));
        }
        Model::Parsec => {
            params.feh = nearest(&PARSEC_FEH, request.feh);
            code.push_str(&signed_tag(params.feh, 2));
        }
        Model::Amard => {
            params.feh = nearest(&AMARD_FEH, request.feh);
            params.v_vcrit = nearest(&AMARD_VCRIT, request.v_vcrit);
            code.push_str(&signed_tag(params.feh, 2));
            code.push_str(&signed_tag(params.v_vcrit, 1));
        }
        Model::Spots => {
            params.fspot = nearest(&SPOTS_FSPOT, request.fspot);
            code.push_str(&format!("_p{:.2}", params.fspot.abs()));
        }
        Model::Dartmouth => {
            params.feh = nearest(&DARTMOUTH_FEH, request.feh);
            params.afe = nearest(&DARTMOUTH_AFE, request.afe);
            params.magnetic = request.magnetic;
            code.push_str(&signed_tag(params.feh, 2));
            code.push_str(&signed_tag(params.afe, 1));
            code.push_str(if params.magnetic { "_mag" } else { "_nomag" });
        }
        Model::BtSettl | Model::AmesCond | Model::AmesDusty | Model::Bhac15 => {}
    }

    ResolvedModel { code, params }
}

/// Nearest available value; a missing request means 0.0.
fn nearest(values: &[f64], requested: Option<f64>) -> f64 {
    let Some(target) = requested else {
        return 0.0;
    };
    let mut best = values[0];
    for &v in &values[1..] {
        if (v - target).abs() < (best - target).abs() {
            best = v;
        }
    }
    best
}

/// `_m0.50` / `_p0.25` style tag.
fn signed_tag(value: f64, decimals: usize) -> String {
    let sign = if value < 0.0 { 'm' } else { 'p' };
    format!("_{sign}{:.*}", decimals, value.abs())
}
