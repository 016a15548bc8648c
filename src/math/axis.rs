//! Target axis generation for the isochrone grid.
//!
//! Both helpers pin the endpoints to the requested bounds exactly so a grid
//! always spans its requested range, whatever the rounding of the interior
//! points.

use crate::error::IsoError;

/// `steps` linearly spaced points between `min` and `max` (inclusive).
pub fn lin_space(min: f64, max: f64, steps: usize, what: &'static str) -> Result<Vec<f64>, IsoError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > min) {
        return Err(IsoError::InvalidRange { what, min, max });
    }
    if steps < 2 {
        return Err(IsoError::InvalidSteps { what, steps });
    }

    let step = (max - min) / (steps as f64 - 1.0);
    let mut out: Vec<f64> = (0..steps).map(|i| min + step * i as f64).collect();
    out[steps - 1] = max;
    Ok(out)
}

/// `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize, what: &'static str) -> Result<Vec<f64>, IsoError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > min) {
        return Err(IsoError::InvalidRange { what, min, max });
    }
    if steps < 2 {
        return Err(IsoError::InvalidSteps { what, steps });
    }

    let ln_min = min.ln();
    let ln_max = max.ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);

    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push((ln_min + step * i as f64).exp());
    }
    out[0] = min;
    out[steps - 1] = max;
    Ok(out)
}
