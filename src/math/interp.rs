//! Piecewise-linear interpolation with NaN-aware sampling.
//!
//! Samples whose value is NaN are dropped before interpolating. With fewer than
//! two valid samples nothing is produced. Targets outside the valid sample span
//! come back as NaN: there is no extrapolation.

/// Interpolate `(xs, ys)` at `targets`.
///
/// `xs` must be strictly increasing. Returns `None` if fewer than two samples
/// have a non-NaN `y`.
pub fn interp_valid(xs: &[f64], ys: &[f64], targets: &[f64]) -> Option<Vec<f64>> {
    let (vx, vy): (Vec<f64>, Vec<f64>) = xs
        .iter()
        .zip(ys)
        .filter(|(_, y)| !y.is_nan())
        .map(|(x, y)| (*x, *y))
        .unzip();

    if vx.len() < 2 {
        return None;
    }

    Some(targets.iter().map(|&t| interp_sorted(&vx, &vy, t)).collect())
}

/// Linear interpolation on sorted `xs`; NaN outside `[xs[0], xs[n-1]]`.
pub fn interp_sorted(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let n = xs.len();
    if n < 2 || !(x >= xs[0] && x <= xs[n - 1]) {
        return f64::NAN;
    }

    // First index with xs[hi] >= x.
    let hi = xs.partition_point(|&v| v < x);
    if hi == 0 {
        return ys[0];
    }
    let lo = hi - 1;
    let (x0, x1) = (xs[lo], xs[hi]);
    let (y0, y1) = (ys[lo], ys[hi]);
    let u = (x - x0) / (x1 - x0);
    y0 + u * (y1 - y0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_inside_and_hits_knots() {
        let xs = [1.0, 2.0, 4.0];
        let ys = [10.0, 20.0, 0.0];
        let out = interp_valid(&xs, &ys, &[1.0, 1.5, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(out, vec![10.0, 15.0, 20.0, 10.0, 0.0]);
    }

    #[test]
    fn no_extrapolation() {
        let out = interp_valid(&[1.0, 2.0], &[1.0, 2.0], &[0.5, 2.5]).unwrap();
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn nan_samples_are_skipped() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [1.0, f64::NAN, 3.0, f64::NAN];
        let out = interp_valid(&xs, &ys, &[2.0, 3.5]).unwrap();
        assert!((out[0] - 2.0).abs() < 1e-12);
        // 3.5 lies beyond the last valid sample (x=3).
        assert!(out[1].is_nan());
    }

    #[test]
    fn fewer_than_two_valid_samples_yields_nothing() {
        assert!(interp_valid(&[1.0, 2.0], &[f64::NAN, 5.0], &[1.5]).is_none());
        assert!(interp_valid(&[], &[], &[1.5]).is_none());
    }
}
