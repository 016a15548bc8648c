//! Small NaN-aware reductions used by the estimators.

use nalgebra::DMatrix;

/// Mean of the non-NaN values; NaN if there are none.
pub fn nan_mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

/// Sample standard deviation (N-1 denominator); NaN with fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (ss / (n as f64 - 1.0)).sqrt()
}

/// Minimum of a matrix ignoring NaN cells, with its `(row, col)` index.
///
/// Cells are visited in row-major order and ties keep the first occurrence,
/// matching a flattened `(mass, age)` scan. Infinite values take part in the
/// comparison. Returns `None` if every cell is NaN.
pub fn nan_argmin(m: &DMatrix<f64>) -> Option<(f64, (usize, usize))> {
    let mut best: Option<(f64, (usize, usize))> = None;
    for i in 0..m.nrows() {
        for j in 0..m.ncols() {
            let v = m[(i, j)];
            if v.is_nan() {
                continue;
            }
            match best {
                Some((b, _)) if v >= b => {}
                _ => best = Some((v, (i, j))),
            }
        }
    }
    best
}

/// Row of column `col` whose value is closest to `target`, with the signed
/// difference `m[(row, col)] - target`. NaN cells are skipped; the first
/// occurrence wins ties.
pub fn closest_in_column(m: &DMatrix<f64>, col: usize, target: f64) -> Option<(f64, usize)> {
    let mut best: Option<(f64, usize)> = None;
    for i in 0..m.nrows() {
        let d = m[(i, col)] - target;
        if d.is_nan() {
            continue;
        }
        match best {
            Some((b, _)) if d.abs() >= b.abs() => {}
            _ => best = Some((d, i)),
        }
    }
    best
}

/// `(min, max)` of the non-NaN values, if any.
pub fn nan_min_max(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
