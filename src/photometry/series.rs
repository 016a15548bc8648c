//! Typed per-star containers.
//!
//! `ScalarSeries` holds one value per star (parallax, E(B-V), excess factor).
//! `FilterMatrix` holds one value per `(star, filter)`. Operations that make
//! sense for only one of them live on that type alone.

use nalgebra::DMatrix;

use crate::domain::Filter;
use crate::error::IsoError;

/// One value per star, in catalog order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarSeries(Vec<f64>);

impl ScalarSeries {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// `n` copies of `value` (a scalar broadcast to the whole catalog).
    pub fn constant(n: usize, value: f64) -> Self {
        Self(vec![value; n])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, star: usize) -> f64 {
        self.0.get(star).copied().unwrap_or(f64::NAN)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub(crate) fn expect_len(&self, n: usize, what: &str) -> Result<(), IsoError> {
        if self.0.len() != n {
            return Err(IsoError::Shape(format!(
                "{what} has {} values for {n} stars",
                self.0.len()
            )));
        }
        Ok(())
    }
}

impl From<Vec<f64>> for ScalarSeries {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// `stars × filters` values with labelled columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterMatrix {
    filters: Vec<Filter>,
    values: DMatrix<f64>,
}

impl FilterMatrix {
    pub fn new(filters: Vec<Filter>, values: DMatrix<f64>) -> Result<Self, IsoError> {
        if values.ncols() != filters.len() {
            return Err(IsoError::Shape(format!(
                "{} filter labels for {} columns",
                filters.len(),
                values.ncols()
            )));
        }
        for (i, f) in filters.iter().enumerate() {
            if filters[..i].contains(f) {
                return Err(IsoError::Shape(format!("duplicate filter column {}", f.label())));
            }
        }
        Ok(Self { filters, values })
    }

    /// All-`value` matrix.
    pub fn filled(n_stars: usize, filters: Vec<Filter>, value: f64) -> Self {
        let values = DMatrix::from_element(n_stars, filters.len(), value);
        Self { filters, values }
    }

    pub fn n_stars(&self) -> usize {
        self.values.nrows()
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn column_index(&self, filter: Filter) -> Option<usize> {
        self.filters.iter().position(|f| *f == filter)
    }

    /// Value at `(star, filter)`; NaN if the filter is not a column.
    pub fn get(&self, star: usize, filter: Filter) -> f64 {
        match self.column_index(filter) {
            Some(c) if star < self.values.nrows() => self.values[(star, c)],
            _ => f64::NAN,
        }
    }

    /// Set `(star, filter)`; ignored if the filter is not a column.
    pub fn set(&mut self, star: usize, filter: Filter, value: f64) {
        if let Some(c) = self.column_index(filter) {
            self.values[(star, c)] = value;
        }
    }

    pub(crate) fn same_layout(&self, other: &FilterMatrix, what: &str) -> Result<(), IsoError> {
        if self.filters != other.filters || self.values.shape() != other.values.shape() {
            return Err(IsoError::Shape(format!(
                "{what}: {}x{} vs {}x{}",
                self.values.nrows(),
                self.values.ncols(),
                other.values.nrows(),
                other.values.ncols()
            )));
        }
        Ok(())
    }
}

/// Magnitude and error of one band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandValue {
    pub mag: f64,
    pub err: f64,
}

impl BandValue {
    pub const MISSING: BandValue = BandValue {
        mag: f64::NAN,
        err: f64::NAN,
    };
}

/// One star's normalised photometry, keyed by filter.
#[derive(Debug, Clone, PartialEq)]
pub struct StarPhotometry {
    bands: Vec<(Filter, BandValue)>,
}

impl StarPhotometry {
    pub fn new(bands: Vec<(Filter, BandValue)>) -> Self {
        Self { bands }
    }

    /// The band's value, or `BandValue::MISSING` if absent.
    pub fn band(&self, filter: Filter) -> BandValue {
        self.bands
            .iter()
            .find(|(f, _)| *f == filter)
            .map(|(_, b)| *b)
            .unwrap_or(BandValue::MISSING)
    }

    pub fn bands(&self) -> &[(Filter, BandValue)] {
        &self.bands
    }

    /// Values in the order of `filters`, missing ones as NaN.
    pub fn select<const N: usize>(&self, filters: [Filter; N]) -> [BandValue; N] {
        filters.map(|f| self.band(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_filters_read_as_nan() {
        let m = FilterMatrix::new(
            vec![Filter::G, Filter::K],
            DMatrix::from_row_slice(2, 2, &[10.0, 8.0, 11.0, 9.0]),
        )
        .unwrap();
        assert_eq!(m.get(1, Filter::K), 9.0);
        assert!(m.get(0, Filter::J).is_nan());
        assert!(m.get(5, Filter::G).is_nan());
    }

    #[test]
    fn rejects_label_count_mismatch() {
        let err = FilterMatrix::new(vec![Filter::G], DMatrix::zeros(3, 2));
        assert!(matches!(err, Err(IsoError::Shape(_))));
    }

    #[test]
    fn star_select_keeps_requested_order() {
        let star = StarPhotometry::new(vec![
            (Filter::K, BandValue { mag: 8.0, err: 0.02 }),
            (Filter::G, BandValue { mag: 10.0, err: 0.01 }),
        ]);
        let [g, j, k] = star.select([Filter::G, Filter::J, Filter::K]);
        assert_eq!(g.mag, 10.0);
        assert!(j.mag.is_nan());
        assert_eq!(k.err, 0.02);
    }
}
