//! Options and numeric helpers shared by every `equals` implementation

use crate::config;

/// Controls how two objects are compared for equality.
///
/// Tolerances left as `None` fall back to [`config::atol`] and
/// [`config::rtol`] at comparison time.
#[derive(Debug, Clone, Default)]
pub struct EqualsOptions {
    pub atol: Option<f64>,
    pub rtol: Option<f64>,
    /// Log the reason for any inequality at `info` level
    pub verbose: bool,
    /// Property names omitted from the comparison
    pub ignore_properties: Vec<String>,
    /// Omit `_FillValue` and `missing_value` from the comparison
    pub ignore_fill_value: bool,
    /// Ignore data types of arrays (property types are always ignored)
    pub ignore_data_type: bool,
    /// Allow objects of different kinds to compare equal
    pub ignore_type: bool,
}

impl EqualsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn atol(mut self, atol: f64) -> Self {
        self.atol = Some(atol);
        self
    }

    pub fn rtol(mut self, rtol: f64) -> Self {
        self.rtol = Some(rtol);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn ignore_properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_properties.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn ignore_fill_value(mut self, ignore: bool) -> Self {
        self.ignore_fill_value = ignore;
        self
    }

    pub fn ignore_data_type(mut self, ignore: bool) -> Self {
        self.ignore_data_type = ignore;
        self
    }

    pub fn ignore_type(mut self, ignore: bool) -> Self {
        self.ignore_type = ignore;
        self
    }

    /// Resolved `(atol, rtol)` pair
    pub fn tolerances(&self) -> (f64, f64) {
        (
            self.atol.unwrap_or_else(config::atol),
            self.rtol.unwrap_or_else(config::rtol),
        )
    }

    /// Whether `name` is excluded from property comparison
    pub fn ignores_property(&self, name: &str) -> bool {
        (self.ignore_fill_value && (name == "_FillValue" || name == "missing_value"))
            || self.ignore_properties.iter().any(|p| p == name)
    }
}

/// `|x - y| <= atol + rtol * |y|`, with NaN equal to NaN.
pub fn is_close(x: f64, y: f64, atol: f64, rtol: f64) -> bool {
    if x.is_nan() || y.is_nan() {
        return x.is_nan() && y.is_nan();
    }
    if x == y {
        return true;
    }
    (x - y).abs() <= atol + rtol * y.abs()
}
