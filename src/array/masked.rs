//! Concrete array values with an optional missing-data mask

use super::index::{remove_axes, select_orthogonal};
use crate::errors::{CfError, Result};
use ndarray::{ArrayD, Dimension, IxDyn};

/// netCDF default fill value for doubles
pub const NC_FILL_DOUBLE: f64 = 9.969_209_968_386_869e36;

/// Element types that can live in a [`MaskedArray`]
pub trait Element: Clone + Send + Sync + std::fmt::Debug + 'static {
    /// Value stored under masked positions created by decompression
    fn fill() -> Self;
}

impl Element for f64 {
    fn fill() -> Self {
        NC_FILL_DOUBLE
    }
}

impl Element for String {
    fn fill() -> Self {
        String::new()
    }
}

/// An array plus a mask of the same shape (`true` marks a missing value).
///
/// A missing mask means nothing is masked.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedArray<T> {
    data: ArrayD<T>,
    mask: Option<ArrayD<bool>>,
}

impl<T: Element> MaskedArray<T> {
    pub fn new(data: ArrayD<T>) -> Self {
        Self { data, mask: None }
    }

    pub fn with_mask(data: ArrayD<T>, mask: ArrayD<bool>) -> Result<Self> {
        if data.shape() != mask.shape() {
            return Err(CfError::shape_mismatch(format!(
                "mask shape {:?} does not match data shape {:?}",
                mask.shape(),
                data.shape()
            )));
        }
        let mask = mask.iter().any(|&m| m).then_some(mask);
        Ok(Self { data, mask })
    }

    /// A fully masked array
    pub fn masked_all(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::from_elem(IxDyn(shape), T::fill()),
            mask: Some(ArrayD::from_elem(IxDyn(shape), true)),
        }
    }

    /// Mask every element for which `predicate` holds
    pub fn mask_where(mut self, predicate: impl Fn(&T) -> bool) -> Self {
        let extra = self.data.map(|v| predicate(v));
        let mask = match self.mask.take() {
            Some(mut mask) => {
                mask.zip_mut_with(&extra, |m, &e| *m |= e);
                mask
            }
            None => extra,
        };
        self.mask = mask.iter().any(|&m| m).then_some(mask);
        self
    }

    /// Apply `f` to every unmasked element
    pub fn map_unmasked(mut self, f: impl Fn(&T) -> T) -> Self {
        match &self.mask {
            None => self.data.mapv_inplace(|v| f(&v)),
            Some(mask) => self.data.zip_mut_with(mask, |v, &m| {
                if !m {
                    *v = f(v);
                }
            }),
        }
        self
    }

    pub fn data(&self) -> &ArrayD<T> {
        &self.data
    }

    pub fn mask(&self) -> Option<&ArrayD<bool>> {
        self.mask.as_ref()
    }

    pub fn into_parts(self) -> (ArrayD<T>, Option<ArrayD<bool>>) {
        (self.data, self.mask)
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// The mask, materialized as all-false when absent
    pub fn mask_or_unmasked(&self) -> ArrayD<bool> {
        self.mask
            .clone()
            .unwrap_or_else(|| ArrayD::from_elem(self.data.raw_dim(), false))
    }

    pub fn is_masked_at(&self, index: &[usize]) -> bool {
        self.mask
            .as_ref()
            .and_then(|m| m.get(IxDyn(index)).copied())
            .unwrap_or(false)
    }

    /// Unmasked value at `index`; `None` if masked or out of range
    pub fn value(&self, index: &[usize]) -> Option<&T> {
        if self.is_masked_at(index) {
            return None;
        }
        self.data.get(IxDyn(index))
    }

    pub fn count_masked(&self) -> usize {
        self.mask
            .as_ref()
            .map_or(0, |m| m.iter().filter(|&&v| v).count())
    }

    /// Data with masked elements replaced by `fill`
    pub fn filled(&self, fill: T) -> ArrayD<T> {
        match &self.mask {
            None => self.data.clone(),
            Some(mask) => {
                let mut out = self.data.clone();
                out.zip_mut_with(mask, |v, &m| {
                    if m {
                        *v = fill.clone();
                    }
                });
                out
            }
        }
    }

    pub fn select(&self, positions: &[Vec<usize>]) -> Self {
        Self {
            data: select_orthogonal(&self.data, positions),
            mask: self.mask.as_ref().map(|m| select_orthogonal(m, positions)),
        }
    }

    pub fn remove_axes(self, axes: &[usize]) -> Self {
        if axes.is_empty() {
            return self;
        }
        Self {
            data: remove_axes(self.data, axes),
            mask: self.mask.map(|m| remove_axes(m, axes)),
        }
    }
}

/// Build an array of `shape` whose elements are copied from `source` wherever
/// `locate` maps a result index to a source index. All other elements are
/// masked.
pub(crate) fn scatter_from<T: Element>(
    source: Option<&MaskedArray<T>>,
    shape: &[usize],
    locate: &dyn Fn(&[usize]) -> Option<Vec<usize>>,
) -> MaskedArray<T> {
    let mut data = ArrayD::from_elem(IxDyn(shape), T::fill());
    let mut mask = ArrayD::from_elem(IxDyn(shape), true);

    if let Some(source) = source {
        for ((index, value), masked) in data.indexed_iter_mut().zip(mask.iter_mut()) {
            if let Some(from) = locate(index.slice()) {
                if let Some(v) = source.data.get(IxDyn(&from)) {
                    *value = v.clone();
                    *masked = source.is_masked_at(&from);
                }
            }
        }
    }

    let mask = mask.iter().any(|&m| m).then_some(mask);
    MaskedArray { data, mask }
}

impl<T: Element> From<ArrayD<T>> for MaskedArray<T> {
    fn from(data: ArrayD<T>) -> Self {
        Self::new(data)
    }
}

/// Concrete values returned by every lazy array
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue {
    /// Numeric data, held as `f64` regardless of the storage type
    Numeric(MaskedArray<f64>),
    /// Fixed-width or variable-length strings
    Text(MaskedArray<String>),
}

impl ArrayValue {
    /// A fully masked array of the given kind
    pub fn masked_all(shape: &[usize], text: bool) -> Self {
        if text {
            Self::Text(MaskedArray::masked_all(shape))
        } else {
            Self::Numeric(MaskedArray::masked_all(shape))
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Numeric(a) => a.shape(),
            Self::Text(a) => a.shape(),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    pub fn as_numeric(&self) -> Option<&MaskedArray<f64>> {
        match self {
            Self::Numeric(a) => Some(a),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&MaskedArray<String>> {
        match self {
            Self::Text(a) => Some(a),
            Self::Numeric(_) => None,
        }
    }

    pub fn into_numeric(self) -> Result<MaskedArray<f64>> {
        match self {
            Self::Numeric(a) => Ok(a),
            Self::Text(_) => Err(CfError::UnsupportedType(
                "expected numeric data, found text".to_string(),
            )),
        }
    }

    pub fn count_masked(&self) -> usize {
        match self {
            Self::Numeric(a) => a.count_masked(),
            Self::Text(a) => a.count_masked(),
        }
    }

    pub fn select(&self, positions: &[Vec<usize>]) -> Self {
        match self {
            Self::Numeric(a) => Self::Numeric(a.select(positions)),
            Self::Text(a) => Self::Text(a.select(positions)),
        }
    }

    pub fn remove_axes(self, axes: &[usize]) -> Self {
        match self {
            Self::Numeric(a) => Self::Numeric(a.remove_axes(axes)),
            Self::Text(a) => Self::Text(a.remove_axes(axes)),
        }
    }
}

impl ArrayValue {
    /// [`scatter_from`] over either kind of value. `text` chooses the kind
    /// when there is no source.
    pub(crate) fn scatter(
        source: Option<&ArrayValue>,
        text: bool,
        shape: &[usize],
        locate: &dyn Fn(&[usize]) -> Option<Vec<usize>>,
    ) -> Self {
        match source {
            Some(Self::Numeric(a)) => Self::Numeric(scatter_from(Some(a), shape, locate)),
            Some(Self::Text(a)) => Self::Text(scatter_from(Some(a), shape, locate)),
            None => Self::masked_all(shape, text),
        }
    }
}

impl From<ArrayD<f64>> for ArrayValue {
    fn from(data: ArrayD<f64>) -> Self {
        Self::Numeric(MaskedArray::new(data))
    }
}

impl From<ArrayD<String>> for ArrayValue {
    fn from(data: ArrayD<String>) -> Self {
        Self::Text(MaskedArray::new(data))
    }
}

impl From<MaskedArray<f64>> for ArrayValue {
    fn from(data: MaskedArray<f64>) -> Self {
        Self::Numeric(data)
    }
}

impl From<MaskedArray<String>> for ArrayValue {
    fn from(data: MaskedArray<String>) -> Self {
        Self::Text(data)
    }
}
