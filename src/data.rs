//! The data container wrapping a single lazy array

use crate::array::{
    ArrayValue, Compression, CompressionType, DType, Element, Indexer, InMemoryArray, LazyArray,
    MaskedArray,
};
use crate::constructs::{Count, List};
use crate::equals::{is_close, EqualsOptions};
use crate::errors::{CfError, Result};
use ndarray::ArrayD;
use rayon::prelude::*;
use std::sync::Arc;

/// Holds at most one lazy array backing.
///
/// Cloning a `Data` shares its backing; [`Data::copy`] with `data = true`
/// duplicates it.
#[derive(Debug, Clone, Default)]
pub struct Data {
    array: Option<Arc<dyn LazyArray>>,
}

impl Data {
    pub fn new(array: impl LazyArray + 'static) -> Self {
        Self {
            array: Some(Arc::new(array)),
        }
    }

    pub fn from_arc(array: Arc<dyn LazyArray>) -> Self {
        Self { array: Some(array) }
    }

    /// In-memory data from concrete values
    pub fn from_array(values: impl Into<ArrayValue>) -> Self {
        Self::new(InMemoryArray::new(values))
    }

    pub fn from_f64(values: ArrayD<f64>) -> Self {
        Self::from_array(values)
    }

    fn backing(&self) -> Result<&Arc<dyn LazyArray>> {
        self.array.as_ref().ok_or(CfError::ArrayNotSet)
    }

    pub fn shape(&self) -> Result<&[usize]> {
        Ok(self.backing()?.shape())
    }

    /// Element type; `None` when unset or unknown
    pub fn dtype(&self) -> Option<DType> {
        self.array.as_ref().and_then(|a| a.dtype())
    }

    pub fn ndim(&self) -> Result<usize> {
        Ok(self.backing()?.ndim())
    }

    pub fn size(&self) -> Result<usize> {
        Ok(self.backing()?.size())
    }

    /// Read the elements selected by `index`
    pub fn get(&self, index: &Indexer) -> Result<ArrayValue> {
        self.backing()?.fetch(index)
    }

    /// Every element
    pub fn array(&self) -> Result<ArrayValue> {
        self.get(&Indexer::All)
    }

    /// The backing itself
    pub fn backing_array(&self) -> Option<&Arc<dyn LazyArray>> {
        self.array.as_ref()
    }

    pub fn set_array(&mut self, array: impl LazyArray + 'static) {
        self.array = Some(Arc::new(array));
    }

    pub fn has_array(&self) -> bool {
        self.array.is_some()
    }

    pub fn del_array(&mut self) -> Option<Arc<dyn LazyArray>> {
        self.array.take()
    }

    /// A new container. With `data` the backing is duplicated, otherwise the
    /// copy shares it.
    pub fn copy(&self, data: bool) -> Self {
        Self {
            array: match &self.array {
                Some(array) if data => Some(array.duplicate()),
                other => other.clone(),
            },
        }
    }

    /// Replace the backing by a fully realized in-memory one
    pub fn to_memory(&mut self) -> Result<()> {
        let memory = self.backing()?.to_memory()?;
        self.array = Some(Arc::new(memory));
        Ok(())
    }

    pub fn compression_type(&self) -> Option<CompressionType> {
        self.array
            .as_ref()
            .and_then(|a| a.compression())
            .map(|c| c.compression_type())
    }

    /// The count of a contiguous ragged backing
    pub fn count(&self) -> Option<&Count> {
        match self.array.as_ref()?.compression()? {
            Compression::RaggedContiguous { count, .. } => Some(count),
            Compression::Gathered { .. } => None,
        }
    }

    /// The list of a gathered backing
    pub fn list(&self) -> Option<&List> {
        match self.array.as_ref()?.compression()? {
            Compression::Gathered { list, .. } => Some(list),
            Compression::RaggedContiguous { .. } => None,
        }
    }

    /// The compressed data underneath a compressed backing
    pub fn compressed_array(&self) -> Option<&Data> {
        self.array
            .as_ref()?
            .compression()
            .map(|c| c.compressed())
    }

    /// Compare shapes, data types, masks and values within tolerance.
    ///
    /// Never fails. Read errors count as inequality and are logged.
    pub fn equals(&self, other: &Data, options: &EqualsOptions) -> bool {
        let (a, b) = match (&self.array, &other.array) {
            (None, None) => return true,
            (Some(a), Some(b)) => (a, b),
            _ => {
                return different(options, "Data: one array is missing".to_string());
            }
        };

        if a.shape() != b.shape() {
            return different(
                options,
                format!("Data: Different shapes: {:?}, {:?}", a.shape(), b.shape()),
            );
        }

        if !options.ignore_data_type && a.dtype() != b.dtype() {
            return different(
                options,
                format!("Data: Different data types: {:?}, {:?}", a.dtype(), b.dtype()),
            );
        }

        let values = a.fetch(&Indexer::All).and_then(|x| Ok((x, b.fetch(&Indexer::All)?)));
        let (x, y) = match values {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!("Data: could not read values for comparison: {e}");
                return false;
            }
        };

        match (&x, &y) {
            (ArrayValue::Numeric(x), ArrayValue::Numeric(y)) => numeric_equal(x, y, options),
            (ArrayValue::Text(x), ArrayValue::Text(y)) => text_equal(x, y, options),
            _ => different(options, "Data: Different kinds of values".to_string()),
        }
    }
}

fn different(options: &EqualsOptions, message: String) -> bool {
    if options.verbose {
        tracing::info!("{message}");
    }
    false
}

fn masks_equal<T: Element>(
    x: &MaskedArray<T>,
    y: &MaskedArray<T>,
    options: &EqualsOptions,
) -> bool {
    if x.mask_or_unmasked() != y.mask_or_unmasked() {
        return different(options, "Data: Different masks".to_string());
    }
    true
}

fn numeric_equal(x: &MaskedArray<f64>, y: &MaskedArray<f64>, options: &EqualsOptions) -> bool {
    if !masks_equal(x, y, options) {
        return false;
    }

    let (atol, rtol) = options.tolerances();
    let mask: Vec<bool> = x.mask_or_unmasked().iter().copied().collect();
    let xs: Vec<f64> = x.data().iter().copied().collect();
    let ys: Vec<f64> = y.data().iter().copied().collect();

    let equal = (0..xs.len())
        .into_par_iter()
        .all(|i| mask[i] || is_close(xs[i], ys[i], atol, rtol));
    if !equal {
        return different(options, "Data: Different array values".to_string());
    }
    true
}

fn text_equal(
    x: &MaskedArray<String>,
    y: &MaskedArray<String>,
    options: &EqualsOptions,
) -> bool {
    if !masks_equal(x, y, options) {
        return false;
    }

    let equal = x
        .data()
        .iter()
        .zip(y.data().iter())
        .zip(x.mask_or_unmasked().iter())
        .all(|((a, b), &masked)| masked || a == b);
    if !equal {
        return different(options, "Data: Different array values".to_string());
    }
    true
}
