//! Arrays whose values are already in memory

use super::{ArrayValue, DType, Indexer, LazyArray};
use crate::errors::Result;
use ndarray::ArrayD;
use std::sync::Arc;

/// A fully realized array
#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryArray {
    values: ArrayValue,
    dtype: Option<DType>,
}

impl InMemoryArray {
    /// Wrap values, inferring `float64` for numbers and `str` for text
    pub fn new(values: impl Into<ArrayValue>) -> Self {
        let values = values.into();
        let dtype = Some(if values.is_text() {
            DType::Str
        } else {
            DType::Float64
        });
        Self { values, dtype }
    }

    /// Wrap values that keep the data type of the array they came from
    pub fn with_dtype(values: impl Into<ArrayValue>, dtype: Option<DType>) -> Self {
        Self {
            values: values.into(),
            dtype,
        }
    }

    pub fn from_f64(data: ArrayD<f64>) -> Self {
        Self::new(data)
    }

    pub fn values(&self) -> &ArrayValue {
        &self.values
    }

    pub fn into_values(self) -> ArrayValue {
        self.values
    }
}

impl LazyArray for InMemoryArray {
    fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    fn dtype(&self) -> Option<DType> {
        self.dtype
    }

    fn fetch(&self, index: &Indexer) -> Result<ArrayValue> {
        if matches!(index, Indexer::All) {
            return Ok(self.values.clone());
        }
        let resolved = index.resolve(self.shape())?;
        Ok(self
            .values
            .select(&resolved.positions)
            .remove_axes(&resolved.dropped))
    }

    fn to_memory(&self) -> Result<InMemoryArray> {
        Ok(self.clone())
    }

    fn duplicate(&self) -> Arc<dyn LazyArray> {
        Arc::new(self.clone())
    }
}
