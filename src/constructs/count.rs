//! Count variables of contiguous ragged arrays
//!
//! A collection of features stored as a contiguous ragged array combines all
//! features along a single sample dimension, each feature occupying one
//! contiguous block. The count variable gives the size of each block.

use super::{
    delegate_properties_data, Construct, ConstructKind, HasData, NetCdfDimension,
    NetCdfSampleDimension, PropertiesData, Reconstruct, Source,
};
use crate::array::{DType, InMemoryArray};
use crate::data::Data;
use crate::errors::{CfError, Result};
use crate::properties::Properties;

/// The count required to uncompress a contiguous ragged array
#[derive(Debug, Clone, Default)]
pub struct Count {
    inner: PropertiesData,
    nc_dimension: Option<String>,
    nc_sample_dimension: Option<String>,
}

impl Count {
    pub fn new(properties: Properties, data: Option<Data>) -> Self {
        Self {
            inner: PropertiesData::new(properties, data),
            nc_dimension: None,
            nc_sample_dimension: None,
        }
    }

    /// Counts given directly, e.g. `Count::from_counts(&[3, 0, 2])`, held
    /// as `int32`
    pub fn from_counts(counts: &[usize]) -> Self {
        let values = counts.iter().map(|&n| n as f64).collect::<Vec<_>>();
        let data = Data::new(InMemoryArray::with_dtype(
            ndarray::Array1::from(values).into_dyn(),
            Some(DType::Int32),
        ));
        Self::new(Properties::new(), Some(data))
    }

    pub fn with_nc_variable(mut self, name: &str) -> Self {
        self.inner = self.inner.with_nc_variable(name);
        self
    }

    /// The size of each feature's block.
    ///
    /// Fails with [`CfError::CompressionIndex`] unless the data is a 1-D
    /// array of unmasked non-negative integers.
    pub fn counts(&self) -> Result<Vec<usize>> {
        non_negative_integers(self.get_data()?, "count")
    }
}

/// Read a 1-D index table such as a count or a list
pub(crate) fn non_negative_integers(data: &Data, what: &str) -> Result<Vec<usize>> {
    if data.ndim()? != 1 {
        return Err(CfError::compression(format!(
            "{what} data must be 1-dimensional, found shape {:?}",
            data.shape()?
        )));
    }
    if data.dtype().is_some_and(|d| d.is_text()) {
        return Err(CfError::compression(format!("{what} data must be numeric")));
    }

    let values = data.array()?.into_numeric()?;
    if values.count_masked() > 0 {
        return Err(CfError::compression(format!("{what} data has missing values")));
    }
    values
        .data()
        .iter()
        .map(|&v| {
            if v >= 0.0 && v.fract() == 0.0 && v <= usize::MAX as f64 {
                Ok(v as usize)
            } else {
                Err(CfError::compression(format!(
                    "{what} value {v} is not a non-negative integer"
                )))
            }
        })
        .collect()
}

delegate_properties_data!(Count, inner);

impl NetCdfDimension for Count {
    fn nc_dimension(&self) -> Option<&str> {
        self.nc_dimension.as_deref()
    }

    fn set_nc_dimension(&mut self, name: &str) -> Option<String> {
        self.nc_dimension.replace(name.to_string())
    }

    fn del_nc_dimension(&mut self) -> Option<String> {
        self.nc_dimension.take()
    }
}

impl NetCdfSampleDimension for Count {
    fn nc_sample_dimension(&self) -> Option<&str> {
        self.nc_sample_dimension.as_deref()
    }

    fn set_nc_sample_dimension(&mut self, name: &str) -> Option<String> {
        self.nc_sample_dimension.replace(name.to_string())
    }

    fn del_nc_sample_dimension(&mut self) -> Option<String> {
        self.nc_sample_dimension.take()
    }
}

impl Source for Count {
    fn as_properties(&self) -> Option<&Properties> {
        self.inner.as_properties()
    }

    fn as_data(&self) -> Option<&Data> {
        self.inner.as_data()
    }

    fn as_nc_variable(&self) -> Option<&str> {
        self.inner.as_nc_variable()
    }

    fn as_nc_dimension(&self) -> Option<&str> {
        self.nc_dimension.as_deref()
    }

    fn as_nc_sample_dimension(&self) -> Option<&str> {
        self.nc_sample_dimension.as_deref()
    }
}

impl Reconstruct for Count {
    fn from_source(source: &dyn Source, copy: bool) -> Self {
        Self {
            inner: PropertiesData::from_source(source, copy),
            nc_dimension: source.as_nc_dimension().map(str::to_string),
            nc_sample_dimension: source.as_nc_sample_dimension().map(str::to_string),
        }
    }
}

impl Construct for Count {
    fn kind(&self) -> ConstructKind {
        ConstructKind::Count
    }
}
