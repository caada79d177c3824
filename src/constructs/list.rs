//! List variables of gathered arrays

use super::count::non_negative_integers;
use super::{
    delegate_properties_data, Construct, ConstructKind, HasData, PropertiesData, Reconstruct,
    Source,
};
use crate::data::Data;
use crate::errors::Result;
use crate::properties::Properties;

/// The list required to uncompress a gathered array.
///
/// Each element is the row-major flat index, over the gathered dimensions,
/// of one stored point.
#[derive(Debug, Clone, Default)]
pub struct List {
    inner: PropertiesData,
}

impl List {
    pub fn new(properties: Properties, data: Option<Data>) -> Self {
        Self {
            inner: PropertiesData::new(properties, data),
        }
    }

    pub fn from_indices(indices: &[usize]) -> Self {
        let values = indices.iter().map(|&i| i as f64).collect::<Vec<_>>();
        let data = Data::from_f64(ndarray::Array1::from(values).into_dyn());
        Self::new(Properties::new(), Some(data))
    }

    pub fn with_nc_variable(mut self, name: &str) -> Self {
        self.inner = self.inner.with_nc_variable(name);
        self
    }

    /// Flat indices of the stored points
    pub fn indices(&self) -> Result<Vec<usize>> {
        non_negative_integers(self.get_data()?, "list")
    }
}

delegate_properties_data!(List, inner);

impl Source for List {
    fn as_properties(&self) -> Option<&Properties> {
        self.inner.as_properties()
    }

    fn as_data(&self) -> Option<&Data> {
        self.inner.as_data()
    }

    fn as_nc_variable(&self) -> Option<&str> {
        self.inner.as_nc_variable()
    }
}

impl Reconstruct for List {
    fn from_source(source: &dyn Source, copy: bool) -> Self {
        Self {
            inner: PropertiesData::from_source(source, copy),
        }
    }
}

impl Construct for List {
    fn kind(&self) -> ConstructKind {
        ConstructKind::List
    }
}
