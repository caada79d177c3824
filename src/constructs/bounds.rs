//! Cell bounds of a coordinate

use super::{
    delegate_properties_data, Construct, ConstructKind, PropertiesData, Reconstruct, Source,
};
use crate::data::Data;
use crate::properties::Properties;

/// Cell bounds. The data has the coordinate's shape plus one trailing
/// dimension for the vertices of each cell.
#[derive(Debug, Clone, Default)]
pub struct Bounds {
    inner: PropertiesData,
}

impl Bounds {
    pub fn new(properties: Properties, data: Option<Data>) -> Self {
        Self {
            inner: PropertiesData::new(properties, data),
        }
    }

    pub fn with_nc_variable(mut self, name: &str) -> Self {
        self.inner = self.inner.with_nc_variable(name);
        self
    }
}

delegate_properties_data!(Bounds, inner);

impl Source for Bounds {
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

impl Reconstruct for Bounds {
    fn from_source(source: &dyn Source, copy: bool) -> Self {
        Self {
            inner: PropertiesData::from_source(source, copy),
        }
    }
}

impl Construct for Bounds {
    fn kind(&self) -> ConstructKind {
        ConstructKind::Bounds
    }
}
