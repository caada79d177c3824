//! Coordinate constructs

use super::{
    delegate_bounds, delegate_properties_data, Bounds, Construct, ConstructKind, HasBounds,
    PropertiesDataBounds, Reconstruct, Source,
};
use crate::data::Data;
use crate::errors::Result;
use crate::properties::Properties;

macro_rules! coordinate {
    ($(#[$doc:meta])* $name:ident, $kind:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default)]
        pub struct $name {
            inner: PropertiesDataBounds,
        }

        impl $name {
            pub fn new(properties: Properties, data: Option<Data>, bounds: Option<Bounds>) -> Self {
                Self {
                    inner: PropertiesDataBounds::new(properties, data, bounds),
                }
            }

            pub fn with_nc_variable(mut self, name: &str) -> Self {
                self.inner = self.inner.with_nc_variable(name);
                self
            }

            /// See [`PropertiesDataBounds::validate`]
            pub fn validate(&self) -> Result<()> {
                self.inner.validate()
            }
        }

        delegate_properties_data!($name, inner);
        delegate_bounds!($name, inner);

        impl Source for $name {
            fn as_properties(&self) -> Option<&Properties> {
                self.inner.as_properties()
            }

            fn as_data(&self) -> Option<&Data> {
                self.inner.as_data()
            }

            fn as_bounds(&self) -> Option<&dyn HasBounds> {
                Some(self)
            }

            fn as_nc_variable(&self) -> Option<&str> {
                self.inner.as_nc_variable()
            }
        }

        impl Reconstruct for $name {
            fn from_source(source: &dyn Source, copy: bool) -> Self {
                Self {
                    inner: PropertiesDataBounds::from_source(source, copy),
                }
            }
        }

        impl Construct for $name {
            fn kind(&self) -> ConstructKind {
                ConstructKind::$kind
            }
        }
    };
}

coordinate!(
    /// A one-dimensional coordinate of a domain axis, with optional bounds
    DimensionCoordinate,
    DimensionCoordinate
);

coordinate!(
    /// A coordinate of one or more domain axes that is not a dimension
    /// coordinate, such as a station's latitude
    AuxiliaryCoordinate,
    AuxiliaryCoordinate
);
