//! Constructs composed from properties, data and bounds
//!
//! Each capability is a small trait ([`HasProperties`], [`HasData`],
//! [`HasBounds`], and the netCDF name traits). A [`Source`] advertises which
//! capabilities it has through accessor methods that default to `None`, and
//! [`Reconstruct::from_source`] builds a construct from whatever a source
//! offers. Copying is reconstruction from `self`.
//!
//! # Organization
//!
//! - [`properties_data`]: properties plus one data array
//! - [`properties_data_bounds`]: adds bounds, a cell type and ancillary arrays
//! - [`count`], [`list`]: the index tables of compressed arrays
//! - [`bounds`], [`coordinate`]: cell bounds and the coordinates that own them

pub mod bounds;
pub mod coordinate;
pub mod count;
pub mod list;
pub mod properties_data;
pub mod properties_data_bounds;

pub use bounds::Bounds;
pub use coordinate::{AuxiliaryCoordinate, DimensionCoordinate};
pub use count::Count;
pub use list::List;
pub use properties_data::PropertiesData;
pub use properties_data_bounds::PropertiesDataBounds;

use crate::data::Data;
use crate::equals::EqualsOptions;
use crate::errors::{CfError, Result};
use crate::properties::{Properties, PropertyValue};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of a construct, compared unless `ignore_type` is set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructKind {
    PropertiesData,
    PropertiesDataBounds,
    Count,
    List,
    Bounds,
    DimensionCoordinate,
    AuxiliaryCoordinate,
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Nature of the cells described by a coordinate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellType {
    Point,
    Interval,
    Other(String),
}

impl CellType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Point => "point",
            Self::Interval => "interval",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for CellType {
    fn from(s: &str) -> Self {
        match s {
            "point" => Self::Point,
            "interval" => Self::Interval,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Access to a construct's properties
pub trait HasProperties {
    fn properties(&self) -> &Properties;

    fn properties_mut(&mut self) -> &mut Properties;

    /// Name of the construct in property errors
    fn property_owner(&self) -> String {
        "Properties".to_string()
    }

    fn get_property(&self, name: &str) -> Result<&PropertyValue> {
        self.properties().get_property_for(name, || self.property_owner())
    }

    fn has_property(&self, name: &str) -> bool {
        self.properties().has_property(name)
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Option<PropertyValue> {
        self.properties_mut().set_property(name, value)
    }

    fn del_property(&mut self, name: &str) -> Option<PropertyValue> {
        self.properties_mut().del_property(name)
    }
}

/// Access to a construct's data
pub trait HasData {
    fn data(&self) -> Option<&Data>;

    fn data_mut(&mut self) -> Option<&mut Data>;

    /// Replace the data, returning the previous value
    fn set_data(&mut self, data: Data) -> Option<Data>;

    fn del_data(&mut self) -> Option<Data>;

    fn has_data(&self) -> bool {
        self.data().is_some()
    }

    /// The data, failing with [`CfError::ArrayNotSet`] when absent
    fn get_data(&self) -> Result<&Data> {
        self.data().ok_or(CfError::ArrayNotSet)
    }
}

/// Access to cell bounds, cell type and ancillary arrays
pub trait HasBounds {
    fn bounds(&self) -> Option<&Bounds>;

    /// Set without validation; see `validate` on the owning construct
    fn set_bounds(&mut self, bounds: Bounds) -> Option<Bounds>;

    fn del_bounds(&mut self) -> Option<Bounds>;

    fn has_bounds(&self) -> bool {
        self.bounds().is_some()
    }

    fn cell_type(&self) -> Option<&CellType>;

    fn set_cell_type(&mut self, cell_type: CellType) -> Option<CellType>;

    fn ancillaries(&self) -> &BTreeMap<String, Data>;

    fn set_ancillary(&mut self, name: &str, data: Data) -> Option<Data>;

    fn del_ancillary(&mut self, name: &str) -> Option<Data>;
}

/// netCDF variable name
pub trait NetCdfVariable {
    fn nc_variable(&self) -> Option<&str>;

    fn set_nc_variable(&mut self, name: &str) -> Option<String>;

    fn del_nc_variable(&mut self) -> Option<String>;
}

/// netCDF dimension name
pub trait NetCdfDimension {
    fn nc_dimension(&self) -> Option<&str>;

    fn set_nc_dimension(&mut self, name: &str) -> Option<String>;

    fn del_nc_dimension(&mut self) -> Option<String>;
}

/// netCDF sample dimension name of a ragged array's count
pub trait NetCdfSampleDimension {
    fn nc_sample_dimension(&self) -> Option<&str>;

    fn set_nc_sample_dimension(&mut self, name: &str) -> Option<String>;

    fn del_nc_sample_dimension(&mut self) -> Option<String>;
}

/// Capability accessors used to build one construct from another
pub trait Source {
    fn as_properties(&self) -> Option<&Properties> {
        None
    }

    fn as_data(&self) -> Option<&Data> {
        None
    }

    fn as_bounds(&self) -> Option<&dyn HasBounds> {
        None
    }

    fn as_nc_variable(&self) -> Option<&str> {
        None
    }

    fn as_nc_dimension(&self) -> Option<&str> {
        None
    }

    fn as_nc_sample_dimension(&self) -> Option<&str> {
        None
    }
}

/// Uniform copy-construction.
///
/// `from_source` pulls each constituent through its accessor; a capability the
/// source lacks leaves the field unset. With `copy` the data is duplicated,
/// otherwise it is shared with the source.
pub trait Reconstruct: Source + Sized {
    fn from_source(source: &dyn Source, copy: bool) -> Self;

    /// A deep copy
    fn copy(&self) -> Self {
        Self::from_source(self, true)
    }

    /// A copy whose data is duplicated only when `data` is set
    fn copy_with(&self, data: bool) -> Self {
        Self::from_source(self, data)
    }
}

/// A comparable construct
pub trait Construct: Source + fmt::Debug {
    fn kind(&self) -> ConstructKind;

    /// Never fails; differences are logged when `options.verbose` is set
    fn equals(&self, other: &dyn Construct, options: &EqualsOptions) -> bool {
        equals_constructs(self, other, options)
    }

    /// Identifiers in priority order, see [`Properties::names`]
    fn names(&self) -> Vec<String> {
        self.as_properties()
            .map(|p| p.names(self.as_nc_variable()))
            .unwrap_or_default()
    }

    fn name(&self, default: Option<&str>) -> Option<String> {
        match self.as_properties() {
            Some(p) => p.name(self.as_nc_variable(), default),
            None => default.map(str::to_string),
        }
    }
}

fn different(options: &EqualsOptions, message: impl fmt::Display) -> bool {
    if options.verbose {
        tracing::info!("{message}");
    }
    false
}

fn check_type<A, B>(a: &A, b: &B) -> Result<()>
where
    A: Construct + ?Sized,
    B: Construct + ?Sized,
{
    if a.kind() == b.kind() {
        Ok(())
    } else {
        Err(CfError::TypeMismatch {
            expected: a.kind().to_string(),
            found: b.kind().to_string(),
        })
    }
}

/// Compare kind, properties, data, then bounds, cell type and ancillaries,
/// stopping at the first difference.
pub fn equals_constructs<A, B>(a: &A, b: &B, options: &EqualsOptions) -> bool
where
    A: Construct + ?Sized,
    B: Construct + ?Sized,
{
    if !options.ignore_type {
        if let Err(e) = check_type(a, b) {
            return different(options, format!("{}: {e}", a.kind()));
        }
    }

    match (a.as_properties(), b.as_properties()) {
        (Some(x), Some(y)) if !x.equals(y, options) => {
            return different(options, format!("{}: Different properties", a.kind()));
        }
        (Some(_), None) | (None, Some(_)) => {
            return different(options, format!("{}: Different properties", a.kind()));
        }
        _ => {}
    }

    match (a.as_data(), b.as_data()) {
        (Some(x), Some(y)) if !x.equals(y, options) => {
            return different(options, format!("{}: Different data", a.kind()));
        }
        (Some(_), None) | (None, Some(_)) => {
            return different(options, format!("{}: Different data", a.kind()));
        }
        _ => {}
    }

    match (a.as_bounds(), b.as_bounds()) {
        (Some(x), Some(y)) => bounds_equal(a.kind(), x, y, options),
        (None, None) => true,
        _ => different(options, format!("{}: Different bounds", a.kind())),
    }
}

fn bounds_equal(
    kind: ConstructKind,
    x: &dyn HasBounds,
    y: &dyn HasBounds,
    options: &EqualsOptions,
) -> bool {
    match (x.bounds(), y.bounds()) {
        (Some(p), Some(q)) if !equals_constructs(p, q, options) => {
            return different(options, format!("{kind}: Different bounds"));
        }
        (Some(_), None) | (None, Some(_)) => {
            return different(options, format!("{kind}: Different bounds"));
        }
        _ => {}
    }

    if x.cell_type() != y.cell_type() {
        return different(
            options,
            format!(
                "{kind}: Different cell types: {:?}, {:?}",
                x.cell_type(),
                y.cell_type()
            ),
        );
    }

    let (p, q) = (x.ancillaries(), y.ancillaries());
    if !p.keys().eq(q.keys()) {
        return different(options, format!("{kind}: Different ancillaries"));
    }
    for (name, data) in p {
        if !q.get(name).is_some_and(|other| data.equals(other, options)) {
            return different(options, format!("{kind}: Different ancillary '{name}'"));
        }
    }
    true
}

/// Implement the property, data and netCDF variable traits of a wrapper by
/// delegating to an inner field that already implements them.
macro_rules! delegate_properties_data {
    ($ty:ty, $($field:ident).+) => {
        impl $crate::constructs::HasProperties for $ty {
            fn properties(&self) -> &$crate::properties::Properties {
                $crate::constructs::HasProperties::properties(&self.$($field).+)
            }

            fn properties_mut(&mut self) -> &mut $crate::properties::Properties {
                $crate::constructs::HasProperties::properties_mut(&mut self.$($field).+)
            }

            fn property_owner(&self) -> String {
                $crate::constructs::Construct::kind(self).to_string()
            }
        }

        impl $crate::constructs::HasData for $ty {
            fn data(&self) -> Option<&$crate::data::Data> {
                $crate::constructs::HasData::data(&self.$($field).+)
            }

            fn data_mut(&mut self) -> Option<&mut $crate::data::Data> {
                $crate::constructs::HasData::data_mut(&mut self.$($field).+)
            }

            fn set_data(&mut self, data: $crate::data::Data) -> Option<$crate::data::Data> {
                $crate::constructs::HasData::set_data(&mut self.$($field).+, data)
            }

            fn del_data(&mut self) -> Option<$crate::data::Data> {
                $crate::constructs::HasData::del_data(&mut self.$($field).+)
            }
        }

        impl $crate::constructs::NetCdfVariable for $ty {
            fn nc_variable(&self) -> Option<&str> {
                $crate::constructs::NetCdfVariable::nc_variable(&self.$($field).+)
            }

            fn set_nc_variable(&mut self, name: &str) -> Option<String> {
                $crate::constructs::NetCdfVariable::set_nc_variable(&mut self.$($field).+, name)
            }

            fn del_nc_variable(&mut self) -> Option<String> {
                $crate::constructs::NetCdfVariable::del_nc_variable(&mut self.$($field).+)
            }
        }
    };
}

/// Implement [`HasBounds`] by delegating to an inner field
macro_rules! delegate_bounds {
    ($ty:ty, $field:ident) => {
        impl $crate::constructs::HasBounds for $ty {
            fn bounds(&self) -> Option<&$crate::constructs::Bounds> {
                $crate::constructs::HasBounds::bounds(&self.$field)
            }

            fn set_bounds(
                &mut self,
                bounds: $crate::constructs::Bounds,
            ) -> Option<$crate::constructs::Bounds> {
                $crate::constructs::HasBounds::set_bounds(&mut self.$field, bounds)
            }

            fn del_bounds(&mut self) -> Option<$crate::constructs::Bounds> {
                $crate::constructs::HasBounds::del_bounds(&mut self.$field)
            }

            fn cell_type(&self) -> Option<&$crate::constructs::CellType> {
                $crate::constructs::HasBounds::cell_type(&self.$field)
            }

            fn set_cell_type(
                &mut self,
                cell_type: $crate::constructs::CellType,
            ) -> Option<$crate::constructs::CellType> {
                $crate::constructs::HasBounds::set_cell_type(&mut self.$field, cell_type)
            }

            fn ancillaries(&self) -> &std::collections::BTreeMap<String, $crate::data::Data> {
                $crate::constructs::HasBounds::ancillaries(&self.$field)
            }

            fn set_ancillary(
                &mut self,
                name: &str,
                data: $crate::data::Data,
            ) -> Option<$crate::data::Data> {
                $crate::constructs::HasBounds::set_ancillary(&mut self.$field, name, data)
            }

            fn del_ancillary(&mut self, name: &str) -> Option<$crate::data::Data> {
                $crate::constructs::HasBounds::del_ancillary(&mut self.$field, name)
            }
        }
    };
}

pub(crate) use delegate_bounds;
pub(crate) use delegate_properties_data;
