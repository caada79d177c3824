//! A construct with properties and one data array

use super::{
    Construct, ConstructKind, HasData, HasProperties, NetCdfVariable, Reconstruct, Source,
};
use crate::data::Data;
use crate::properties::Properties;

/// Properties, optional data and an optional netCDF variable name
#[derive(Debug, Clone, Default)]
pub struct PropertiesData {
    properties: Properties,
    data: Option<Data>,
    nc_variable: Option<String>,
}

impl PropertiesData {
    pub fn new(properties: Properties, data: Option<Data>) -> Self {
        Self {
            properties,
            data,
            nc_variable: None,
        }
    }

    pub fn with_nc_variable(mut self, name: &str) -> Self {
        self.nc_variable = Some(name.to_string());
        self
    }
}

impl HasProperties for PropertiesData {
    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    fn property_owner(&self) -> String {
        self.kind().to_string()
    }
}

impl HasData for PropertiesData {
    fn data(&self) -> Option<&Data> {
        self.data.as_ref()
    }

    fn data_mut(&mut self) -> Option<&mut Data> {
        self.data.as_mut()
    }

    fn set_data(&mut self, data: Data) -> Option<Data> {
        self.data.replace(data)
    }

    fn del_data(&mut self) -> Option<Data> {
        self.data.take()
    }
}

impl NetCdfVariable for PropertiesData {
    fn nc_variable(&self) -> Option<&str> {
        self.nc_variable.as_deref()
    }

    fn set_nc_variable(&mut self, name: &str) -> Option<String> {
        self.nc_variable.replace(name.to_string())
    }

    fn del_nc_variable(&mut self) -> Option<String> {
        self.nc_variable.take()
    }
}

impl Source for PropertiesData {
    fn as_properties(&self) -> Option<&Properties> {
        Some(&self.properties)
    }

    fn as_data(&self) -> Option<&Data> {
        self.data.as_ref()
    }

    fn as_nc_variable(&self) -> Option<&str> {
        self.nc_variable.as_deref()
    }
}

impl Reconstruct for PropertiesData {
    fn from_source(source: &dyn Source, copy: bool) -> Self {
        Self {
            properties: source.as_properties().cloned().unwrap_or_default(),
            data: source.as_data().map(|d| d.copy(copy)),
            nc_variable: source.as_nc_variable().map(str::to_string),
        }
    }
}

impl Construct for PropertiesData {
    fn kind(&self) -> ConstructKind {
        ConstructKind::PropertiesData
    }
}
