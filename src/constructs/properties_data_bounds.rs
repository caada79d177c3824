//! A properties+data construct that also carries cell bounds

use super::{
    delegate_properties_data, Bounds, CellType, Construct, ConstructKind, HasBounds, HasData,
    PropertiesData, Reconstruct, Source,
};
use crate::data::Data;
use crate::errors::{CfError, Result};
use crate::properties::Properties;
use std::collections::BTreeMap;

/// Properties and data, plus optional bounds, cell type and named ancillary
/// arrays (such as interior ring flags)
#[derive(Debug, Clone, Default)]
pub struct PropertiesDataBounds {
    inner: PropertiesData,
    bounds: Option<Bounds>,
    cell_type: Option<CellType>,
    ancillaries: BTreeMap<String, Data>,
}

impl PropertiesDataBounds {
    pub fn new(properties: Properties, data: Option<Data>, bounds: Option<Bounds>) -> Self {
        Self {
            inner: PropertiesData::new(properties, data),
            bounds,
            cell_type: None,
            ancillaries: BTreeMap::new(),
        }
    }

    pub fn with_nc_variable(mut self, name: &str) -> Self {
        self.inner = self.inner.with_nc_variable(name);
        self
    }

    /// Check that the bounds and every ancillary array span the data's
    /// shape in their leading dimensions
    pub fn validate(&self) -> Result<()> {
        let Some(data) = self.inner.data() else {
            return Ok(());
        };
        let shape = data.shape()?;

        if let Some(bounds) = self.bounds.as_ref().and_then(|b| b.data()) {
            check_leading("bounds", shape, bounds.shape()?)?;
        }
        for (name, ancillary) in &self.ancillaries {
            check_leading(&format!("ancillary '{name}'"), shape, ancillary.shape()?)?;
        }
        Ok(())
    }
}

fn check_leading(what: &str, shape: &[usize], other: &[usize]) -> Result<()> {
    if other.len() < shape.len() || other[..shape.len()] != *shape {
        return Err(CfError::shape_mismatch(format!(
            "{what} shape {other:?} does not span data shape {shape:?}"
        )));
    }
    Ok(())
}

delegate_properties_data!(PropertiesDataBounds, inner);

impl HasBounds for PropertiesDataBounds {
    fn bounds(&self) -> Option<&Bounds> {
        self.bounds.as_ref()
    }

    fn set_bounds(&mut self, bounds: Bounds) -> Option<Bounds> {
        self.bounds.replace(bounds)
    }

    fn del_bounds(&mut self) -> Option<Bounds> {
        self.bounds.take()
    }

    fn cell_type(&self) -> Option<&CellType> {
        self.cell_type.as_ref()
    }

    fn set_cell_type(&mut self, cell_type: CellType) -> Option<CellType> {
        self.cell_type.replace(cell_type)
    }

    fn ancillaries(&self) -> &BTreeMap<String, Data> {
        &self.ancillaries
    }

    fn set_ancillary(&mut self, name: &str, data: Data) -> Option<Data> {
        self.ancillaries.insert(name.to_string(), data)
    }

    fn del_ancillary(&mut self, name: &str) -> Option<Data> {
        self.ancillaries.remove(name)
    }
}

impl Source for PropertiesDataBounds {
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

impl Reconstruct for PropertiesDataBounds {
    fn from_source(source: &dyn Source, copy: bool) -> Self {
        let inner = PropertiesData::from_source(source, copy);
        match source.as_bounds() {
            Some(b) => Self {
                inner,
                bounds: b.bounds().map(|bounds| Bounds::from_source(bounds, copy)),
                cell_type: b.cell_type().cloned(),
                ancillaries: b
                    .ancillaries()
                    .iter()
                    .map(|(name, data)| (name.clone(), data.copy(copy)))
                    .collect(),
            },
            None => Self {
                inner,
                ..Self::default()
            },
        }
    }
}

impl Construct for PropertiesDataBounds {
    fn kind(&self) -> ConstructKind {
        ConstructKind::PropertiesDataBounds
    }
}
