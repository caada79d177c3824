//! Building constructs from the CF metadata of a file
//!
//! [`CfReader`] reads variable descriptors once and then hands out
//! constructs whose data stays on disk. Compressed variables are recognised
//! from their CF metadata and given a compressed backing:
//!
//! - contiguous ragged arrays, through a count variable whose
//!   `sample_dimension` attribute names the variable's first dimension
//! - gathered arrays, through a list variable that names one of the
//!   variable's dimensions and carries a `compress` attribute

use crate::array::{DType, GatheredArray, NetCdfArray, RaggedContiguousArray};
use crate::constructs::{
    AuxiliaryCoordinate, Bounds, Count, DimensionCoordinate, List, NetCdfDimension,
    NetCdfSampleDimension,
};
use crate::data::Data;
use crate::errors::{CfError, Result};
use crate::properties::Properties;
use crate::storage::{NetCdfStorage, ResourceGuard, Storage, VariableDescriptor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Attributes that describe file structure rather than the construct
const STRUCTURAL_ATTRIBUTES: [&str; 3] = ["bounds", "compress", "sample_dimension"];

/// Reads constructs from one group of a file
#[derive(Debug)]
pub struct CfReader {
    storage: Arc<dyn Storage>,
    path: PathBuf,
    group: Vec<String>,
    variables: Vec<VariableDescriptor>,
    dimensions: Vec<(String, usize)>,
}

impl CfReader {
    /// Read the root group of a netCDF file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_storage(Arc::new(NetCdfStorage), path, Vec::new())
    }

    /// Read `group` of the resource at `path` through `storage`
    pub fn with_storage(
        storage: Arc<dyn Storage>,
        path: impl AsRef<Path>,
        group: Vec<String>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let guard = ResourceGuard::open(storage.as_ref(), &path)?;
        let variables = guard.handle().variables(&group)?;
        let dimensions = guard.handle().dimensions(&group)?;
        guard.close()?;

        tracing::info!(
            path = %path.display(),
            variables = variables.len(),
            "Read file metadata"
        );
        Ok(Self {
            storage,
            path,
            group,
            variables,
            dimensions,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn dimensions(&self) -> &[(String, usize)] {
        &self.dimensions
    }

    pub fn descriptor(&self, name: &str) -> Result<&VariableDescriptor> {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| CfError::VariableNotFound {
                var: format!("'{name}'"),
            })
    }

    fn dimension_len(&self, name: &str) -> Result<usize> {
        self.dimensions
            .iter()
            .find_map(|(d, n)| (d == name).then_some(*n))
            .ok_or_else(|| CfError::shape_mismatch(format!("dimension '{name}' is not defined")))
    }

    /// Descriptive properties of a variable
    pub fn properties(&self, name: &str) -> Result<Properties> {
        Ok(self
            .descriptor(name)?
            .attributes
            .iter()
            .filter(|(k, _)| !STRUCTURAL_ATTRIBUTES.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn on_disk(&self, descriptor: &VariableDescriptor) -> Result<NetCdfArray> {
        let mut shape = descriptor.shape.clone();
        if descriptor.dtype == Some(DType::Char) {
            shape.pop();
        }
        Ok(NetCdfArray::new(
            Arc::clone(&self.storage),
            &self.path,
            Some(descriptor.name.clone()),
            Some(descriptor.id),
            shape,
            descriptor.dtype,
        )?
        .with_group(self.group.clone()))
    }

    /// The variable's data as stored, without uncompression
    pub fn raw_data(&self, name: &str) -> Result<Data> {
        Ok(Data::new(self.on_disk(self.descriptor(name)?)?))
    }

    /// The variable's data, uncompressed if its metadata says it is
    /// compressed
    pub fn data(&self, name: &str) -> Result<Data> {
        let descriptor = self.descriptor(name)?;
        let compressed = self.raw_data(name)?;

        if let Some(count) = self.count_for(descriptor) {
            tracing::debug!(variable = %name, count = %count.name, "Found contiguous ragged array");
            let count = self.count(&count.name)?;
            return Ok(Data::new(RaggedContiguousArray::new(compressed, count)?));
        }

        if let Some((axis, list)) = self.list_for(descriptor) {
            tracing::debug!(variable = %name, list = %list.name, "Found gathered array");
            let compress = list
                .attribute("compress")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let sizes = compress
                .split_whitespace()
                .map(|d| self.dimension_len(d))
                .collect::<Result<Vec<_>>>()?;

            let mut shape = descriptor.shape[..axis].to_vec();
            shape.extend(&sizes);
            shape.extend(&descriptor.shape[axis + 1..]);
            let axes = (axis..axis + sizes.len()).collect();

            let list = self.list(&list.name)?;
            return Ok(Data::new(GatheredArray::new(compressed, shape, axis, axes, list)?));
        }

        Ok(compressed)
    }

    /// A count variable whose sample dimension is this variable's first
    /// dimension
    fn count_for(&self, descriptor: &VariableDescriptor) -> Option<&VariableDescriptor> {
        let first = descriptor.dimensions.first()?;
        self.variables.iter().find(|v| {
            v.name != descriptor.name
                && v.attribute("sample_dimension").and_then(|s| s.as_str()) == Some(first.as_str())
        })
    }

    /// A list variable named after one of this variable's dimensions, with
    /// the position of that dimension
    fn list_for(&self, descriptor: &VariableDescriptor) -> Option<(usize, &VariableDescriptor)> {
        descriptor.dimensions.iter().enumerate().find_map(|(axis, dim)| {
            self.variables
                .iter()
                .find(|v| {
                    &v.name == dim && v.name != descriptor.name && v.attribute("compress").is_some()
                })
                .map(|v| (axis, v))
        })
    }

    pub fn count(&self, name: &str) -> Result<Count> {
        let descriptor = self.descriptor(name)?;
        let mut count =
            Count::new(self.properties(name)?, Some(self.raw_data(name)?)).with_nc_variable(name);
        if let Some(dim) = descriptor.dimensions.first() {
            count.set_nc_dimension(dim);
        }
        if let Some(sample) = descriptor.attribute("sample_dimension").and_then(|s| s.as_str()) {
            count.set_nc_sample_dimension(sample);
        }
        Ok(count)
    }

    pub fn list(&self, name: &str) -> Result<List> {
        Ok(List::new(self.properties(name)?, Some(self.raw_data(name)?)).with_nc_variable(name))
    }

    /// The bounds named by the variable's `bounds` attribute
    pub fn bounds(&self, name: &str) -> Result<Option<Bounds>> {
        let Some(bounds) = self
            .descriptor(name)?
            .attribute("bounds")
            .and_then(|b| b.as_str())
        else {
            return Ok(None);
        };
        let bounds = Bounds::new(self.properties(bounds)?, Some(self.data(bounds)?))
            .with_nc_variable(bounds);
        Ok(Some(bounds))
    }

    pub fn dimension_coordinate(&self, name: &str) -> Result<DimensionCoordinate> {
        Ok(DimensionCoordinate::new(
            self.properties(name)?,
            Some(self.data(name)?),
            self.bounds(name)?,
        )
        .with_nc_variable(name))
    }

    pub fn auxiliary_coordinate(&self, name: &str) -> Result<AuxiliaryCoordinate> {
        Ok(AuxiliaryCoordinate::new(
            self.properties(name)?,
            Some(self.data(name)?),
            self.bounds(name)?,
        )
        .with_nc_variable(name))
    }
}
