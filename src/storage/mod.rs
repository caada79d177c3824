//! The on-disk container collaborator
//!
//! Array backings never talk to a file format directly. They open a resource
//! through a [`Storage`], work with the returned [`StorageHandle`] and close
//! it again, all inside a single call. [`netcdf::NetCdfStorage`] is the
//! implementation over the `netcdf` crate.

pub mod netcdf;

pub use self::netcdf::NetCdfStorage;

use crate::array::{DType, MaskedArray};
use crate::errors::{CfError, Result};
use crate::properties::PropertyValue;
use ndarray::ArrayD;
use std::fmt;
use std::path::{Path, PathBuf};

/// Metadata of one variable in a group
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDescriptor {
    pub name: String,
    /// Position of the variable in its group's variable listing
    pub id: usize,
    pub dtype: Option<DType>,
    pub shape: Vec<usize>,
    pub dimensions: Vec<String>,
    pub attributes: Vec<(String, PropertyValue)>,
}

impl VariableDescriptor {
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn attribute(&self, name: &str) -> Option<&PropertyValue> {
        self.attributes
            .iter()
            .find_map(|(k, v)| (k == name).then_some(v))
    }
}

/// Values as the storage returns them
#[derive(Debug, Clone, PartialEq)]
pub enum RawArray {
    Numeric(MaskedArray<f64>),
    /// Bytes of a char variable, including its trailing string-length dimension
    Chars(ArrayD<u8>),
    /// Variable-length strings
    Strings(ArrayD<String>),
}

/// Opens resources by locator
pub trait Storage: fmt::Debug + Send + Sync {
    fn open(&self, locator: &Path) -> Result<Box<dyn StorageHandle>>;
}

/// An open resource. Group paths run from the root group, which is `&[]`.
pub trait StorageHandle: Send {
    /// Variables of a group, in positional-id order
    fn variables(&self, group: &[String]) -> Result<Vec<VariableDescriptor>>;

    fn dimensions(&self, group: &[String]) -> Result<Vec<(String, usize)>>;

    /// Read the outer product of `positions` (one list per on-disk dimension)
    fn read(
        &self,
        group: &[String],
        variable: &str,
        positions: &[Vec<usize>],
        masked: bool,
    ) -> Result<RawArray>;

    fn close(self: Box<Self>) -> Result<()>;
}

/// Scoped ownership of an open handle.
///
/// Dropping the guard closes the handle; [`ResourceGuard::close`] closes it
/// and reports the outcome.
pub struct ResourceGuard {
    locator: PathBuf,
    handle: Option<Box<dyn StorageHandle>>,
}

impl ResourceGuard {
    /// Open `locator`, wrapping any failure as [`CfError::ResourceOpen`]
    pub fn open(storage: &dyn Storage, locator: &Path) -> Result<Self> {
        tracing::debug!(locator = %locator.display(), "Opening resource");
        let handle = storage.open(locator).map_err(|e| CfError::ResourceOpen {
            locator: locator.to_path_buf(),
            source: Box::new(e),
        })?;
        Ok(Self::adopt(locator, handle))
    }

    /// Take ownership of a handle that is already open
    pub fn adopt(locator: &Path, handle: Box<dyn StorageHandle>) -> Self {
        Self {
            locator: locator.to_path_buf(),
            handle: Some(handle),
        }
    }

    pub fn handle(&self) -> &dyn StorageHandle {
        match &self.handle {
            Some(handle) => handle.as_ref(),
            None => unreachable!("resource guard used after release"),
        }
    }

    /// Give up ownership without closing
    pub fn release(mut self) -> Option<Box<dyn StorageHandle>> {
        self.handle.take()
    }

    /// Close the handle, reporting a failure as [`CfError::ResourceClose`]
    pub fn close(mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => {
                tracing::debug!(locator = %self.locator.display(), "Closing resource");
                handle.close().map_err(|e| CfError::ResourceClose {
                    locator: self.locator.clone(),
                    source: Box::new(e),
                })
            }
            None => Ok(()),
        }
    }
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::debug!(locator = %self.locator.display(), "Closing resource");
            if let Err(e) = handle.close() {
                tracing::warn!(
                    locator = %self.locator.display(),
                    "Failed to close resource after an earlier error: {e}"
                );
            }
        }
    }
}
