//! Arrays stored in a netCDF variable, read on demand
//!
//! A [`NetCdfArray`] only records where its variable lives. Each `fetch`
//! opens the resource, reads the requested hyperslab and closes it again, so
//! no handle exists between reads unless `keep_open` is set.

use super::{ArrayValue, DType, Element, Indexer, LazyArray, MaskedArray};
use crate::errors::{CfError, Result};
use crate::storage::{RawArray, ResourceGuard, Storage, StorageHandle, VariableDescriptor};
use ndarray::{ArrayD, Axis, IxDyn};
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An array held in a variable of a storage resource
pub struct NetCdfArray {
    storage: Arc<dyn Storage>,
    filename: PathBuf,
    ncvar: Option<String>,
    varid: Option<usize>,
    group: Vec<String>,
    shape: Vec<usize>,
    dtype: Option<DType>,
    mask: bool,
    keep_open: bool,
    open_handle: Mutex<Option<Box<dyn StorageHandle>>>,
}

impl NetCdfArray {
    /// Describe a variable by name or positional id; at least one is required
    /// and the name wins when both are given.
    ///
    /// `shape` is the logical shape. For char variables it excludes the
    /// trailing string-length dimension.
    pub fn new(
        storage: Arc<dyn Storage>,
        filename: impl Into<PathBuf>,
        ncvar: Option<String>,
        varid: Option<usize>,
        shape: Vec<usize>,
        dtype: Option<DType>,
    ) -> Result<Self> {
        if ncvar.is_none() && varid.is_none() {
            return Err(CfError::InvalidVariableReference);
        }
        Ok(Self {
            storage,
            filename: filename.into(),
            ncvar,
            varid,
            group: Vec::new(),
            shape,
            dtype,
            mask: true,
            keep_open: false,
            open_handle: Mutex::new(None),
        })
    }

    /// Group path from the root, e.g. `["forecasts", "model2"]`
    pub fn with_group(mut self, group: Vec<String>) -> Self {
        self.group = group;
        self
    }

    /// Whether to mask by the `_FillValue`/`missing_value`/`valid_*` convention
    pub fn with_mask(mut self, mask: bool) -> Self {
        self.mask = mask;
        self
    }

    /// Keep the resource open after a read, for reuse by the next read
    pub fn with_keep_open(mut self, keep_open: bool) -> Self {
        self.keep_open = keep_open;
        self
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn ncvar(&self) -> Option<&str> {
        self.ncvar.as_deref()
    }

    pub fn varid(&self) -> Option<usize> {
        self.varid
    }

    pub fn group(&self) -> &[String] {
        &self.group
    }

    pub fn mask(&self) -> bool {
        self.mask
    }

    pub fn keep_open(&self) -> bool {
        self.keep_open
    }

    /// Whether a handle is currently held open
    pub fn is_open(&self) -> bool {
        self.open_handle.lock().is_some()
    }

    /// Close a handle held open by `keep_open`
    pub fn close(&self) -> Result<()> {
        match self.open_handle.lock().take() {
            Some(handle) => ResourceGuard::adopt(&self.filename, handle).close(),
            None => Ok(()),
        }
    }

    /// File name and variable address
    pub fn file_address(&self) -> (PathBuf, String) {
        let address = match (&self.ncvar, self.varid) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => id.to_string(),
            (None, None) => String::new(),
        };
        (self.filename.clone(), address)
    }

    fn resolve_variable<'a>(
        &self,
        descriptors: &'a [VariableDescriptor],
    ) -> Result<&'a VariableDescriptor> {
        let found = match (&self.ncvar, self.varid) {
            (Some(name), _) => descriptors.iter().find(|d| &d.name == name),
            (None, Some(id)) => descriptors.iter().find(|d| d.id == id),
            (None, None) => None,
        };
        found.ok_or_else(|| CfError::VariableNotFound {
            var: match (&self.ncvar, self.varid) {
                (Some(name), _) => format!("'{name}'"),
                (None, Some(id)) => format!("with id {id}"),
                (None, None) => "<unnamed>".to_string(),
            },
        })
    }

    fn read(&self, handle: &dyn StorageHandle, positions: &[Vec<usize>]) -> Result<RawArray> {
        let descriptors = handle.variables(&self.group)?;
        let descriptor = self.resolve_variable(&descriptors)?;

        let mut positions = positions.to_vec();
        if descriptor.dtype == Some(DType::Char) && descriptor.ndim() == self.shape.len() + 1 {
            let strlen = descriptor.shape.last().copied().unwrap_or(0);
            positions.push((0..strlen).collect());
        }

        tracing::debug!(
            file = %self.filename.display(),
            variable = %descriptor.name,
            "Reading variable"
        );
        handle.read(&self.group, &descriptor.name, &positions, self.mask)
    }
}

impl LazyArray for NetCdfArray {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn dtype(&self) -> Option<DType> {
        self.dtype
    }

    fn fetch(&self, index: &Indexer) -> Result<ArrayValue> {
        let resolved = index.resolve(&self.shape)?;

        let mut held = self.open_handle.lock();
        let guard = match held.take() {
            Some(handle) => ResourceGuard::adopt(&self.filename, handle),
            None => ResourceGuard::open(self.storage.as_ref(), &self.filename)?,
        };

        let raw = self.read(guard.handle(), &resolved.positions);
        let raw = if self.keep_open {
            *held = guard.release();
            raw?
        } else {
            // A read error wins over a close error; the guard logs the latter.
            let raw = raw?;
            guard.close()?;
            raw
        };
        drop(held);

        Ok(decode(raw).remove_axes(&resolved.dropped))
    }

    fn duplicate(&self) -> Arc<dyn LazyArray> {
        Arc::new(Self {
            storage: Arc::clone(&self.storage),
            filename: self.filename.clone(),
            ncvar: self.ncvar.clone(),
            varid: self.varid,
            group: self.group.clone(),
            shape: self.shape.clone(),
            dtype: self.dtype,
            mask: self.mask,
            keep_open: self.keep_open,
            open_handle: Mutex::new(None),
        })
    }
}

impl fmt::Debug for NetCdfArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetCdfArray")
            .field("filename", &self.filename)
            .field("ncvar", &self.ncvar)
            .field("varid", &self.varid)
            .field("group", &self.group)
            .field("shape", &self.shape)
            .field("dtype", &self.dtype)
            .field("mask", &self.mask)
            .finish_non_exhaustive()
    }
}

/// Turn storage values into semantic values: char arrays collapse their
/// trailing dimension into right-trimmed strings, and empty strings of either
/// string kind become missing.
fn decode(raw: RawArray) -> ArrayValue {
    match raw {
        RawArray::Numeric(values) => ArrayValue::Numeric(values),
        RawArray::Chars(bytes) => ArrayValue::Text(mask_empty(chars_to_strings(&bytes))),
        RawArray::Strings(strings) => ArrayValue::Text(mask_empty(strings)),
    }
}

fn chars_to_strings(bytes: &ArrayD<u8>) -> ArrayD<String> {
    if bytes.ndim() == 0 {
        return ArrayD::from_elem(IxDyn(&[]), byte_string(&[bytes[IxDyn(&[])]]));
    }

    let last = Axis(bytes.ndim() - 1);
    let outer: Vec<usize> = bytes.shape()[..bytes.ndim() - 1].to_vec();
    let strings: Vec<String> = bytes
        .lanes(last)
        .into_iter()
        .map(|lane| byte_string(&lane.to_vec()))
        .collect();

    ArrayD::from_shape_vec(IxDyn(&outer), strings)
        .unwrap_or_else(|_| ArrayD::from_elem(IxDyn(&outer), String::fill()))
}

fn byte_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim_end().to_string()
}

fn mask_empty(strings: ArrayD<String>) -> MaskedArray<String> {
    MaskedArray::new(strings).mask_where(String::is_empty)
}
