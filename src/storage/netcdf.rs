//! netCDF files as a [`Storage`] collaborator
//!
//! Reads go through the `netcdf` crate. Each read fetches the bounding
//! hyperslab of the requested positions and then selects the positions
//! themselves, so a request touches the file once per call. Masking follows
//! the CF conventions: values equal to `_FillValue` (or the type's default
//! fill) or `missing_value`, and values outside `valid_min`, `valid_max` or
//! `valid_range`, are masked. Packed variables are then unpacked with
//! `scale_factor` and `add_offset`, whether or not masking is enabled.

use super::{RawArray, Storage, StorageHandle, VariableDescriptor};
use crate::array::index::select_orthogonal;
use crate::array::{DType, MaskedArray};
use crate::errors::{CfError, Result};
use crate::properties::PropertyValue;
use ndarray::{ArrayD, Dimension, IxDyn};
use netcdf::types::{FloatType, IntType, NcVariableType};
use netcdf::{AttributeValue, Variable};
use std::path::Path;

/// Opens netCDF files read-only
#[derive(Debug, Clone, Copy, Default)]
pub struct NetCdfStorage;

impl Storage for NetCdfStorage {
    fn open(&self, locator: &Path) -> Result<Box<dyn StorageHandle>> {
        let file = netcdf::open(locator)?;
        Ok(Box::new(NetCdfHandle { file }))
    }
}

struct NetCdfHandle {
    file: netcdf::File,
}

impl NetCdfHandle {
    /// Run `f` over the variables and dimensions of a group
    fn with_group<T>(
        &self,
        group: &[String],
        f: impl FnOnce(Vec<Variable<'_>>, Vec<(String, usize)>) -> Result<T>,
    ) -> Result<T> {
        if group.is_empty() {
            let dims = self
                .file
                .dimensions()
                .map(|d| (d.name(), d.len()))
                .collect();
            return f(self.file.variables().collect(), dims);
        }

        let path = group.join("/");
        match self.file.group(&path)? {
            Some(g) => {
                let dims = g.dimensions().map(|d| (d.name(), d.len())).collect();
                f(g.variables().collect(), dims)
            }
            None => Err(self.missing_group(group)),
        }
    }

    /// Name the first group of `group` that does not exist
    fn missing_group(&self, group: &[String]) -> CfError {
        let missing = (1..=group.len())
            .find(|&n| !matches!(self.file.group(&group[..n].join("/")), Ok(Some(_))))
            .map_or_else(|| group.join("/"), |n| group[n - 1].clone());
        CfError::GroupNotFound {
            group: missing,
            path: format!("/{}", group.join("/")),
        }
    }
}

impl StorageHandle for NetCdfHandle {
    fn variables(&self, group: &[String]) -> Result<Vec<VariableDescriptor>> {
        self.with_group(group, |vars, _| {
            vars.iter()
                .enumerate()
                .map(|(id, var)| describe(id, var))
                .collect()
        })
    }

    fn dimensions(&self, group: &[String]) -> Result<Vec<(String, usize)>> {
        self.with_group(group, |_, dims| Ok(dims))
    }

    fn read(
        &self,
        group: &[String],
        variable: &str,
        positions: &[Vec<usize>],
        masked: bool,
    ) -> Result<RawArray> {
        self.with_group(group, |vars, _| {
            let var = vars
                .iter()
                .find(|v| v.name() == variable)
                .ok_or_else(|| CfError::VariableNotFound {
                    var: format!("'{variable}'"),
                })?;
            read_variable(var, positions, masked)
        })
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.file.close()?;
        Ok(())
    }
}

fn describe(id: usize, var: &Variable<'_>) -> Result<VariableDescriptor> {
    let dims = var.dimensions();
    let attributes = var
        .attributes()
        .filter_map(|attr| {
            let name = attr.name().to_string();
            match attr.value() {
                Ok(value) => property_value(value).map(|v| (name, v)),
                Err(e) => {
                    tracing::debug!(attribute = %name, "Skipping unreadable attribute: {e}");
                    None
                }
            }
        })
        .collect();

    Ok(VariableDescriptor {
        name: var.name(),
        id,
        dtype: unpacked_dtype(var).or_else(|| dtype_of(&var.vartype())),
        shape: dims.iter().map(|d| d.len()).collect(),
        dimensions: dims.iter().map(|d| d.name()).collect(),
        attributes,
    })
}

/// Storage type of a variable; `None` for types with no array equivalent
pub fn dtype_of(vartype: &NcVariableType) -> Option<DType> {
    Some(match vartype {
        NcVariableType::Int(IntType::I8) => DType::Int8,
        NcVariableType::Int(IntType::I16) => DType::Int16,
        NcVariableType::Int(IntType::I32) => DType::Int32,
        NcVariableType::Int(IntType::I64) => DType::Int64,
        NcVariableType::Int(IntType::U8) => DType::UInt8,
        NcVariableType::Int(IntType::U16) => DType::UInt16,
        NcVariableType::Int(IntType::U32) => DType::UInt32,
        NcVariableType::Int(IntType::U64) => DType::UInt64,
        NcVariableType::Float(FloatType::F32) => DType::Float32,
        NcVariableType::Float(FloatType::F64) => DType::Float64,
        NcVariableType::Char => DType::Char,
        NcVariableType::String => DType::Str,
        _ => return None,
    })
}

/// Map an attribute onto a property. Attribute types without a property
/// equivalent are skipped.
pub fn property_value(value: AttributeValue) -> Option<PropertyValue> {
    Some(match value {
        AttributeValue::Str(s) => PropertyValue::Str(s),
        AttributeValue::Strs(ss) => PropertyValue::Strs(ss),
        AttributeValue::Float(f) => PropertyValue::Float(f as f64),
        AttributeValue::Floats(fs) => PropertyValue::Floats(fs.into_iter().map(f64::from).collect()),
        AttributeValue::Double(d) => PropertyValue::Float(d),
        AttributeValue::Doubles(ds) => PropertyValue::Floats(ds),
        AttributeValue::Schar(i) => PropertyValue::Int(i64::from(i)),
        AttributeValue::Schars(is) => PropertyValue::Ints(is.into_iter().map(i64::from).collect()),
        AttributeValue::Uchar(u) => PropertyValue::Int(i64::from(u)),
        AttributeValue::Uchars(us) => PropertyValue::Ints(us.into_iter().map(i64::from).collect()),
        AttributeValue::Short(s) => PropertyValue::Int(i64::from(s)),
        AttributeValue::Shorts(ss) => PropertyValue::Ints(ss.into_iter().map(i64::from).collect()),
        AttributeValue::Ushort(u) => PropertyValue::Int(i64::from(u)),
        AttributeValue::Ushorts(us) => PropertyValue::Ints(us.into_iter().map(i64::from).collect()),
        AttributeValue::Int(i) => PropertyValue::Int(i64::from(i)),
        AttributeValue::Ints(is) => PropertyValue::Ints(is.into_iter().map(i64::from).collect()),
        AttributeValue::Uint(u) => PropertyValue::Int(i64::from(u)),
        AttributeValue::Uints(us) => PropertyValue::Ints(us.into_iter().map(i64::from).collect()),
        AttributeValue::Longlong(i) => PropertyValue::Int(i),
        AttributeValue::Longlongs(is) => PropertyValue::Ints(is),
        AttributeValue::Ulonglong(u) => PropertyValue::Float(u as f64),
        AttributeValue::Ulonglongs(us) => {
            PropertyValue::Floats(us.into_iter().map(|u| u as f64).collect())
        }
        #[allow(unreachable_patterns)]
        other => {
            tracing::debug!("Skipping unsupported attribute value {other:?}");
            return None;
        }
    })
}

/// Start and count of the hyperslab bounding `positions`, and the positions
/// relative to its start
fn bounding_hyperslab(positions: &[Vec<usize>]) -> (Vec<usize>, Vec<usize>, Vec<Vec<usize>>) {
    let mut start = Vec::with_capacity(positions.len());
    let mut count = Vec::with_capacity(positions.len());
    let mut relative = Vec::with_capacity(positions.len());
    for axis in positions {
        let lo = axis.iter().copied().min().unwrap_or(0);
        let hi = axis.iter().copied().max().map_or(0, |h| h + 1);
        start.push(lo);
        count.push(hi - lo);
        relative.push(axis.iter().map(|&p| p - lo).collect());
    }
    (start, count, relative)
}

fn read_variable(var: &Variable<'_>, positions: &[Vec<usize>], masked: bool) -> Result<RawArray> {
    let ndim = var.dimensions().len();
    if positions.len() != ndim {
        return Err(CfError::index(format!(
            "variable '{}' has {ndim} dimensions but {} were indexed",
            var.name(),
            positions.len()
        )));
    }

    let shape: Vec<usize> = positions.iter().map(Vec::len).collect();
    if shape.iter().any(|&n| n == 0) {
        return Ok(match var.vartype() {
            NcVariableType::Char => RawArray::Chars(ArrayD::from_elem(IxDyn(&shape), 0)),
            NcVariableType::String => RawArray::Strings(ArrayD::from_elem(IxDyn(&shape), String::new())),
            _ => RawArray::Numeric(MaskedArray::new(ArrayD::from_elem(IxDyn(&shape), 0.0))),
        });
    }

    let (start, count, relative) = bounding_hyperslab(positions);
    let vartype = var.vartype();

    match vartype {
        NcVariableType::Char => {
            let buf = var.get_raw_values((start.as_slice(), count.as_slice()))?;
            let block = ArrayD::from_shape_vec(IxDyn(&count), buf)?;
            Ok(RawArray::Chars(select_orthogonal(&block, &relative)))
        }
        NcVariableType::String => {
            let mut strings = Vec::with_capacity(shape.iter().product());
            for index in ndarray::indices(IxDyn(&shape)) {
                let at: Vec<usize> = index
                    .slice()
                    .iter()
                    .zip(positions)
                    .map(|(&i, axis)| axis[i])
                    .collect();
                strings.push(var.get_string(at.as_slice())?);
            }
            Ok(RawArray::Strings(ArrayD::from_shape_vec(IxDyn(&shape), strings)?))
        }
        NcVariableType::Int(_) | NcVariableType::Float(_) => {
            let values = var.get_values::<f64, _>((start.as_slice(), count.as_slice()))?;
            let block = ArrayD::from_shape_vec(IxDyn(&count), values)?;
            let data = select_orthogonal(&block, &relative);
            let array = if masked {
                mask_by_attributes(var, &vartype, data)
            } else {
                MaskedArray::new(data)
            };
            Ok(RawArray::Numeric(unpack(var, array)))
        }
        other => Err(CfError::UnsupportedType(format!(
            "variable '{}' has type {other:?}",
            var.name()
        ))),
    }
}

fn numeric_attribute(var: &Variable<'_>, name: &str) -> Option<Vec<f64>> {
    let value = var.attribute(name)?.value().ok()?;
    property_value(value)?.as_f64s()
}

/// Default fill value of the netCDF library for a numeric type
fn default_fill(vartype: &NcVariableType) -> Option<f64> {
    Some(match vartype {
        NcVariableType::Int(IntType::I8) => -127.0,
        NcVariableType::Int(IntType::I16) => -32767.0,
        NcVariableType::Int(IntType::I32) => -2_147_483_647.0,
        NcVariableType::Int(IntType::I64) => -9_223_372_036_854_775_806.0,
        NcVariableType::Int(IntType::U16) => 65535.0,
        NcVariableType::Int(IntType::U32) => 4_294_967_295.0,
        NcVariableType::Int(IntType::U64) => 18_446_744_073_709_551_614.0,
        NcVariableType::Float(FloatType::F32) => f64::from(9.969_209_968_386_869e36_f32),
        NcVariableType::Float(FloatType::F64) => crate::array::NC_FILL_DOUBLE,
        // Bytes have no default fill to mask by
        _ => return None,
    })
}

fn mask_by_attributes(var: &Variable<'_>, vartype: &NcVariableType, data: ArrayD<f64>) -> MaskedArray<f64> {
    let mut missing: Vec<f64> = numeric_attribute(var, "_FillValue")
        .or_else(|| default_fill(vartype).map(|f| vec![f]))
        .unwrap_or_default();
    missing.extend(numeric_attribute(var, "missing_value").unwrap_or_default());

    let range = numeric_attribute(var, "valid_range").filter(|r| r.len() == 2);
    let valid_min = range
        .as_ref()
        .map(|r| r[0])
        .or_else(|| numeric_attribute(var, "valid_min").and_then(|v| v.first().copied()));
    let valid_max = range
        .as_ref()
        .map(|r| r[1])
        .or_else(|| numeric_attribute(var, "valid_max").and_then(|v| v.first().copied()));

    MaskedArray::new(data).mask_where(|&v| {
        missing.contains(&v)
            || valid_min.is_some_and(|lo| v < lo)
            || valid_max.is_some_and(|hi| v > hi)
    })
}

/// Apply `scale_factor` and `add_offset` to the unmasked values of a packed
/// variable. Masking is decided on the packed values.
fn unpack(var: &Variable<'_>, array: MaskedArray<f64>) -> MaskedArray<f64> {
    let scale = numeric_attribute(var, "scale_factor").and_then(|v| v.first().copied());
    let offset = numeric_attribute(var, "add_offset").and_then(|v| v.first().copied());
    if scale.is_none() && offset.is_none() {
        return array;
    }

    let (scale, offset) = (scale.unwrap_or(1.0), offset.unwrap_or(0.0));
    array.map_unmasked(|&v| v * scale + offset)
}

/// Element type of a packed variable's unpacked values: that of its
/// `scale_factor` (or `add_offset`) attribute
fn unpacked_dtype(var: &Variable<'_>) -> Option<DType> {
    let packing = var
        .attribute("scale_factor")
        .or_else(|| var.attribute("add_offset"))?;
    match packing.value().ok()? {
        AttributeValue::Float(_) | AttributeValue::Floats(_) => Some(DType::Float32),
        _ => Some(DType::Float64),
    }
}
