//! Writing constructs to netCDF files
//!
//! The writer maps a construct onto one netCDF variable: properties become
//! attributes, masked elements are written as `_FillValue`, and bounds go to
//! a companion variable named by the `bounds` attribute.

use crate::array::{ArrayValue, DType, MaskedArray, NC_FILL_DOUBLE};
use crate::constructs::{Construct, Count, HasData, HasProperties, List, Source};
use crate::data::Data;
use crate::errors::{CfError, Result};
use crate::properties::{Properties, PropertyValue};
use chrono::Utc;
use ndarray::{ArrayD, Dimension, IxDyn, Zip};
use netcdf::types::NcVariableType;
use netcdf::{create, AttributeValue, FileMut, NcTypeDescriptor, VariableMut};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes constructs to a new netCDF file
pub struct NetCdfWriter {
    file: FileMut,
    path: PathBuf,
    dimensions: BTreeMap<String, usize>,
}

impl NetCdfWriter {
    /// Create the output file, replacing any existing file at `path`
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            fs::remove_file(path)?;
        }
        tracing::debug!(path = %path.display(), "Creating netCDF file");
        Ok(Self {
            file: create(path)?,
            path: path.to_path_buf(),
            dimensions: BTreeMap::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Define a dimension. Redefining one with the same length is a no-op.
    pub fn add_dimension(&mut self, name: &str, len: usize) -> Result<()> {
        match self.dimensions.get(name) {
            Some(&existing) if existing == len => Ok(()),
            Some(&existing) => Err(CfError::shape_mismatch(format!(
                "dimension '{name}' already has length {existing}, not {len}"
            ))),
            None => {
                self.file.add_dimension(name, len)?;
                self.dimensions.insert(name.to_string(), len);
                Ok(())
            }
        }
    }

    /// Write a construct's properties and data as variable `name` over
    /// existing dimensions `dims`. Bounds, if any, are written too.
    pub fn write_variable(
        &mut self,
        name: &str,
        dims: &[&str],
        construct: &dyn Construct,
    ) -> Result<()> {
        let properties = construct.as_properties().cloned().unwrap_or_default();
        let mut extra = Vec::new();

        if let Some(sample_dimension) = construct.as_nc_sample_dimension() {
            extra.push(("sample_dimension", PropertyValue::from(sample_dimension)));
        }

        if let Some(bounds) = construct.as_bounds().and_then(|b| b.bounds()) {
            let bounds_name = bounds
                .as_nc_variable()
                .map_or_else(|| format!("{name}_bounds"), str::to_string);
            let vertices = bounds
                .data()
                .map(|d| d.shape().map(|s| s.last().copied().unwrap_or(0)))
                .transpose()?
                .unwrap_or(0);
            let vertex_dim = format!("nv{vertices}");
            self.add_dimension(&vertex_dim, vertices)?;

            let mut bounds_dims = dims.to_vec();
            bounds_dims.push(vertex_dim.as_str());
            self.write_values(
                &bounds_name,
                &bounds_dims,
                bounds.properties(),
                bounds.data(),
                &[],
            )?;
            extra.push(("bounds", PropertyValue::from(bounds_name.as_str())));
        }

        self.write_values(name, dims, &properties, construct.as_data(), &extra)
    }

    /// Write a count variable over its element dimension, tagged with the
    /// sample dimension it counts
    pub fn write_count(
        &mut self,
        name: &str,
        dim: &str,
        sample_dimension: &str,
        count: &Count,
    ) -> Result<()> {
        let extra = [("sample_dimension", PropertyValue::from(sample_dimension))];
        self.write_values(name, &[dim], count.properties(), count.data(), &extra)
    }

    /// Write a list variable. Its dimension shares its name, and `compress`
    /// names the gathered dimensions.
    pub fn write_list(&mut self, name: &str, compress: &[&str], list: &List) -> Result<()> {
        let extra = [("compress", PropertyValue::from(compress.join(" ")))];
        self.write_values(name, &[name], list.properties(), list.data(), &extra)
    }

    fn write_values(
        &mut self,
        name: &str,
        dims: &[&str],
        properties: &Properties,
        data: Option<&Data>,
        extra: &[(&str, PropertyValue)],
    ) -> Result<()> {
        let dtype = data.and_then(Data::dtype);
        tracing::debug!(variable = %name, dtype = ?dtype, "Writing variable");
        let values = data.map(|d| d.array()).transpose()?;

        let numeric = match values {
            Some(ArrayValue::Text(text)) if dtype == Some(DType::Char) => {
                return self.write_chars(name, dims, properties, extra, &text);
            }
            Some(ArrayValue::Text(text)) => {
                let mut var = self.file.add_string_variable(name, dims)?;
                put_attributes(&mut var, properties, extra)?;
                for (index, value) in text.filled(String::new()).indexed_iter() {
                    var.put_string(value, index.slice())?;
                }
                return Ok(());
            }
            Some(ArrayValue::Numeric(numeric)) => Some(numeric),
            None => None,
        };

        let numeric = numeric.as_ref();
        match dtype {
            Some(DType::Int8) => self.write_numeric::<i8>(name, dims, properties, extra, numeric),
            Some(DType::Int16) => self.write_numeric::<i16>(name, dims, properties, extra, numeric),
            Some(DType::Int32) => self.write_numeric::<i32>(name, dims, properties, extra, numeric),
            Some(DType::Int64) => self.write_numeric::<i64>(name, dims, properties, extra, numeric),
            Some(DType::UInt8) => self.write_numeric::<u8>(name, dims, properties, extra, numeric),
            Some(DType::UInt16) => self.write_numeric::<u16>(name, dims, properties, extra, numeric),
            Some(DType::UInt32) => self.write_numeric::<u32>(name, dims, properties, extra, numeric),
            Some(DType::UInt64) => self.write_numeric::<u64>(name, dims, properties, extra, numeric),
            Some(DType::Float32) => self.write_numeric::<f32>(name, dims, properties, extra, numeric),
            _ => self.write_numeric::<f64>(name, dims, properties, extra, numeric),
        }
    }

    /// Write numbers stored as `T`. Masked elements hold the `_FillValue`
    /// property, or the netCDF default fill of `T` when it is unset. Values
    /// are packed first when the properties carry `scale_factor` or
    /// `add_offset`.
    fn write_numeric<T: StorageType>(
        &mut self,
        name: &str,
        dims: &[&str],
        properties: &Properties,
        extra: &[(&str, PropertyValue)],
        values: Option<&MaskedArray<f64>>,
    ) -> Result<()> {
        let fill = properties
            .get_property("_FillValue")
            .ok()
            .and_then(PropertyValue::as_f64)
            .map(T::from_f64);
        let masked = values.is_some_and(|v| v.count_masked() > 0);
        let fill = fill.or_else(|| masked.then_some(T::FILL));

        let mut var = self.file.add_variable::<T>(name, dims)?;
        if let Some(fill) = fill {
            var.put_attribute("_FillValue", fill)?;
        }
        put_attributes(&mut var, properties, extra)?;

        let Some(values) = values else {
            return Ok(());
        };

        let scale = properties
            .get_property("scale_factor")
            .ok()
            .and_then(PropertyValue::as_f64)
            .unwrap_or(1.0);
        let offset = properties
            .get_property("add_offset")
            .ok()
            .and_then(PropertyValue::as_f64)
            .unwrap_or(0.0);
        let fill = fill.unwrap_or(T::FILL);
        let mask = values.mask_or_unmasked();
        let stored = Zip::from(values.data())
            .and(&mask)
            .map_collect(|&v, &m| if m { fill } else { T::from_f64((v - offset) / scale) });

        var.put(stored.as_standard_layout().view(), ..)?;
        Ok(())
    }

    /// Write text as a `char` variable with a trailing string-length
    /// dimension as wide as the longest value
    fn write_chars(
        &mut self,
        name: &str,
        dims: &[&str],
        properties: &Properties,
        extra: &[(&str, PropertyValue)],
        text: &MaskedArray<String>,
    ) -> Result<()> {
        let filled = text.filled(String::new());
        let width = filled.iter().map(String::len).max().unwrap_or(0).max(1);
        let strlen = format!("strlen{width}");
        self.add_dimension(&strlen, width)?;

        let mut char_dims = dims.to_vec();
        char_dims.push(strlen.as_str());
        let mut shape = filled.shape().to_vec();
        shape.push(width);

        let mut bytes = Vec::with_capacity(filled.len() * width);
        for value in &filled {
            let value = value.as_bytes();
            bytes.extend(value.iter().map(|&b| NcChar(b)));
            bytes.extend(std::iter::repeat(NcChar(0)).take(width - value.len()));
        }
        let chars = ArrayD::from_shape_vec(IxDyn(&shape), bytes)?;

        let mut var = self.file.add_variable::<NcChar>(name, &char_dims)?;
        put_attributes(&mut var, properties, extra)?;
        var.put(chars.view(), ..)?;
        Ok(())
    }

    /// Add the `history` attribute and close the file
    pub fn finish(mut self) -> Result<()> {
        self.file.add_attribute(
            "history",
            format!("Created by cfdm on {}", Utc::now().to_rfc3339()),
        )?;
        tracing::debug!(path = %self.path.display(), "Closing netCDF file");
        self.file.close()?;
        Ok(())
    }
}

fn put_attributes(
    var: &mut VariableMut<'_>,
    properties: &Properties,
    extra: &[(&str, PropertyValue)],
) -> Result<()> {
    let all = properties
        .iter()
        .map(|(k, v)| (k.as_str(), v))
        .chain(extra.iter().map(|(k, v)| (*k, v)))
        .filter(|(k, _)| *k != "_FillValue");

    for (name, value) in all {
        match value.clone() {
            PropertyValue::Str(s) => var.put_attribute(name, s)?,
            PropertyValue::Strs(ss) => var.put_attribute(name, ss)?,
            PropertyValue::Int(i) => var.put_attribute(name, i)?,
            PropertyValue::Ints(is) => var.put_attribute(name, is)?,
            PropertyValue::Float(f) => var.put_attribute(name, f)?,
            PropertyValue::Floats(fs) => var.put_attribute(name, fs)?,
        };
    }
    Ok(())
}

/// One byte of a netCDF `char` variable
#[repr(transparent)]
#[derive(Debug, Clone, Copy)]
struct NcChar(u8);

// SAFETY: `NcChar` is a single byte, the in-memory layout of `NC_CHAR`
unsafe impl NcTypeDescriptor for NcChar {
    fn type_descriptor() -> NcVariableType {
        NcVariableType::Char
    }
}

/// Numeric types data can be stored as
trait StorageType: NcTypeDescriptor + Copy + Into<AttributeValue> {
    /// The netCDF default fill value
    const FILL: Self;

    fn from_f64(value: f64) -> Self;
}

macro_rules! integer_storage {
    ($($t:ty => $fill:expr),* $(,)?) => {
        $(
            impl StorageType for $t {
                const FILL: Self = $fill;

                fn from_f64(value: f64) -> Self {
                    value.round() as $t
                }
            }
        )*
    };
}

integer_storage! {
    i8 => -127,
    i16 => -32_767,
    i32 => -2_147_483_647,
    i64 => -9_223_372_036_854_775_806,
    u8 => 255,
    u16 => 65_535,
    u32 => 4_294_967_295,
    u64 => 18_446_744_073_709_551_614,
}

impl StorageType for f32 {
    const FILL: Self = 9.969_209_968_386_869e36;

    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl StorageType for f64 {
    const FILL: Self = NC_FILL_DOUBLE;

    fn from_f64(value: f64) -> Self {
        value
    }
}
