//! Lazy arrays and their backings
//!
//! Every data container holds a [`LazyArray`]: something with a shape and data
//! type that can be queried without I/O, and whose elements are only produced
//! when [`LazyArray::fetch`] is called.
//!
//! # Organization
//!
//! - [`index`]: index expressions and orthogonal selection
//! - [`masked`]: concrete masked values returned by `fetch`
//! - [`memory`]: arrays already held in memory
//! - [`netcdf`]: arrays read on demand from a storage resource
//! - [`ragged`]: contiguous ragged arrays, uncompressed by count
//! - [`gathered`]: gathered arrays, uncompressed by list

pub mod gathered;
pub mod index;
pub mod masked;
pub mod memory;
pub mod netcdf;
pub mod ragged;

pub use gathered::GatheredArray;
pub use index::{Indexer, ResolvedIndex, Selector};
pub use masked::{ArrayValue, Element, MaskedArray, NC_FILL_DOUBLE};
pub use memory::InMemoryArray;
pub use netcdf::NetCdfArray;
pub use ragged::RaggedContiguousArray;

use crate::constructs::{Count, List};
use crate::data::Data;
use crate::errors::Result;
use std::fmt;
use std::sync::Arc;

/// Storage data type of an array's elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// Fixed-width character array, exposed as strings
    Char,
    /// Variable-length string
    Str,
}

impl DType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Char => "char",
            Self::Str => "str",
        }
    }

    /// Whether fetched values are [`ArrayValue::Text`]
    pub const fn is_text(self) -> bool {
        matches!(self, Self::Char | Self::Str)
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::UInt8
                | Self::UInt16
                | Self::UInt32
                | Self::UInt64
        )
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compression scheme of a compressed backing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    RaggedContiguous,
    Gathered,
}

/// Borrowed view of how a backing is compressed
#[derive(Debug, Clone, Copy)]
pub enum Compression<'a> {
    RaggedContiguous {
        compressed: &'a Data,
        count: &'a Count,
    },
    Gathered {
        compressed: &'a Data,
        list: &'a List,
        compressed_dimension: usize,
    },
}

impl<'a> Compression<'a> {
    pub fn compression_type(&self) -> CompressionType {
        match self {
            Self::RaggedContiguous { .. } => CompressionType::RaggedContiguous,
            Self::Gathered { .. } => CompressionType::Gathered,
        }
    }

    /// The physical (compressed) data
    pub fn compressed(&self) -> &'a Data {
        match self {
            Self::RaggedContiguous { compressed, .. } | Self::Gathered { compressed, .. } => {
                compressed
            }
        }
    }
}

/// Capabilities shared by every array backing.
///
/// `shape` and `dtype` never trigger I/O. `fetch` answers an index expression
/// over the logical (uncompressed) shape.
pub trait LazyArray: fmt::Debug + Send + Sync {
    fn shape(&self) -> &[usize];

    /// Element type; `None` when the storage type is not known
    fn dtype(&self) -> Option<DType>;

    fn ndim(&self) -> usize {
        self.shape().len()
    }

    fn size(&self) -> usize {
        self.shape().iter().product()
    }

    /// Read the elements selected by `index`
    fn fetch(&self, index: &Indexer) -> Result<ArrayValue>;

    /// A fully materialized in-memory copy
    fn to_memory(&self) -> Result<InMemoryArray> {
        let values = self.fetch(&Indexer::All)?;
        Ok(InMemoryArray::with_dtype(values, self.dtype()))
    }

    /// An independent deep copy of this backing
    fn duplicate(&self) -> Arc<dyn LazyArray>;

    fn compression(&self) -> Option<Compression<'_>> {
        None
    }
}
