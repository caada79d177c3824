//! cfdm: the CF data model core over netCDF storage
//!
//! A Rust library for self-describing multi-dimensional arrays: values plus
//! named properties, read lazily and losslessly from netCDF files. Compressed
//! encodings (contiguous ragged arrays and gathered arrays) present their
//! uncompressed logical shape and are only uncompressed for the elements a
//! read asks for.
//!
//! ## Key Features
//!
//! - **Lazy Arrays**: shape and data type without I/O, elements on demand
//! - **Orthogonal Indexing**: integer, slice and list selectors per dimension
//! - **Compression**: ragged-by-count and gathered-by-list uncompression
//! - **Scoped Resources**: every read opens and closes its file
//! - **Parallel Comparison**: tolerance equality of data using Rayon
//!
//! ## Module Organization
//!
//! - [`properties`]: the property container shared by every construct
//! - [`array`]: the lazy array interface and its backings
//! - [`data`]: the data container wrapping one lazy array
//! - [`constructs`]: properties+data composites (count, list, bounds,
//!   coordinates)
//! - [`storage`]: the on-disk container collaborator and its netCDF
//!   implementation
//! - [`reader`], [`writer`]: reading and writing constructs from CF files
//! - [`equals`]: equality options and tolerance comparison
//! - [`config`]: tolerances, logging and thread pool configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cfdm::prelude::*;
//!
//! let reader = CfReader::open("stations.nc").unwrap();
//! let temperature = reader.data("temperature").unwrap();
//!
//! // Contiguous ragged data has shape [stations, longest time series]
//! println!("{:?}", temperature.shape().unwrap());
//! let first_station = temperature
//!     .get(&Indexer::from(vec![Selector::Index(0)]))
//!     .unwrap();
//! ```

pub mod array;
pub mod config;
pub mod constructs;
pub mod data;
pub mod equals;
pub mod errors;
pub mod properties;
pub mod reader;
pub mod storage;
pub mod writer;

pub use errors::{CfError, Result};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::array::{
        ArrayValue, CompressionType, DType, GatheredArray, InMemoryArray, Indexer, LazyArray,
        MaskedArray, NetCdfArray, RaggedContiguousArray, Selector,
    };
    pub use crate::config::{Config, ParallelConfig};
    pub use crate::constructs::{
        AuxiliaryCoordinate, Bounds, CellType, Construct, Count, DimensionCoordinate, HasBounds,
        HasData, HasProperties, List, NetCdfDimension, NetCdfSampleDimension, NetCdfVariable,
        PropertiesData, PropertiesDataBounds, Reconstruct, Source,
    };
    pub use crate::data::Data;
    pub use crate::equals::EqualsOptions;
    pub use crate::errors::{CfError, Result};
    pub use crate::properties::{Properties, PropertyValue};
    pub use crate::reader::CfReader;
    pub use crate::storage::{NetCdfStorage, Storage, StorageHandle};
    pub use crate::writer::NetCdfWriter;
}
