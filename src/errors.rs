//! Centralized error handling for cfdm
//!
//! Every fallible operation in the crate returns [`Result`], whose error type
//! [`CfError`] names the kind of failure together with enough context (file,
//! variable, property) to locate it.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for cfdm operations
#[derive(Debug, Error)]
pub enum CfError {
    /// A property was requested without a default and is not set
    #[error("{owner} has no '{name}' property")]
    PropertyNotFound { owner: String, name: String },

    /// The storage collaborator could not open a resource
    #[error("Failed to open '{}': {source}", locator.display())]
    ResourceOpen {
        locator: PathBuf,
        #[source]
        source: Box<CfError>,
    },

    /// A read succeeded but the resource failed to close afterwards
    #[error("Failed to close '{}' after a successful read: {source}", locator.display())]
    ResourceClose {
        locator: PathBuf,
        #[source]
        source: Box<CfError>,
    },

    /// A group in the group path does not exist
    #[error("Group '{group}' not found in '{path}'")]
    GroupNotFound { group: String, path: String },

    /// Neither the variable name nor the positional id resolved
    #[error("Variable {var} not found in file")]
    VariableNotFound { var: String },

    /// An on-disk array was described with neither a name nor an id
    #[error("An on-disk array requires a variable name or a positional id")]
    InvalidVariableReference,

    /// A selector lies outside the declared shape
    #[error("Index error: {message}")]
    IndexOutOfBounds { message: String },

    /// A count or list table is inconsistent with the compressed data
    #[error("Compression index error: {message}")]
    CompressionIndex { message: String },

    /// Two shapes that must agree do not
    #[error("Shape mismatch: {message}")]
    ShapeMismatch { message: String },

    /// Strict-type equality requested between different kinds
    #[error("Type mismatch: cannot compare {expected} with {found}")]
    TypeMismatch { expected: String, found: String },

    /// A data container was accessed before an array was set
    #[error("Data has no array")]
    ArrayNotSet,

    /// The storage holds a type this crate cannot represent
    #[error("Unsupported data type: {0}")]
    UnsupportedType(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// NetCDF library errors
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// Array shape or dimension error
    #[error("Array error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CfError {
    pub(crate) fn index(message: impl Into<String>) -> Self {
        Self::IndexOutOfBounds {
            message: message.into(),
        }
    }

    pub(crate) fn compression(message: impl Into<String>) -> Self {
        Self::CompressionIndex {
            message: message.into(),
        }
    }

    pub(crate) fn shape_mismatch(message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            message: message.into(),
        }
    }
}

/// Result type alias for cfdm operations
pub type Result<T> = std::result::Result<T, CfError>;
