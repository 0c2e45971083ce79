//! Error types for NetCDF variable access.

use thiserror::Error;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF parsing.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Variable not present in the source
    #[error("Variable '{name}' not found in {source_name}")]
    MissingVariable { source_name: String, name: String },

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Declared shape does not match the number of values
    #[error("Variable '{name}' has shape {shape:?} but {len} values")]
    ShapeMismatch {
        name: String,
        shape: Vec<usize>,
        len: usize,
    },
}
