//! Error types for the CYGNSS L1 pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// File-level and configuration errors.
///
/// Any of these aborts the operation that raised it. In a multi-file batch a
/// per-file error is recorded and the batch moves on to the next file.
#[derive(Error, Debug)]
pub enum L1Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Missing variable(s) in {file}: {}", .names.join(", "))]
    MissingVariables { file: String, names: Vec<String> },

    #[error("Variable '{variable}' in {file} has shape {found:?}, expected {expected}")]
    DimensionMismatch {
        file: String,
        variable: String,
        expected: String,
        found: Vec<usize>,
    },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {file}: {message}")]
    NetCdf { file: String, message: String },

    #[error("Failed to serialize output: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl L1Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        L1Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn from_netcdf(file: &str, err: netcdf_parser::NetCdfError) -> Self {
        match err {
            netcdf_parser::NetCdfError::MissingVariable { name, .. } => L1Error::MissingVariables {
                file: file.to_string(),
                names: vec![name],
            },
            other => L1Error::NetCdf {
                file: file.to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Result type for L1 operations.
pub type Result<T> = std::result::Result<T, L1Error>;

/// Per-record footprint failures. These never abort a file; the record is
/// reported and left out of the export.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FootprintError {
    #[error(
        "Sample {sample_id} DDM {ddm_id}: track pass has {points} point(s), need at least {required}"
    )]
    InsufficientTrackPoints {
        sample_id: i64,
        ddm_id: i64,
        points: usize,
        required: usize,
    },

    #[error("Sample {sample_id} DDM {ddm_id}: malformed geometry ({reason})")]
    MalformedGeometry {
        sample_id: i64,
        ddm_id: i64,
        reason: String,
    },

    #[error("Sample {sample_id} DDM {ddm_id}: attribute '{name}' not in record")]
    MissingAttribute {
        sample_id: i64,
        ddm_id: i64,
        name: String,
    },
}
