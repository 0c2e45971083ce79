//! CYGNSS Level 1 DDM processing.
//!
//! Reads L1 granules into per-(sample, DDM) records, screens them with the
//! configured quality-flag bits, estimates a footprint ellipse for each
//! retained specular point and writes the ellipses as GeoJSON polygons.
//!
//! ```ignore
//! use cygnss_l1::{CygnssConfig, L1Reader, ReaderOptions, FootprintEstimator, GeoJsonWriter};
//!
//! let config = CygnssConfig::load("config/cygnss.yaml")?;
//! let reader = L1Reader::new(&config.l1, ReaderOptions::default())?;
//! let records = reader.read_file("cyg01.ddmi.s20230101-000000-e20230101-235959.l1.power-brcs.a31.d32.nc")?;
//! let report = FootprintEstimator::default().estimate(&records);
//! GeoJsonWriter::new().write(&report.footprints, "footprints.geojson")?;
//! ```

pub mod archive;
pub mod bbox;
pub mod catalog;
pub mod config;
pub mod error;
pub mod footprint;
pub mod geojson;
pub mod pipeline;
pub mod quality;
pub mod radar;
pub mod reader;
pub mod record;
pub mod track;

pub use archive::{
    granule_file_name, parse_granule_name, read_batch, BatchReport, GranuleInfo, LocalArchive,
    ProductLevel,
};
pub use bbox::{BboxParseError, BoundingBox, CYGNSS_COVERAGE};
pub use catalog::{AttributeCatalog, AttributeLevel};
pub use config::{CygnssConfig, DownloadConfig, L1Config, DEFAULT_CONFIG_PATH};
pub use error::{FootprintError, L1Error, Result};
pub use footprint::{
    EstimatedFootprint, FootprintEllipse, FootprintEstimator, FootprintModel, FootprintReport,
};
pub use geojson::{read_collection, FootprintCollection, FootprintFeature, GeoJsonWriter};
pub use pipeline::{export_footprints, export_records, PipelineSummary};
pub use quality::{QualityFlagEntry, QualityFlagGroup, QualityFlagTable};
pub use radar::SnrCorrectionColumns;
pub use reader::{L1Reader, ReaderOptions};
pub use record::{DdmRecord, FilterStats, RecordSchema, RecordSet};

pub use netcdf_parser::{MemorySource, Variable, VariableSource};
#[cfg(feature = "native")]
pub use netcdf_parser::{silence_hdf5_errors, NetCdfFile};
