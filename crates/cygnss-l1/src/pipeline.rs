//! Read, estimate and export in one call.

use std::path::Path;

use netcdf_parser::VariableSource;
use tracing::info;

use crate::error::Result;
use crate::footprint::FootprintEstimator;
use crate::geojson::GeoJsonWriter;
use crate::reader::L1Reader;
use crate::record::{FilterStats, RecordSet};

/// What one export produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    pub source: String,
    pub filter: FilterStats,
    pub features_written: usize,
    pub footprint_failures: usize,
}

/// Read a granule, estimate footprints for every retained record and write
/// them as GeoJSON to `output`.
///
/// Records whose footprint cannot be estimated are counted and left out of
/// the file; they do not fail the export.
pub fn export_footprints<S: VariableSource + ?Sized>(
    reader: &L1Reader,
    source: &S,
    estimator: &FootprintEstimator,
    writer: &GeoJsonWriter,
    output: impl AsRef<Path>,
) -> Result<PipelineSummary> {
    let records = reader.read_source(source)?;
    export_records(&records, estimator, writer, output)
}

/// Estimate and write footprints for records already read.
pub fn export_records(
    records: &RecordSet,
    estimator: &FootprintEstimator,
    writer: &GeoJsonWriter,
    output: impl AsRef<Path>,
) -> Result<PipelineSummary> {
    writer.check_columns(records.schema())?;
    let report = estimator.estimate(records);
    let features_written = writer.write(&report.footprints, output)?;

    let summary = PipelineSummary {
        source: records.source().to_string(),
        filter: records.stats(),
        features_written,
        footprint_failures: report.failures.len(),
    };

    info!(
        source = %summary.source,
        retained = summary.filter.retained,
        features = summary.features_written,
        footprint_failures = summary.footprint_failures,
        "Footprint export complete"
    );

    Ok(summary)
}
