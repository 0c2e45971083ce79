//! `cygnss footprints`: export footprint polygons for one granule or for a
//! date range of the local archive.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use tracing::{info, warn};

use cygnss_l1::{
    export_records, CygnssConfig, FootprintEstimator, GeoJsonWriter, L1Reader, LocalArchive,
    PipelineSummary, ProductLevel, ReaderOptions,
};

/// What to read and how to write it.
#[derive(Debug, Clone)]
pub struct FootprintJob {
    pub source: JobSource,
    /// A file for a single granule, a directory for a date range.
    pub output: PathBuf,
    pub options: ReaderOptions,
    pub columns: Option<Vec<String>>,
    pub vertices: usize,
}

#[derive(Debug, Clone)]
pub enum JobSource {
    File(PathBuf),
    Archive {
        root: PathBuf,
        version: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

/// Run the job synchronously, one granule at a time.
pub fn run(config: &CygnssConfig, job: &FootprintJob) -> Result<Vec<PipelineSummary>> {
    cygnss_l1::silence_hdf5_errors();

    let reader = L1Reader::new(&config.l1, job.options.clone())
        .context("Invalid reader options for this configuration")?;
    let estimator = FootprintEstimator::default();
    let mut writer = GeoJsonWriter::new().with_vertices(job.vertices);
    if let Some(columns) = &job.columns {
        writer = writer.with_columns(columns.clone());
    }

    match &job.source {
        JobSource::File(input) => {
            let records = reader
                .read_file(input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let summary = export_records(&records, &estimator, &writer, &job.output)
                .with_context(|| format!("Failed to write {}", job.output.display()))?;
            Ok(vec![summary])
        }
        JobSource::Archive {
            root,
            version,
            start,
            end,
        } => {
            if !job.output.is_dir() {
                return Err(anyhow!(
                    "Output {} must be an existing directory for a date range",
                    job.output.display()
                ));
            }

            let archive = LocalArchive::new(root, ProductLevel::L1, version.as_str());
            let batch = archive.read_date_range(&reader, *start, *end)?;

            let mut summaries = Vec::with_capacity(batch.record_sets.len());
            for records in &batch.record_sets {
                let output = output_path(&job.output, records.source());
                match export_records(records, &estimator, &writer, &output) {
                    Ok(summary) => summaries.push(summary),
                    Err(e) => warn!(source = %records.source(), error = %e, "Export failed"),
                }
            }

            info!(
                granules = summaries.len(),
                unreadable = batch.failures.len(),
                "Date range export complete"
            );
            Ok(summaries)
        }
    }
}

/// `<dir>/<granule stem>.geojson`
fn output_path(dir: &Path, source: &str) -> PathBuf {
    let stem = Path::new(source)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string());
    dir.join(format!("{}.geojson", stem))
}
