//! CYGNSS L1 file reader.
//!
//! Flattens one granule's `[sample, ddm]` structure into a [`RecordSet`]:
//! one candidate per (sample, DDM channel), with per-sample attributes
//! broadcast across channels. Candidates are first filtered by geolocation
//! validity and bounding box. Ground-track bearings are estimated from every
//! candidate left at that point, then land proximity and quality flags are
//! screened.
//!
//! Records are laid out channel-major: all samples of channel 0, then all of
//! channel 1, and so on.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use netcdf_parser::{Variable, VariableSource};
use tracing::{debug, info};

use crate::bbox::BoundingBox;
use crate::catalog::{AttributeCatalog, AttributeLevel};
use crate::config::L1Config;
use crate::error::{L1Error, Result};
use crate::quality::QualityFlagTable;
use crate::radar::{corrected_snr, SnrCorrectionColumns, SnrTerms, CYGNSS_WAVELENGTH_M};
use crate::record::{DdmRecord, FilterStats, RecordSchema, RecordSet};
use crate::track::{estimate_bearings, TrackPoint};

/// Variables identifying samples, channels and spacecraft. Optional: when a
/// file lacks them, indices (and spacecraft 0) are used instead.
const SAMPLE_VARIABLE: &str = "sample";
const DDM_VARIABLE: &str = "ddm";
const SPACECRAFT_VARIABLE: &str = "spacecraft_num";
const TRACK_ID_VARIABLE: &str = "track_id";

/// Per-sample seconds since `time_coverage_start`.
const TIMESTAMP_VARIABLE: &str = "ddm_timestamp_utc";
const TIME_COVERAGE_START: &str = "time_coverage_start";

/// Options applied on top of the configuration for one reader.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReaderOptions {
    /// Keep only specular points inside this box (inclusive).
    pub bbox: Option<BoundingBox>,
    /// Keep only specular points flagged as over or near land.
    pub near_land: bool,
    /// Add a `ddm_snr_corrected` column computed from these columns.
    pub snr_correction: Option<SnrCorrectionColumns>,
}

/// Reads L1 granules into filtered record sets.
#[derive(Debug, Clone)]
pub struct L1Reader {
    catalog: AttributeCatalog,
    quality_flags: QualityFlagTable,
    near_land_flags: Vec<String>,
    options: ReaderOptions,
}

impl L1Reader {
    /// Build a reader from validated configuration.
    ///
    /// The catalog must contain `sp_lat` and `sp_lon` as per-DDM attributes,
    /// and every SNR correction input as a scalar attribute.
    pub fn new(config: &L1Config, options: ReaderOptions) -> Result<Self> {
        for required in ["sp_lat", "sp_lon"] {
            if config.catalog.level_of(required) != Some(AttributeLevel::Ddm) {
                return Err(L1Error::Config(format!(
                    "'{}' must be listed in L1.per_ddm_attributes",
                    required
                )));
            }
        }

        if let Some(columns) = &options.snr_correction {
            for name in columns.names() {
                if !config.catalog.is_scalar(name) {
                    return Err(L1Error::Config(format!(
                        "SNR correction needs scalar attribute '{}' in the catalog",
                        name
                    )));
                }
            }
        }

        if options.near_land && config.near_land_flags.is_empty() {
            return Err(L1Error::Config(
                "near-land filtering requested but L1.near_land_flags is empty".to_string(),
            ));
        }

        Ok(Self {
            catalog: config.catalog.clone(),
            quality_flags: config.quality_flags.clone(),
            near_land_flags: config.near_land_flags.clone(),
            options,
        })
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    pub fn quality_flags(&self) -> &QualityFlagTable {
        &self.quality_flags
    }

    /// Open and read one granule from disk.
    #[cfg(feature = "native")]
    pub fn read_file(&self, path: impl AsRef<std::path::Path>) -> Result<RecordSet> {
        let path = path.as_ref();
        let file = netcdf_parser::NetCdfFile::open(path).map_err(|e| match e {
            netcdf_parser::NetCdfError::IoError(source) => L1Error::io(path, source),
            other => L1Error::NetCdf {
                file: path.display().to_string(),
                message: other.to_string(),
            },
        })?;
        self.read_source(&file)
    }

    /// Read one granule through any variable source.
    pub fn read_source<S: VariableSource + ?Sized>(&self, source: &S) -> Result<RecordSet> {
        let file = source.source_name().to_string();

        self.check_variables_present(source)?;
        let (n_sample, n_ddm) = self.check_dimensions(source)?;

        let read = |name: &str| -> Result<Variable> {
            let mut variable = source
                .read_variable(name)
                .map_err(|e| L1Error::from_netcdf(&file, e))?;
            if name.contains("_lon") {
                normalize_longitudes(variable.values_mut());
            }
            Ok(variable)
        };

        let sample_vars: Vec<Variable> = self
            .catalog
            .per_sample()
            .iter()
            .map(|n| read(n.as_str()))
            .collect::<Result<_>>()?;
        let ddm_vars: Vec<Variable> = self
            .catalog
            .per_ddm()
            .iter()
            .map(|n| read(n.as_str()))
            .collect::<Result<_>>()?;
        let bin_vars: Vec<Variable> = self
            .catalog
            .per_bin()
            .iter()
            .map(|n| read(n.as_str()))
            .collect::<Result<_>>()?;
        let flag_vars: Vec<Variable> = self
            .quality_flags
            .variable_names()
            .map(read)
            .collect::<Result<_>>()?;

        let sample_ids = self.read_ids(source, SAMPLE_VARIABLE, n_sample, &file)?;
        let ddm_ids = self.read_ids(source, DDM_VARIABLE, n_ddm, &file)?;
        let spacecraft_num = self.read_spacecraft(source, &file)?;
        let timestamps = self.timestamps(source, &sample_vars);

        let schema = Arc::new(self.schema());
        let lat_idx = position(self.catalog.per_ddm(), "sp_lat");
        let lon_idx = position(self.catalog.per_ddm(), "sp_lon");
        let track_idx = self
            .catalog
            .per_ddm()
            .iter()
            .position(|n| n == TRACK_ID_VARIABLE);
        let snr_idx = self.snr_indices();

        let mut stats = FilterStats {
            candidates: n_sample * n_ddm,
            ..Default::default()
        };
        // Geolocated candidates inside the box, in channel-major order.
        let mut located: Vec<(usize, usize)> = Vec::new();
        let mut points: Vec<TrackPoint> = Vec::new();

        for d in 0..n_ddm {
            for s in 0..n_sample {
                let flat = s * n_ddm + d;

                let lat = ddm_vars[lat_idx].values()[flat];
                let lon = ddm_vars[lon_idx].values()[flat];
                if !lat.is_finite() || !lon.is_finite() {
                    stats.invalid_geolocation += 1;
                    continue;
                }

                if let Some(bbox) = &self.options.bbox {
                    if !bbox.contains_point(lon, lat) {
                        stats.outside_bbox += 1;
                        continue;
                    }
                }

                let track = track_idx
                    .map(|i| ddm_vars[i].values()[flat])
                    .filter(|t| t.is_finite())
                    .map(|t| t as i64)
                    .unwrap_or(ddm_ids[d]);

                located.push((s, d));
                points.push(TrackPoint {
                    spacecraft_num,
                    track,
                    sample_id: sample_ids[s],
                    ddm_id: ddm_ids[d],
                    lat,
                    lon,
                });
            }
        }

        let bearings = estimate_bearings(&points);
        let mut records = Vec::new();

        for ((s, d), bearing) in located.into_iter().zip(bearings) {
            let flat = s * n_ddm + d;

            let words = match flag_words(&flag_vars, flat) {
                Some(words) => words,
                None => {
                    debug!(file = %file, sample = s, ddm = d, "Unreadable quality flags");
                    stats.failed_quality += 1;
                    continue;
                }
            };

            if self.options.near_land && !self.quality_flags.any_set(&words, &self.near_land_flags) {
                stats.not_near_land += 1;
                continue;
            }

            if !self.quality_flags.passes(&words) {
                stats.failed_quality += 1;
                continue;
            }

            let mut values: Vec<f64> = sample_vars
                .iter()
                .map(|v| v.values()[s])
                .chain(ddm_vars.iter().map(|v| v.values()[flat]))
                .collect();
            if let Some(idx) = &snr_idx {
                values.push(corrected_snr(&idx.terms(&values), CYGNSS_WAVELENGTH_M));
            }

            let bins = bin_vars
                .iter()
                .map(|v| {
                    let stride = v.stride(2);
                    v.values()[flat * stride..(flat + 1) * stride].to_vec()
                })
                .collect();

            records.push(DdmRecord::new(
                schema.clone(),
                spacecraft_num,
                sample_ids[s],
                ddm_ids[d],
                timestamps.as_ref().and_then(|t| t[s]),
                values,
                bins,
                words,
                true,
                bearing,
            ));
        }

        stats.retained = records.len();

        info!(
            file = %file,
            candidates = stats.candidates,
            invalid_geolocation = stats.invalid_geolocation,
            outside_bbox = stats.outside_bbox,
            not_near_land = stats.not_near_land,
            failed_quality = stats.failed_quality,
            retained = stats.retained,
            "Read L1 granule"
        );

        Ok(RecordSet::new(file, schema, records, stats))
    }

    /// Fail with every absent catalogued or flag variable named at once.
    fn check_variables_present<S: VariableSource + ?Sized>(&self, source: &S) -> Result<()> {
        let missing: Vec<String> = self
            .catalog
            .iter()
            .map(|(_, name)| name)
            .chain(self.quality_flags.variable_names())
            .filter(|name| !source.has_variable(name))
            .map(str::to_string)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(L1Error::MissingVariables {
                file: source.source_name().to_string(),
                names: missing,
            })
        }
    }

    /// Check every variable's shape against `[sample, ddm]` taken from `sp_lat`.
    fn check_dimensions<S: VariableSource + ?Sized>(&self, source: &S) -> Result<(usize, usize)> {
        let file = source.source_name();
        let shape_of = |name: &str| {
            source
                .variable_shape(name)
                .map_err(|e| L1Error::from_netcdf(file, e))
        };

        let reference = shape_of("sp_lat")?;
        let (n_sample, n_ddm) = match reference.as_slice() {
            [n_sample, n_ddm] => (*n_sample, *n_ddm),
            _ => {
                return Err(L1Error::DimensionMismatch {
                    file: file.to_string(),
                    variable: "sp_lat".to_string(),
                    expected: "[sample, ddm]".to_string(),
                    found: reference,
                })
            }
        };

        let flag_levels = self
            .quality_flags
            .variable_names()
            .map(|name| (AttributeLevel::Ddm, name));

        for (level, name) in self.catalog.iter().chain(flag_levels) {
            let shape = shape_of(name)?;
            let ok = match level {
                AttributeLevel::Sample => shape == [n_sample],
                AttributeLevel::Ddm => shape == [n_sample, n_ddm],
                AttributeLevel::Bin => shape.len() >= 3 && shape[..2] == [n_sample, n_ddm],
            };
            if !ok {
                return Err(L1Error::DimensionMismatch {
                    file: file.to_string(),
                    variable: name.to_string(),
                    expected: level.describe_shape(n_sample, n_ddm),
                    found: shape,
                });
            }
        }

        Ok((n_sample, n_ddm))
    }

    fn read_ids<S: VariableSource + ?Sized>(
        &self,
        source: &S,
        name: &str,
        len: usize,
        file: &str,
    ) -> Result<Vec<i64>> {
        if !source.has_variable(name) {
            return Ok((0..len as i64).collect());
        }
        let variable = source
            .read_variable(name)
            .map_err(|e| L1Error::from_netcdf(file, e))?;
        if variable.len() != len {
            return Err(L1Error::DimensionMismatch {
                file: file.to_string(),
                variable: name.to_string(),
                expected: format!("[{}]", len),
                found: variable.shape().to_vec(),
            });
        }
        Ok(variable
            .values()
            .iter()
            .enumerate()
            .map(|(i, v)| if v.is_finite() { *v as i64 } else { i as i64 })
            .collect())
    }

    fn read_spacecraft<S: VariableSource + ?Sized>(&self, source: &S, file: &str) -> Result<u32> {
        if !source.has_variable(SPACECRAFT_VARIABLE) {
            return Ok(0);
        }
        let variable = source
            .read_variable(SPACECRAFT_VARIABLE)
            .map_err(|e| L1Error::from_netcdf(file, e))?;
        Ok(variable
            .values()
            .first()
            .filter(|v| v.is_finite() && **v >= 0.0)
            .map(|v| *v as u32)
            .unwrap_or(0))
    }

    /// Absolute per-sample timestamps, when the file provides both the
    /// coverage start and a catalogued `ddm_timestamp_utc`.
    fn timestamps<S: VariableSource + ?Sized>(
        &self,
        source: &S,
        sample_vars: &[Variable],
    ) -> Option<Vec<Option<DateTime<Utc>>>> {
        let idx = self
            .catalog
            .per_sample()
            .iter()
            .position(|n| n == TIMESTAMP_VARIABLE)?;
        let start = source.global_attribute(TIME_COVERAGE_START)?;
        let start = match DateTime::parse_from_rfc3339(start.trim()) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => {
                debug!(value = %start, error = %e, "Unparseable time_coverage_start");
                return None;
            }
        };

        Some(
            sample_vars[idx]
                .values()
                .iter()
                .map(|secs| {
                    if secs.is_finite() {
                        Some(start + Duration::nanoseconds((secs * 1e9).round() as i64))
                    } else {
                        None
                    }
                })
                .collect(),
        )
    }

    fn schema(&self) -> RecordSchema {
        let mut columns: Vec<String> = self
            .catalog
            .per_sample()
            .iter()
            .chain(self.catalog.per_ddm())
            .cloned()
            .collect();
        if self.options.snr_correction.is_some() {
            columns.push(SnrCorrectionColumns::OUTPUT.to_string());
        }
        RecordSchema::new(columns, self.catalog.per_bin().to_vec())
    }

    fn snr_indices(&self) -> Option<SnrIndices> {
        let columns = self.options.snr_correction.as_ref()?;
        let scalar: Vec<&String> = self
            .catalog
            .per_sample()
            .iter()
            .chain(self.catalog.per_ddm())
            .collect();
        let find = |name: &str| scalar.iter().position(|c| c.as_str() == name);

        Some(SnrIndices {
            ddm_snr: find(&columns.ddm_snr)?,
            tx_power: find(&columns.tx_power)?,
            rx_gain: find(&columns.rx_gain)?,
            tx_gain: find(&columns.tx_gain)?,
            rx_range: find(&columns.rx_range)?,
            tx_range: find(&columns.tx_range)?,
        })
    }
}

/// Positions of the SNR correction inputs within a record's values.
struct SnrIndices {
    ddm_snr: usize,
    tx_power: usize,
    rx_gain: usize,
    tx_gain: usize,
    rx_range: usize,
    tx_range: usize,
}

impl SnrIndices {
    fn terms(&self, values: &[f64]) -> SnrTerms {
        SnrTerms {
            ddm_snr_db: values[self.ddm_snr],
            tx_power_db: values[self.tx_power],
            rx_gain_db: values[self.rx_gain],
            tx_gain_db: values[self.tx_gain],
            rx_range_m: values[self.rx_range],
            tx_range_m: values[self.tx_range],
        }
    }
}

fn position(names: &[String], name: &str) -> usize {
    names.iter().position(|n| n == name).unwrap_or_default()
}

/// Packed flag words for one `[sample, ddm]` element, or `None` if any word
/// is a fill value.
fn flag_words(flag_vars: &[Variable], flat: usize) -> Option<Vec<u32>> {
    flag_vars
        .iter()
        .map(|v| {
            let raw = v.values()[flat];
            if raw.is_finite() && raw >= 0.0 && raw <= u32::MAX as f64 {
                Some(raw as u32)
            } else {
                None
            }
        })
        .collect()
}

/// Rescale longitudes from [0, 360) to (-180, 180].
pub fn normalize_longitudes(values: &mut [f64]) {
    for v in values.iter_mut() {
        if *v > 180.0 {
            *v -= 360.0;
        }
    }
}
