//! Tabular DDM records produced by the file reader.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::FootprintError;

/// Column layout shared by every record of one file.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    columns: Vec<String>,
    bin_columns: Vec<String>,
    index: HashMap<String, usize>,
    bin_index: HashMap<String, usize>,
}

impl RecordSchema {
    pub fn new(columns: Vec<String>, bin_columns: Vec<String>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        let bin_index = bin_columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        Self {
            columns,
            bin_columns,
            index,
            bin_index,
        }
    }

    /// Scalar columns, in catalog order (per-sample, then per-DDM, then derived).
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Per-bin columns, in catalog order.
    pub fn bin_columns(&self) -> &[String] {
        &self.bin_columns
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn bin_position(&self, name: &str) -> Option<usize> {
        self.bin_index.get(name).copied()
    }
}

/// One (sample, DDM channel) observation that survived filtering.
///
/// Records are immutable once the reader has built them.
#[derive(Debug, Clone, PartialEq)]
pub struct DdmRecord {
    schema: Arc<RecordSchema>,
    spacecraft_num: u32,
    sample_id: i64,
    ddm_id: i64,
    timestamp: Option<DateTime<Utc>>,
    values: Vec<f64>,
    bins: Vec<Vec<f64>>,
    quality_words: Vec<u32>,
    quality_pass: bool,
    bearing: Result<f64, FootprintError>,
}

impl DdmRecord {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        schema: Arc<RecordSchema>,
        spacecraft_num: u32,
        sample_id: i64,
        ddm_id: i64,
        timestamp: Option<DateTime<Utc>>,
        values: Vec<f64>,
        bins: Vec<Vec<f64>>,
        quality_words: Vec<u32>,
        quality_pass: bool,
        bearing: Result<f64, FootprintError>,
    ) -> Self {
        debug_assert_eq!(values.len(), schema.columns.len());
        debug_assert_eq!(bins.len(), schema.bin_columns.len());
        Self {
            schema,
            spacecraft_num,
            sample_id,
            ddm_id,
            timestamp,
            values,
            bins,
            quality_words,
            quality_pass,
            bearing,
        }
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn spacecraft_num(&self) -> u32 {
        self.spacecraft_num
    }

    pub fn sample_id(&self) -> i64 {
        self.sample_id
    }

    pub fn ddm_id(&self) -> i64 {
        self.ddm_id
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Scalar attribute by name.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.schema.position(name).map(|i| self.values[i])
    }

    /// Per-bin attribute by name, flattened row-major over the bin dimensions.
    pub fn bins(&self, name: &str) -> Option<&[f64]> {
        self.schema.bin_position(name).map(|i| self.bins[i].as_slice())
    }

    pub fn sp_lat(&self) -> f64 {
        self.value("sp_lat").unwrap_or(f64::NAN)
    }

    pub fn sp_lon(&self) -> f64 {
        self.value("sp_lon").unwrap_or(f64::NAN)
    }

    /// Scalar attributes in schema order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, f64)> {
        self.schema
            .columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Per-bin attributes in schema order.
    pub fn bin_attributes(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.schema
            .bin_columns
            .iter()
            .map(String::as_str)
            .zip(self.bins.iter().map(Vec::as_slice))
    }

    /// Packed quality-flag words, one per flag group.
    pub fn quality_words(&self) -> &[u32] {
        &self.quality_words
    }

    pub fn quality_pass(&self) -> bool {
        self.quality_pass
    }

    /// Ground-track bearing at the specular point (degrees clockwise from
    /// north), or why the track could not give one.
    pub fn bearing(&self) -> Result<f64, FootprintError> {
        self.bearing.clone()
    }
}

/// How many candidates each filter stage removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub candidates: usize,
    pub invalid_geolocation: usize,
    pub outside_bbox: usize,
    pub not_near_land: usize,
    pub failed_quality: usize,
    pub retained: usize,
}

/// All records retained from one file, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    source: String,
    schema: Arc<RecordSchema>,
    records: Vec<DdmRecord>,
    stats: FilterStats,
}

impl RecordSet {
    pub(crate) fn new(
        source: String,
        schema: Arc<RecordSchema>,
        records: Vec<DdmRecord>,
        stats: FilterStats,
    ) -> Self {
        Self {
            source,
            schema,
            records,
            stats,
        }
    }

    /// Identifier of the file the records came from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn records(&self) -> &[DdmRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DdmRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> FilterStats {
        self.stats
    }

}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a DdmRecord;
    type IntoIter = std::slice::Iter<'a, DdmRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
