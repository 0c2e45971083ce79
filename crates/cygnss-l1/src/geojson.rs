//! GeoJSON export of footprint polygons.
//!
//! Each footprint becomes one `Feature` with a `Polygon` geometry (the
//! ellipse ring) and the source record's non-geometry attributes as
//! properties. Coordinates are WGS84 longitude/latitude.
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc7946>

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::info;

use crate::error::{L1Error, Result};
use crate::footprint::EstimatedFootprint;
use crate::record::{DdmRecord, RecordSchema};

/// Default number of distinct vertices per ellipse ring.
pub const DEFAULT_VERTICES: usize = 48;

/// Identity columns every record exposes besides its catalogued attributes.
pub const IDENTITY_COLUMNS: [&str; 4] = ["spacecraft_num", "sample_id", "ddm_id", "timestamp"];

/// A GeoJSON FeatureCollection of footprints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FootprintCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    /// Named CRS member, kept for GIS tools that still look for it.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub crs: Option<NamedCrs>,

    pub features: Vec<FootprintFeature>,
}

impl FootprintCollection {
    pub fn new() -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            crs: Some(NamedCrs::crs84()),
            features: Vec::new(),
        }
    }

    pub fn with_features(mut self, features: Vec<FootprintFeature>) -> Self {
        self.features.extend(features);
        self
    }
}

impl Default for FootprintCollection {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedCrs {
    #[serde(rename = "type")]
    pub type_: String,
    pub properties: CrsName,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrsName {
    pub name: String,
}

impl NamedCrs {
    /// OGC CRS84: WGS84 with longitude first.
    pub fn crs84() -> Self {
        Self {
            type_: "name".to_string(),
            properties: CrsName {
                name: "urn:ogc:def:crs:OGC:1.3:CRS84".to_string(),
            },
        }
    }
}

/// One footprint feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FootprintFeature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    pub geometry: FootprintGeometry,

    pub properties: Map<String, Value>,
}

/// Footprints are always polygons.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum FootprintGeometry {
    Polygon {
        /// Linear rings of `[lon, lat]`; only the exterior ring is used.
        coordinates: Vec<Vec<[f64; 2]>>,
    },
}

impl FootprintGeometry {
    pub fn exterior(&self) -> &[[f64; 2]] {
        match self {
            FootprintGeometry::Polygon { coordinates } => {
                coordinates.first().map(Vec::as_slice).unwrap_or(&[])
            }
        }
    }
}

/// Writes footprints as a GeoJSON file.
#[derive(Debug, Clone)]
pub struct GeoJsonWriter {
    vertices: usize,
    columns: Option<Vec<String>>,
}

impl Default for GeoJsonWriter {
    fn default() -> Self {
        Self {
            vertices: DEFAULT_VERTICES,
            columns: None,
        }
    }
}

impl GeoJsonWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct ring vertices per ellipse (at least 4).
    pub fn with_vertices(mut self, vertices: usize) -> Self {
        self.vertices = vertices.max(4);
        self
    }

    /// Export only these properties instead of every attribute.
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn vertices(&self) -> usize {
        self.vertices
    }

    /// Fail if a selected column is neither an identity column nor an
    /// attribute of `schema`.
    pub fn check_columns(&self, schema: &RecordSchema) -> Result<()> {
        let Some(columns) = &self.columns else {
            return Ok(());
        };
        match columns.iter().find(|column| {
            !IDENTITY_COLUMNS.contains(&column.as_str())
                && schema.position(column).is_none()
                && schema.bin_position(column).is_none()
        }) {
            Some(unknown) => Err(L1Error::Config(format!(
                "export column '{}' is not a record attribute",
                unknown
            ))),
            None => Ok(()),
        }
    }

    /// Build the collection in memory.
    ///
    /// Selected columns are checked against the records' schema.
    pub fn build_collection(&self, footprints: &[EstimatedFootprint<'_>]) -> Result<FootprintCollection> {
        if let Some(first) = footprints.first() {
            self.check_columns(first.record.schema())?;
        }

        let features = footprints
            .iter()
            .map(|fp| FootprintFeature {
                type_: "Feature".to_string(),
                geometry: FootprintGeometry::Polygon {
                    coordinates: vec![fp.ellipse.polygon(self.vertices)],
                },
                properties: self.properties(fp.record),
            })
            .collect();

        Ok(FootprintCollection::new().with_features(features))
    }

    /// Write footprints to `path`, replacing any existing file.
    ///
    /// The parent directory must already exist. Returns the number of
    /// features written.
    pub fn write(&self, footprints: &[EstimatedFootprint<'_>], path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return Err(L1Error::io(
                    parent,
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "output directory does not exist",
                    ),
                ));
            }
        }

        let collection = self.build_collection(footprints)?;

        let file = File::create(path).map_err(|e| L1Error::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &collection).map_err(|e| {
            if e.is_io() {
                L1Error::io(path, e.into())
            } else {
                e.into()
            }
        })?;
        writer.flush().map_err(|e| L1Error::io(path, e))?;

        info!(
            path = %path.display(),
            features = collection.features.len(),
            "Wrote footprint GeoJSON"
        );

        Ok(collection.features.len())
    }

    fn properties(&self, record: &DdmRecord) -> Map<String, Value> {
        let mut props = Map::new();
        let wanted = |name: &str| {
            self.columns
                .as_ref()
                .map_or(true, |cols| cols.iter().any(|c| c == name))
        };

        if wanted("spacecraft_num") {
            props.insert("spacecraft_num".into(), Value::from(record.spacecraft_num()));
        }
        if wanted("sample_id") {
            props.insert("sample_id".into(), Value::from(record.sample_id()));
        }
        if wanted("ddm_id") {
            props.insert("ddm_id".into(), Value::from(record.ddm_id()));
        }
        if wanted("timestamp") {
            if let Some(ts) = record.timestamp() {
                props.insert("timestamp".into(), Value::from(ts.to_rfc3339()));
            }
        }

        for (name, value) in record.attributes().filter(|(n, _)| wanted(*n)) {
            props.insert(name.to_string(), number(value));
        }
        for (name, values) in record.bin_attributes().filter(|(n, _)| wanted(*n)) {
            props.insert(
                name.to_string(),
                Value::Array(values.iter().copied().map(number).collect()),
            );
        }

        props
    }
}

/// NaN and infinities have no JSON representation; they become `null`.
fn number(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

/// Read a footprint file back.
pub fn read_collection(path: impl AsRef<Path>) -> Result<FootprintCollection> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| L1Error::io(path, e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_serialization() {
        let geometry = FootprintGeometry::Polygon {
            coordinates: vec![vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 0.0]]],
        };
        let json = serde_json::to_value(&geometry).unwrap();
        assert_eq!(json["type"], "Polygon");
        assert_eq!(json["coordinates"][0][1][0], 1.0);
        assert_eq!(geometry.exterior().len(), 4);
    }

    #[test]
    fn test_empty_collection() {
        let json = serde_json::to_value(FootprintCollection::new()).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["crs"]["properties"]["name"], "urn:ogc:def:crs:OGC:1.3:CRS84");
        assert!(json["features"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_non_finite_becomes_null() {
        assert_eq!(number(f64::NAN), Value::Null);
        assert_eq!(number(2.5), Value::from(2.5));
    }

    #[test]
    fn test_write_requires_parent_dir() {
        let result = GeoJsonWriter::new().write(&[], "/nonexistent/dir/out.geojson");
        assert!(matches!(result, Err(L1Error::Io { .. })));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_write_reports_path() {
        use crate::footprint::FootprintEllipse;
        use crate::record::testing::{record, schema};

        let full = Path::new("/dev/full");
        if !full.exists() {
            return;
        }

        let schema = schema(&["sp_lat", "sp_lon", "ddm_snr"]);
        let records: Vec<DdmRecord> = (0..200)
            .map(|s| record(&schema, s, 0, &[0.0, 10.0, 3.5]))
            .collect();
        let footprints: Vec<EstimatedFootprint<'_>> = records
            .iter()
            .map(|record| EstimatedFootprint {
                record,
                ellipse: FootprintEllipse {
                    center_lon: 10.0,
                    center_lat: 0.0,
                    semi_major_m: 5_000.0,
                    semi_minor_m: 1_000.0,
                    bearing_deg: 0.0,
                },
            })
            .collect();

        match GeoJsonWriter::new().write(&footprints, full) {
            Err(L1Error::Io { path, .. }) => assert_eq!(path, full.to_path_buf()),
            other => panic!("expected an I/O error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_column_rejected_without_footprints() {
        use crate::record::testing::schema;

        let schema = schema(&["sp_lat", "sp_lon", "ddm_snr"]);
        let writer = GeoJsonWriter::new().with_columns(vec!["ddm_snr".into(), "sample_id".into()]);
        assert!(writer.check_columns(&schema).is_ok());

        let writer = GeoJsonWriter::new().with_columns(vec!["ddm_snr_v9".into()]);
        assert!(matches!(writer.check_columns(&schema), Err(L1Error::Config(_))));
    }
}
