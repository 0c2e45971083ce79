//! Specular-point footprint ellipses.
//!
//! The footprint of one DDM sample is modelled as an ellipse centred on the
//! specular point. Its cross-track width is the first Fresnel zone
//! `2 * sqrt(r_rx * r_tx * lambda / (r_rx + r_tx))`; along track that zone is
//! stretched by `1 / cos(incidence)` and smeared by the distance the specular
//! point travels during one integration. The major axis follows the ground
//! track bearing the reader attached to each record.
//!
//! Axis lengths are kept in metres. Degrees are only produced when the
//! ellipse is turned into a polygon, using a local tangent plane at the
//! centre.

use std::f64::consts::PI;

use tracing::warn;

use crate::error::FootprintError;
use crate::radar::{CYGNSS_INTEGRATION_DISTANCE_M, CYGNSS_WAVELENGTH_M, EARTH_RADIUS_M};
use crate::record::{DdmRecord, RecordSet};

const INCIDENCE_COLUMN: &str = "sp_inc_angle";
const RX_RANGE_COLUMN: &str = "rx_to_sp_range";
const TX_RANGE_COLUMN: &str = "tx_to_sp_range";

/// A footprint ellipse on the ground.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootprintEllipse {
    pub center_lon: f64,
    pub center_lat: f64,
    /// Half-length along the ground track (m).
    pub semi_major_m: f64,
    /// Half-width across the ground track (m).
    pub semi_minor_m: f64,
    /// Direction of the major axis, degrees clockwise from north.
    pub bearing_deg: f64,
}

impl FootprintEllipse {
    /// Closed polygon ring of `vertices` distinct points (first point
    /// repeated at the end), counter-clockwise, as `[lon, lat]` pairs.
    ///
    /// Longitudes are continuous around the centre and are not wrapped: a
    /// footprint straddling the antimeridian has vertices beyond ±180°
    /// rather than being cut in two.
    pub fn polygon(&self, vertices: usize) -> Vec<[f64; 2]> {
        let vertices = vertices.max(3);
        let bearing = self.bearing_deg.to_radians();
        let (sin_b, cos_b) = bearing.sin_cos();
        let lat_rad = self.center_lat.to_radians();
        let m_per_deg_lat = EARTH_RADIUS_M.to_radians();
        let m_per_deg_lon = m_per_deg_lat * lat_rad.cos();

        let mut ring: Vec<[f64; 2]> = (0..vertices)
            .map(|k| {
                let t = 2.0 * PI * k as f64 / vertices as f64;
                let (sin_t, cos_t) = t.sin_cos();
                let along = self.semi_major_m * cos_t;
                let across = self.semi_minor_m * sin_t;
                // Major axis points along (sin b, cos b) in east/north; the
                // minor axis is its left-hand normal, giving a CCW ring.
                let east = along * sin_b - across * cos_b;
                let north = along * cos_b + across * sin_b;
                [
                    self.center_lon + east / m_per_deg_lon,
                    self.center_lat + north / m_per_deg_lat,
                ]
            })
            .collect();

        if let Some(first) = ring.first().copied() {
            ring.push(first);
        }
        ring
    }
}

/// Physical constants of the footprint model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootprintModel {
    pub wavelength_m: f64,
    pub integration_distance_m: f64,
}

impl Default for FootprintModel {
    fn default() -> Self {
        Self {
            wavelength_m: CYGNSS_WAVELENGTH_M,
            integration_distance_m: CYGNSS_INTEGRATION_DISTANCE_M,
        }
    }
}

impl FootprintModel {
    /// Full cross-track size (m).
    pub fn cross_track_size(&self, rx_range_m: f64, tx_range_m: f64) -> f64 {
        2.0 * (rx_range_m * tx_range_m * self.wavelength_m / (rx_range_m + tx_range_m)).sqrt()
    }

    /// Full along-track size of the instantaneous zone (m), before the
    /// integration smear.
    pub fn along_track_size(&self, incidence_deg: f64, rx_range_m: f64, tx_range_m: f64) -> f64 {
        let elevation = (90.0 - incidence_deg).to_radians();
        self.cross_track_size(rx_range_m, tx_range_m) / elevation.sin()
    }

    /// Build the ellipse for one record given its track bearing.
    pub fn ellipse(&self, record: &DdmRecord, bearing_deg: f64) -> Result<FootprintEllipse, FootprintError> {
        let attr = |name: &str| {
            record
                .value(name)
                .ok_or_else(|| FootprintError::MissingAttribute {
                    sample_id: record.sample_id(),
                    ddm_id: record.ddm_id(),
                    name: name.to_string(),
                })
        };
        let malformed = |reason: String| FootprintError::MalformedGeometry {
            sample_id: record.sample_id(),
            ddm_id: record.ddm_id(),
            reason,
        };

        let incidence = attr(INCIDENCE_COLUMN)?;
        let rx_range = attr(RX_RANGE_COLUMN)?;
        let tx_range = attr(TX_RANGE_COLUMN)?;

        if !(incidence.is_finite() && (0.0..90.0).contains(&incidence)) {
            return Err(malformed(format!("incidence angle {} outside [0, 90)", incidence)));
        }
        if !(rx_range.is_finite() && rx_range > 0.0) {
            return Err(malformed(format!("receiver range {} not positive", rx_range)));
        }
        if !(tx_range.is_finite() && tx_range > 0.0) {
            return Err(malformed(format!("transmitter range {} not positive", tx_range)));
        }
        if !bearing_deg.is_finite() {
            return Err(malformed("undefined track bearing".to_string()));
        }

        let (lat, lon) = (record.sp_lat(), record.sp_lon());
        if !(lat.is_finite() && lon.is_finite() && lat.abs() < 89.0) {
            return Err(malformed(format!("specular point ({}, {}) unusable", lon, lat)));
        }

        let along = self.along_track_size(incidence, rx_range, tx_range);
        let across = self.cross_track_size(rx_range, tx_range);

        Ok(FootprintEllipse {
            center_lon: lon,
            center_lat: lat,
            semi_major_m: (along + self.integration_distance_m) / 2.0,
            semi_minor_m: across / 2.0,
            bearing_deg,
        })
    }
}

/// A record paired with its footprint.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatedFootprint<'a> {
    pub record: &'a DdmRecord,
    pub ellipse: FootprintEllipse,
}

/// Footprints for one record set, plus the records that could not get one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FootprintReport<'a> {
    pub footprints: Vec<EstimatedFootprint<'a>>,
    pub failures: Vec<FootprintError>,
}

/// Turns record sets into footprints.
#[derive(Debug, Clone, Copy, Default)]
pub struct FootprintEstimator {
    model: FootprintModel,
}

impl FootprintEstimator {
    pub fn new(model: FootprintModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &FootprintModel {
        &self.model
    }

    /// Estimate every record's footprint, in record order. Failures are
    /// collected per record and never stop the rest.
    pub fn estimate<'a>(&self, records: &'a RecordSet) -> FootprintReport<'a> {
        let mut report = FootprintReport::default();

        for record in records {
            match record.bearing().and_then(|b| self.model.ellipse(record, b)) {
                Ok(ellipse) => report.footprints.push(EstimatedFootprint { record, ellipse }),
                Err(e) => {
                    warn!(file = %records.source(), error = %e, "Footprint not estimated");
                    report.failures.push(e);
                }
            }
        }

        report
    }
}
