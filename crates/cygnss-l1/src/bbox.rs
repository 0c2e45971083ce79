//! Geographic bounding box used for spatial filtering.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Latitude band covered by the CYGNSS constellation (`xmin, ymin, xmax, ymax`).
pub const CYGNSS_COVERAGE: BoundingBox = BoundingBox {
    min_x: -180.0,
    min_y: -38.0,
    max_x: 180.0,
    max_y: 38.0,
};

/// A lon/lat bounding box in degrees (EPSG:4326).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a bounding box, rejecting inverted or non-finite corners.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, BboxParseError> {
        let bbox = Self {
            min_x,
            min_y,
            max_x,
            max_y,
        };
        if ![min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite()) {
            return Err(BboxParseError::NonFinite(bbox.to_string()));
        }
        if min_x > max_x || min_y > max_y {
            return Err(BboxParseError::Inverted(bbox.to_string()));
        }
        Ok(bbox)
    }

    /// Inclusive containment: points on any edge are inside.
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_x && lon <= self.max_x && lat >= self.min_y && lat <= self.max_y
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{},{}", self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

/// Parses `"xmin,ymin,xmax,ymax"`.
impl FromStr for BoundingBox {
    type Err = BboxParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let mut values = [0.0f64; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))?;
        }

        Self::new(values[0], values[1], values[2], values[3])
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BboxParseError {
    #[error("Invalid bounding box: {0}. Expected 'xmin,ymin,xmax,ymax'")]
    InvalidFormat(String),

    #[error("Invalid number in bounding box: {0}")]
    InvalidNumber(String),

    #[error("Bounding box has min > max: {0}")]
    Inverted(String),

    #[error("Bounding box has non-finite corner: {0}")]
    NonFinite(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bbox() {
        let bbox: BoundingBox = "-125.0, 24.0, -66.0, 50.0".parse().unwrap();
        assert_eq!(bbox.min_x, -125.0);
        assert_eq!(bbox.min_y, 24.0);
        assert_eq!(bbox.max_x, -66.0);
        assert_eq!(bbox.max_y, 50.0);
    }

    #[test]
    fn test_parse_bbox_errors() {
        assert!(matches!(
            "1,2,3".parse::<BoundingBox>(),
            Err(BboxParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            "a,2,3,4".parse::<BoundingBox>(),
            Err(BboxParseError::InvalidNumber(_))
        ));
        assert!(matches!(
            "10,0,5,1".parse::<BoundingBox>(),
            Err(BboxParseError::Inverted(_))
        ));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let bbox = BoundingBox::new(-10.0, -5.0, 10.0, 5.0).unwrap();
        assert!(bbox.contains_point(-10.0, 0.0));
        assert!(bbox.contains_point(10.0, 0.0));
        assert!(bbox.contains_point(0.0, -5.0));
        assert!(bbox.contains_point(0.0, 5.0));
        assert!(bbox.contains_point(10.0, 5.0));
        assert!(!bbox.contains_point(10.000001, 0.0));
        assert!(!bbox.contains_point(f64::NAN, 0.0));
    }

    #[test]
    fn test_coverage_band() {
        assert!(CYGNSS_COVERAGE.contains_point(0.0, 38.0));
        assert!(!CYGNSS_COVERAGE.contains_point(0.0, 40.0));
        assert!(CYGNSS_COVERAGE.contains_point(-180.0, -38.0));
    }
}
