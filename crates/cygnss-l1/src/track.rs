//! Ground-track bearing estimation.
//!
//! A footprint ellipse is oriented along the direction the specular point
//! travels. That direction is not in the file, so it is recovered from
//! neighbouring specular points of the same track: points are grouped by
//! (spacecraft, track), ordered by sample, and split wherever the latitude
//! switches between ascending and descending.
//!
//! The reader estimates bearings from every geolocated point inside the
//! bounding box, before quality and land screening, so a screened-out
//! neighbour still orients the records around it.

use std::collections::HashMap;
use std::ops::Range;

use crate::error::FootprintError;

/// Fewest points a pass needs before any bearing can be estimated.
pub const MIN_TRACK_POINTS: usize = 2;

/// One specular point as seen by the bearing estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub spacecraft_num: u32,
    /// `track_id` when the file has one, else the DDM channel.
    pub track: i64,
    pub sample_id: i64,
    pub ddm_id: i64,
    pub lat: f64,
    pub lon: f64,
}

/// Initial great-circle bearing from point 1 to point 2, degrees clockwise
/// from north in (-180, 180].
pub fn initial_bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let x = lat2.cos() * (lon2 - lon1).sin();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * (lon2 - lon1).cos();
    x.atan2(y).to_degrees()
}

/// Split a latitude sequence into ascending/descending passes.
///
/// Step `i` goes from point `i` to `i + 1`. A new pass starts at the first
/// point of a step whose direction differs from the previous step; the last
/// point belongs to the final pass. A level step counts as descending.
pub fn split_passes(latitudes: &[f64]) -> Vec<Range<usize>> {
    let n = latitudes.len();
    if n < 2 {
        return if n == 0 { Vec::new() } else { vec![0..1] };
    }

    let ascending = |i: usize| latitudes[i] < latitudes[i + 1];

    let mut passes = Vec::new();
    let mut start = 0;
    for i in 1..n - 1 {
        if ascending(i) != ascending(i - 1) {
            passes.push(start..i);
            start = i;
        }
    }
    passes.push(start..n);
    passes
}

/// Bearing for each point, indexed like `points`.
pub fn estimate_bearings(points: &[TrackPoint]) -> Vec<Result<f64, FootprintError>> {
    let mut tracks: HashMap<(u32, i64), Vec<usize>> = HashMap::new();
    for (i, point) in points.iter().enumerate() {
        tracks
            .entry((point.spacecraft_num, point.track))
            .or_default()
            .push(i);
    }

    let mut bearings: Vec<Option<Result<f64, FootprintError>>> = vec![None; points.len()];

    for members in tracks.values_mut() {
        members.sort_by_key(|&i| points[i].sample_id);

        let lats: Vec<f64> = members.iter().map(|&i| points[i].lat).collect();
        let lons: Vec<f64> = members.iter().map(|&i| points[i].lon).collect();

        for pass in split_passes(&lats) {
            let len = pass.len();
            if len < MIN_TRACK_POINTS {
                for k in pass {
                    let point = &points[members[k]];
                    bearings[members[k]] = Some(Err(FootprintError::InsufficientTrackPoints {
                        sample_id: point.sample_id,
                        ddm_id: point.ddm_id,
                        points: len,
                        required: MIN_TRACK_POINTS,
                    }));
                }
                continue;
            }

            let (first, last) = (pass.start, pass.end - 1);
            for k in pass {
                let (a, b) = if k == first {
                    (k, k + 1)
                } else if k == last {
                    (k - 1, k)
                } else {
                    (k - 1, k + 1)
                };
                bearings[members[k]] = Some(Ok(initial_bearing(lats[a], lons[a], lats[b], lons[b])));
            }
        }
    }

    bearings
        .into_iter()
        .map(|b| b.unwrap_or(Ok(f64::NAN)))
        .collect()
}
