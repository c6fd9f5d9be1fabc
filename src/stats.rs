//! Track aggregates: total distance and cumulative elevation gain.

use crate::geodesy::haversine_distance_km;
use crate::gpx::TrackPoint;

/// Round to one decimal place, halves away from zero.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Unrounded path length in kilometers.
pub fn path_length_km(points: &[TrackPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance_km(&w[0], &w[1]))
        .sum()
}

/// Total length of a track in kilometers, rounded to one decimal.
///
/// Empty and single-point tracks have length 0.
pub fn total_distance_km(points: &[TrackPoint]) -> f64 {
    round_to_tenth(path_length_km(points))
}

/// Sum of every climb between consecutive points, in whole meters.
///
/// Descents contribute nothing, and neither does a pair where either
/// point lacks an elevation.
pub fn total_elevation_gain_m(points: &[TrackPoint]) -> i64 {
    let gain: f64 = points
        .windows(2)
        .filter_map(|w| match (w[0].elevation, w[1].elevation) {
            (Some(prev), Some(curr)) if curr > prev => Some(curr - prev),
            _ => None,
        })
        .sum();

    gain.round() as i64
}
