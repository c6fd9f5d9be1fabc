//! Geodesy primitives.
//!
//! Great-circle distance between trackpoints and the planar
//! point-to-line metric used by the simplifier. All coordinates are
//! WGS84 degrees.

use crate::gpx::TrackPoint;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Convert degrees to radians.
pub fn to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

/// Haversine distance between two points in kilometers.
pub fn haversine_distance_km(a: &TrackPoint, b: &TrackPoint) -> f64 {
    let dlat = to_radians(b.latitude - a.latitude);
    let dlng = to_radians(b.longitude - a.longitude);

    let h = (dlat / 2.0).sin().powi(2)
        + to_radians(a.latitude).cos()
            * to_radians(b.latitude).cos()
            * (dlng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Distance from `point` to the infinite line through `line_start` and
/// `line_end`, in degrees.
///
/// Longitude is the x axis and latitude the y axis. This is a planar
/// metric, only meaningful at local scale. A zero-length line yields 0.
pub fn perpendicular_distance(
    point: &TrackPoint,
    line_start: &TrackPoint,
    line_end: &TrackPoint,
) -> f64 {
    let dx = line_end.longitude - line_start.longitude;
    let dy = line_end.latitude - line_start.latitude;

    let denominator = (dx * dx + dy * dy).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }

    let numerator = (dy * point.longitude - dx * point.latitude
        + line_end.longitude * line_start.latitude
        - line_end.latitude * line_start.longitude)
        .abs();

    numerator / denominator
}
