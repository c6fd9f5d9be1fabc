//! Douglas–Peucker track simplification.
//!
//! Reduces a recorded track to the points needed to stay within a
//! perpendicular tolerance of the original path. Distances are planar,
//! in degrees (see [`perpendicular_distance`]), so tolerances are
//! degree-scale: 0.0001 keeps street-level detail, 0.0005 only the
//! major bends.
//!
//! Ranges are processed from an explicit work-list rather than by
//! recursion, so a pathological track of any length cannot exhaust the
//! call stack.

use crate::geodesy::perpendicular_distance;
use crate::gpx::TrackPoint;

/// Tolerance used for route records, in degrees.
pub const DEFAULT_TOLERANCE: f64 = 0.0003;

/// Simplify a track, returning the kept points in their original order.
///
/// The first and last points are always kept. Tracks of two or fewer
/// points are returned unchanged.
pub fn simplify(points: &[TrackPoint], tolerance: f64) -> Vec<TrackPoint> {
    simplify_indices(points, tolerance)
        .into_iter()
        .map(|i| points[i])
        .collect()
}

/// Simplify a track and return the indices of the kept points.
pub fn simplify_indices(points: &[TrackPoint], tolerance: f64) -> Vec<usize> {
    if points.len() <= 2 {
        return (0..points.len()).collect();
    }

    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    let mut ranges = vec![(0, last)];
    while let Some((start, end)) = ranges.pop() {
        if end - start < 2 {
            continue;
        }

        if let Some((offset, distance)) = farthest_point(&points[start..=end]) {
            if distance > tolerance {
                let split = start + offset;
                keep[split] = true;
                ranges.push((split, end));
                ranges.push((start, split));
            }
        }
    }

    keep.iter()
        .enumerate()
        .filter_map(|(i, &k)| k.then_some(i))
        .collect()
}

/// Interior point farthest from the chord between the range's endpoints.
///
/// Returns the offset within `range` and its distance. On ties the
/// earliest point wins. `None` when every interior point lies on the
/// chord.
fn farthest_point(range: &[TrackPoint]) -> Option<(usize, f64)> {
    let first = &range[0];
    let last = &range[range.len() - 1];

    let mut farthest = None;
    let mut max_distance = 0.0;

    for (i, p) in range.iter().enumerate().take(range.len() - 1).skip(1) {
        let distance = perpendicular_distance(p, first, last);
        if distance > max_distance {
            max_distance = distance;
            farthest = Some((i, distance));
        }
    }

    farthest
}
