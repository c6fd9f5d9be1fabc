//! Display-ready track summaries.
//!
//! A summary keeps the simplified `[lat, lng]` outline for drawing and the
//! distance and climb of the full recording, so simplifying never
//! shortens a reported route.

use serde::{Deserialize, Serialize};

use crate::gpx::{self, ParseError, ParsedTrack};
use crate::simplify::simplify;
use crate::stats::{total_distance_km, total_elevation_gain_m};

/// The simplified outline of a track plus its aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSummary {
    pub name: String,
    /// Simplified `[lat, lng]` pairs in recording order.
    pub points: Vec<[f64; 2]>,
    pub total_distance_km: f64,
    pub total_elevation_gain_m: i64,
}

impl TrackSummary {
    /// First point of the outline, if any.
    pub fn start_point(&self) -> Option<[f64; 2]> {
        self.points.first().copied()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Summarize a parsed track at the given simplification tolerance.
pub fn summarize(track: &ParsedTrack, tolerance: f64) -> TrackSummary {
    let points = simplify(&track.points, tolerance)
        .iter()
        .map(|p| p.lat_lng())
        .collect();

    TrackSummary {
        name: track.name.clone(),
        points,
        total_distance_km: total_distance_km(&track.points),
        total_elevation_gain_m: total_elevation_gain_m(&track.points),
    }
}

/// Parse GPX text and summarize its track.
pub fn summarize_gpx(text: &str, tolerance: f64) -> Result<TrackSummary, ParseError> {
    let track = gpx::parse(text)?;
    Ok(summarize(&track, tolerance))
}
