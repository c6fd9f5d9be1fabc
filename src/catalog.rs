//! Route catalog.
//!
//! Holds one [`RouteRecord`] per GPX document, keyed by a name derived
//! from the file name, plus the table linking route keys to the track
//! identifiers used by the app's listings. Lookups by track id go
//! through a reverse index built as links are added.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::gpx::{self, ParseError, ParsedTrack};
use crate::simplify::{simplify, DEFAULT_TOLERANCE};
use crate::stats::{total_distance_km, total_elevation_gain_m};

/// Links between bundled routes and listing track ids.
pub const DEFAULT_TRACK_LINKS: &[(&str, &str)] = &[
    ("Al_Qudra_stick_loop_Extension_1and2", "1"),
    ("JabelHafeet", "6"),
    ("Morning_Ride", "4"),
    ("Lunch_Ride", "5"),
    ("MaydantoKite", "3"),
];

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{0} has no track points")]
    EmptyTrack(String),
}

/// Derive a route key from a file name: the `.gpx` extension is dropped
/// and anything that is not an ASCII letter or digit becomes `_`.
pub fn route_key(file_name: &str) -> String {
    let stem = file_name.strip_suffix(".gpx").unwrap_or(file_name);
    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// A route as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRecord {
    pub file_name: String,
    pub name: String,
    /// Kilometers, one decimal.
    pub distance: f64,
    /// Meters climbed.
    pub elevation: i64,
    pub start_point: LatLng,
    /// Simplified `[lat, lng]` outline.
    pub points: Vec<[f64; 2]>,
}

impl RouteRecord {
    /// Build a record from an already parsed track.
    ///
    /// Distance and elevation come from every recorded point; only the
    /// outline is simplified.
    pub fn from_track(
        file_name: &str,
        track: &ParsedTrack,
        tolerance: f64,
    ) -> Result<Self, CatalogError> {
        let start = track
            .points
            .first()
            .ok_or_else(|| CatalogError::EmptyTrack(file_name.to_string()))?;

        let points = simplify(&track.points, tolerance)
            .iter()
            .map(|p| p.lat_lng())
            .collect();

        Ok(Self {
            file_name: file_name.to_string(),
            name: track.name.clone(),
            distance: total_distance_km(&track.points),
            elevation: total_elevation_gain_m(&track.points),
            start_point: LatLng {
                lat: start.latitude,
                lng: start.longitude,
            },
            points,
        })
    }

    pub fn from_gpx(file_name: &str, text: &str, tolerance: f64) -> Result<Self, CatalogError> {
        let track = gpx::parse(text)?;
        Self::from_track(file_name, &track, tolerance)
    }

    pub fn key(&self) -> String {
        route_key(&self.file_name)
    }
}

/// Build records for `(file_name, gpx_text)` pairs in parallel.
///
/// Results are in input order. A failing document does not affect the
/// others.
pub fn build_records(
    documents: &[(String, String)],
    tolerance: f64,
) -> Vec<Result<RouteRecord, CatalogError>> {
    documents
        .par_iter()
        .map(|(file_name, text)| {
            let record = RouteRecord::from_gpx(file_name, text, tolerance);
            match &record {
                Ok(r) => log::info!(
                    "Built route {}: '{}', {} km, {} m, {} points",
                    file_name,
                    r.name,
                    r.distance,
                    r.elevation,
                    r.points.len()
                ),
                Err(e) => log::warn!("Skipping route {file_name}: {e}"),
            }
            record
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackLink {
    pub route_key: String,
    pub track_id: String,
}

/// Catalog settings, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Simplification tolerance in degrees.
    pub tolerance: f64,
    pub links: Vec<TrackLink>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            links: DEFAULT_TRACK_LINKS
                .iter()
                .map(|(route_key, track_id)| TrackLink {
                    route_key: route_key.to_string(),
                    track_id: track_id.to_string(),
                })
                .collect(),
        }
    }
}

impl CatalogConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone)]
pub struct RouteCatalog {
    tolerance: f64,
    routes: BTreeMap<String, RouteRecord>,
    /// route key -> track id
    links: BTreeMap<String, String>,
    /// track id -> route key
    by_track: HashMap<String, String>,
}

impl Default for RouteCatalog {
    fn default() -> Self {
        Self::new(CatalogConfig::default())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogJson<'a> {
    routes: &'a BTreeMap<String, RouteRecord>,
    track_links: &'a BTreeMap<String, String>,
}

impl RouteCatalog {
    pub fn new(config: CatalogConfig) -> Self {
        let mut catalog = Self {
            tolerance: config.tolerance,
            routes: BTreeMap::new(),
            links: BTreeMap::new(),
            by_track: HashMap::new(),
        };
        for link in config.links {
            catalog.link(link.route_key, link.track_id);
        }
        catalog
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Add a record, replacing any route with the same key. Returns the key.
    pub fn insert(&mut self, record: RouteRecord) -> String {
        let key = record.key();
        self.routes.insert(key.clone(), record);
        key
    }

    /// Parse and add one document at the catalog's tolerance.
    pub fn add_gpx(&mut self, file_name: &str, text: &str) -> Result<String, CatalogError> {
        let record = RouteRecord::from_gpx(file_name, text, self.tolerance)?;
        Ok(self.insert(record))
    }

    /// Build and add many documents in parallel.
    ///
    /// Returns the file names that failed along with their errors; every
    /// other document is added.
    pub fn add_documents(
        &mut self,
        documents: &[(String, String)],
    ) -> Vec<(String, CatalogError)> {
        let results = build_records(documents, self.tolerance);

        let mut failures = Vec::new();
        for ((file_name, _), result) in documents.iter().zip(results) {
            match result {
                Ok(record) => {
                    self.insert(record);
                }
                Err(e) => failures.push((file_name.clone(), e)),
            }
        }
        failures
    }

    /// Associate a route key with a track id.
    ///
    /// Links may name routes that are not loaded yet. Each route key and
    /// each track id takes part in at most one link: a later link that
    /// reuses either side is ignored and `false` is returned.
    pub fn link(&mut self, route_key: impl Into<String>, track_id: impl Into<String>) -> bool {
        let route_key = route_key.into();
        let track_id = track_id.into();

        if self.links.contains_key(&route_key) || self.by_track.contains_key(&track_id) {
            log::warn!("ignoring link {route_key} -> {track_id}: already linked");
            return false;
        }
        self.by_track.insert(track_id.clone(), route_key.clone());
        self.links.insert(route_key, track_id);
        true
    }

    pub fn get(&self, route_key: &str) -> Option<&RouteRecord> {
        self.routes.get(route_key)
    }

    pub fn record_for_track(&self, track_id: &str) -> Option<&RouteRecord> {
        self.by_track
            .get(track_id)
            .and_then(|key| self.routes.get(key))
    }

    /// Outline of the route linked to `track_id`.
    ///
    /// `None` when the id has no link or its route is not loaded.
    pub fn route_for_track(&self, track_id: &str) -> Option<&[[f64; 2]]> {
        self.record_for_track(track_id)
            .map(|record| record.points.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&CatalogJson {
            routes: &self.routes,
            track_links: &self.links,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpx(name: &str, points: &[(f64, f64, f64)]) -> String {
        let trkpts: String = points
            .iter()
            .map(|(lat, lon, ele)| {
                format!(r#"<trkpt lat="{lat}" lon="{lon}"><ele>{ele}</ele></trkpt>"#)
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk><name>{name}</name><trkseg>{trkpts}</trkseg></trk>
</gpx>"#
        )
    }

    fn al_qudra() -> String {
        gpx(
            "Al Qudra Loop",
            &[
                (24.8607, 55.2094, 10.0),
                (24.8650, 55.2150, 15.0),
                (24.8700, 55.2200, 12.0),
            ],
        )
    }

    fn jebel_hafeet() -> String {
        gpx(
            "Jebel Hafeet Climb",
            &[
                (24.0667, 55.7833, 350.0),
                (24.0500, 55.7700, 700.0),
                (24.0150, 55.7350, 1100.0),
            ],
        )
    }

    #[test]
    fn route_key_replaces_non_alphanumerics() {
        assert_eq!(
            route_key("Al Qudra stick loop Extension 1and2.gpx"),
            "Al_Qudra_stick_loop_Extension_1and2"
        );
        assert_eq!(route_key("JabelHafeet.gpx"), "JabelHafeet");
        assert_eq!(route_key("Morning-Ride.gpx"), "Morning_Ride");
        assert_eq!(route_key("route.v2.gpx"), "route_v2");
        assert_eq!(route_key("Café.gpx"), "Caf_");
        assert_eq!(route_key("no_extension"), "no_extension");
    }

    #[test]
    fn record_from_gpx() {
        let record =
            RouteRecord::from_gpx("Al Qudra.gpx", &al_qudra(), DEFAULT_TOLERANCE).unwrap();

        assert_eq!(record.file_name, "Al Qudra.gpx");
        assert_eq!(record.key(), "Al_Qudra");
        assert_eq!(record.name, "Al Qudra Loop");
        assert_eq!(record.distance, 1.5);
        assert_eq!(record.elevation, 5);
        assert_eq!(
            record.start_point,
            LatLng {
                lat: 24.8607,
                lng: 55.2094
            }
        );
        assert_eq!(record.points.first(), Some(&[24.8607, 55.2094]));
    }

    #[test]
    fn record_for_empty_track_is_an_error() {
        let empty = gpx("Empty", &[]);
        let result = RouteRecord::from_gpx("Empty.gpx", &empty, DEFAULT_TOLERANCE);
        assert!(matches!(result, Err(CatalogError::EmptyTrack(ref f)) if f == "Empty.gpx"));
    }

    #[test]
    fn record_for_garbage_is_a_parse_error() {
        let result = RouteRecord::from_gpx("bad.gpx", "garbage", DEFAULT_TOLERANCE);
        assert!(matches!(result, Err(CatalogError::Parse(_))));
    }

    #[test]
    fn record_json_field_names() {
        let record =
            RouteRecord::from_gpx("Al Qudra.gpx", &al_qudra(), DEFAULT_TOLERANCE).unwrap();
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["fileName"], "Al Qudra.gpx");
        assert_eq!(json["distance"], 1.5);
        assert_eq!(json["elevation"], 5);
        assert_eq!(json["startPoint"]["lat"], 24.8607);
        assert_eq!(json["startPoint"]["lng"], 55.2094);
        assert!(json["points"].is_array());
    }

    #[test]
    fn build_records_isolates_failures_and_keeps_order() {
        let documents = vec![
            ("JabelHafeet.gpx".to_string(), jebel_hafeet()),
            ("broken.gpx".to_string(), "<gpx><trk>".to_string()),
            ("Al Qudra.gpx".to_string(), al_qudra()),
        ];

        let results = build_records(&documents, DEFAULT_TOLERANCE);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().name, "Jebel Hafeet Climb");
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().name, "Al Qudra Loop");
    }

    #[test]
    fn default_links_resolve_loaded_routes() {
        let mut catalog = RouteCatalog::default();
        let key = catalog.add_gpx("JabelHafeet.gpx", &jebel_hafeet()).unwrap();
        assert_eq!(key, "JabelHafeet");

        let points = catalog.route_for_track("6").unwrap();
        assert_eq!(points.first(), Some(&[24.0667, 55.7833]));
        assert_eq!(catalog.record_for_track("6").unwrap().elevation, 750);
    }

    #[test]
    fn unknown_track_is_not_found() {
        let mut catalog = RouteCatalog::default();
        catalog.add_gpx("JabelHafeet.gpx", &jebel_hafeet()).unwrap();

        // Unlinked id
        assert!(catalog.route_for_track("42").is_none());
        // Linked id whose route is not loaded
        assert!(catalog.route_for_track("1").is_none());
    }

    #[test]
    fn first_link_for_a_track_wins() {
        let mut catalog = RouteCatalog::new(CatalogConfig {
            tolerance: DEFAULT_TOLERANCE,
            links: Vec::new(),
        });
        catalog.add_gpx("Al Qudra.gpx", &al_qudra()).unwrap();
        catalog.add_gpx("JabelHafeet.gpx", &jebel_hafeet()).unwrap();

        assert!(catalog.link("Al_Qudra", "1"));
        assert!(!catalog.link("JabelHafeet", "1"));

        assert_eq!(catalog.record_for_track("1").unwrap().name, "Al Qudra Loop");
    }

    #[test]
    fn relinking_a_route_keeps_both_tables_in_step() {
        let mut catalog = RouteCatalog::new(CatalogConfig {
            tolerance: DEFAULT_TOLERANCE,
            links: Vec::new(),
        });
        catalog.add_gpx("Hatta.gpx", &al_qudra()).unwrap();

        assert!(catalog.link("Hatta", "3"));
        assert!(!catalog.link("Hatta", "9"));

        let json: serde_json::Value = serde_json::from_str(&catalog.to_json().unwrap()).unwrap();
        assert_eq!(json["trackLinks"], serde_json::json!({ "Hatta": "3" }));
        assert!(catalog.route_for_track("3").is_some());
        assert!(catalog.route_for_track("9").is_none());
    }

    #[test]
    fn links_may_precede_routes() {
        let mut catalog = RouteCatalog::new(CatalogConfig {
            tolerance: DEFAULT_TOLERANCE,
            links: Vec::new(),
        });
        catalog.link("Al_Qudra", "7");
        assert!(catalog.route_for_track("7").is_none());

        catalog.add_gpx("Al Qudra.gpx", &al_qudra()).unwrap();
        assert!(catalog.route_for_track("7").is_some());
    }

    #[test]
    fn add_documents_reports_failures() {
        let mut catalog = RouteCatalog::default();
        let failures = catalog.add_documents(&[
            ("Morning Ride.gpx".to_string(), al_qudra()),
            ("Lunch Ride.gpx".to_string(), "not xml".to_string()),
            ("Empty.gpx".to_string(), gpx("Empty", &[])),
        ]);

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.keys().collect::<Vec<_>>(), vec!["Morning_Ride"]);
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].0, "Lunch Ride.gpx");
        assert!(matches!(failures[1].1, CatalogError::EmptyTrack(_)));

        // Morning_Ride is linked to track 4 by default
        assert!(catalog.route_for_track("4").is_some());
        assert!(catalog.route_for_track("5").is_none());
    }

    #[test]
    fn insert_replaces_same_key() {
        let mut catalog = RouteCatalog::default();
        catalog.add_gpx("JabelHafeet.gpx", &jebel_hafeet()).unwrap();
        catalog.add_gpx("JabelHafeet.gpx", &al_qudra()).unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("JabelHafeet").unwrap().name, "Al Qudra Loop");
    }

    #[test]
    fn config_from_partial_json() {
        let config = CatalogConfig::from_json(r#"{"tolerance": 0.0001}"#).unwrap();
        assert_eq!(config.tolerance, 0.0001);
        assert_eq!(config.links.len(), DEFAULT_TRACK_LINKS.len());

        let config = CatalogConfig::from_json(
            r#"{"links": [{"routeKey": "Hatta", "trackId": "3"}]}"#,
        )
        .unwrap();
        assert_eq!(config.tolerance, DEFAULT_TOLERANCE);
        assert_eq!(config.links[0].route_key, "Hatta");

        assert!(CatalogConfig::from_json("{").is_err());
    }

    #[test]
    fn catalog_tolerance_applies_to_added_routes() {
        let mut coarse = RouteCatalog::new(CatalogConfig {
            tolerance: 1.0,
            links: Vec::new(),
        });
        assert_eq!(coarse.tolerance(), 1.0);

        coarse.add_gpx("Al Qudra.gpx", &al_qudra()).unwrap();
        assert_eq!(coarse.get("Al_Qudra").unwrap().points.len(), 2);
    }

    #[test]
    fn catalog_json_shape() {
        let mut catalog = RouteCatalog::default();
        catalog.add_gpx("JabelHafeet.gpx", &jebel_hafeet()).unwrap();

        let json: serde_json::Value = serde_json::from_str(&catalog.to_json().unwrap()).unwrap();
        assert_eq!(json["routes"]["JabelHafeet"]["name"], "Jebel Hafeet Climb");
        assert_eq!(json["trackLinks"]["JabelHafeet"], "6");
        assert_eq!(json["trackLinks"]["Morning_Ride"], "4");
    }
}
