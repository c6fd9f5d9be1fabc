pub mod android_jni;
pub mod catalog;
pub mod geodesy;
pub mod gpx;
pub mod simplify;
pub mod stats;
pub mod summary;

pub use catalog::{RouteCatalog, RouteRecord};
pub use gpx::{ParseError, ParsedTrack, TrackPoint};
pub use summary::{summarize, summarize_gpx, TrackSummary};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
