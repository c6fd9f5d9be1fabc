//! GPX 1.1 track extraction.
//!
//! Streams a GPX document with `quick-xml` and pulls out the track name
//! and every `<trkpt>` in recording order. Individual points with bad
//! coordinates are dropped so one corrupt sample does not cost the whole
//! track; a document that is not well-formed XML is rejected.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

/// Name used when a document carries no usable `<name>` element.
pub const DEFAULT_TRACK_NAME: &str = "Unnamed Track";

/// A recorded sample: WGS84 coordinates with optional elevation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
    /// Elevation in meters, absent when the document has no `<ele>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
}

impl TrackPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: None,
        }
    }

    pub fn with_elevation(latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: Some(elevation),
        }
    }

    /// `[lat, lng]` pair as stored in route records.
    pub fn lat_lng(&self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }
}

/// A track name and its points in recording order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTrack {
    pub name: String,
    pub points: Vec<TrackPoint>,
}

/// Failure to read a document as GPX.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("XML error at byte {position}: {source}")]
    Xml {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },

    #[error("document has no root element")]
    MissingRoot,

    #[error("expected <gpx> root element, found <{0}>")]
    UnexpectedRoot(String),

    #[error("content after the root element")]
    TrailingContent,

    #[error("text outside the root element")]
    TextOutsideRoot,

    #[error("document ends with {0} unclosed element(s)")]
    UnclosedElements(usize),

    #[error("input is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("JSON serialize error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Elements the extractor cares about, by local name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Gpx,
    Trk,
    Trkpt,
    Ele,
    Name,
    Other,
}

impl Tag {
    fn from_local_name(name: &[u8]) -> Self {
        match name {
            b"gpx" => Tag::Gpx,
            b"trk" => Tag::Trk,
            b"trkpt" => Tag::Trkpt,
            b"ele" => Tag::Ele,
            b"name" => Tag::Name,
            _ => Tag::Other,
        }
    }
}

/// Text being collected for the element currently open.
#[derive(Debug, Clone, Copy)]
enum Capture {
    Name { under_trk: bool },
    Elevation,
}

#[derive(Debug, Default)]
struct PendingPoint {
    latitude: Option<f64>,
    longitude: Option<f64>,
    elevation: Option<f64>,
}

impl PendingPoint {
    fn from_attributes(element: &BytesStart) -> Self {
        let mut pending = PendingPoint::default();
        for attr in element.attributes().flatten() {
            let value = match attr.unescape_value() {
                Ok(v) => v,
                Err(_) => continue,
            };
            match attr.key.local_name().as_ref() {
                b"lat" => pending.latitude = parse_number(&value),
                b"lon" => pending.longitude = parse_number(&value),
                _ => {}
            }
        }
        pending
    }

    fn finish(self) -> Option<TrackPoint> {
        let latitude = self.latitude.filter(|v| (-90.0..=90.0).contains(v))?;
        let longitude = self.longitude.filter(|v| (-180.0..=180.0).contains(v))?;
        Some(TrackPoint {
            latitude,
            longitude,
            elevation: self.elevation,
        })
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Accumulates extraction state across XML events.
#[derive(Debug, Default)]
struct Extractor {
    stack: Vec<Tag>,
    root_closed: bool,
    capture: Option<Capture>,
    text: String,
    track_name: Option<String>,
    any_name: Option<String>,
    pending: Option<PendingPoint>,
    points: Vec<TrackPoint>,
    dropped: usize,
}

impl Extractor {
    fn open(&mut self, element: &BytesStart) -> Result<Tag, ParseError> {
        let local = element.local_name();
        let tag = Tag::from_local_name(local.as_ref());

        if self.stack.is_empty() {
            if self.root_closed {
                return Err(ParseError::TrailingContent);
            }
            if tag != Tag::Gpx {
                return Err(ParseError::UnexpectedRoot(
                    String::from_utf8_lossy(local.as_ref()).into_owned(),
                ));
            }
        }

        let parent = self.stack.last().copied();
        match tag {
            Tag::Trkpt => self.pending = Some(PendingPoint::from_attributes(element)),
            Tag::Ele if parent == Some(Tag::Trkpt) && self.pending.is_some() => {
                self.begin_capture(Capture::Elevation)
            }
            Tag::Name if self.capture.is_none() => self.begin_capture(Capture::Name {
                under_trk: parent == Some(Tag::Trk),
            }),
            _ => {}
        }

        self.stack.push(tag);
        Ok(tag)
    }

    fn close(&mut self, tag: Tag) {
        match (tag, self.capture) {
            (Tag::Ele, Some(Capture::Elevation)) => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.elevation = parse_number(&self.text);
                }
                self.capture = None;
            }
            (Tag::Name, Some(Capture::Name { under_trk })) => {
                let name = self.text.trim();
                if !name.is_empty() {
                    if under_trk && self.track_name.is_none() {
                        self.track_name = Some(name.to_string());
                    }
                    if self.any_name.is_none() {
                        self.any_name = Some(name.to_string());
                    }
                }
                self.capture = None;
            }
            (Tag::Trkpt, _) => {
                if let Some(pending) = self.pending.take() {
                    match pending.finish() {
                        Some(point) => self.points.push(point),
                        None => self.dropped += 1,
                    }
                }
            }
            _ => {}
        }

        if self.stack.is_empty() {
            self.root_closed = true;
        }
    }

    fn begin_capture(&mut self, capture: Capture) {
        self.capture = Some(capture);
        self.text.clear();
    }

    fn text(&mut self, text: &str) -> Result<(), ParseError> {
        if self.stack.is_empty() {
            if text.trim().is_empty() {
                return Ok(());
            }
            return Err(ParseError::TextOutsideRoot);
        }
        if self.capture.is_some() {
            self.text.push_str(text);
        }
        Ok(())
    }

    fn finish(self) -> Result<ParsedTrack, ParseError> {
        if !self.stack.is_empty() {
            return Err(ParseError::UnclosedElements(self.stack.len()));
        }
        if !self.root_closed {
            return Err(ParseError::MissingRoot);
        }

        let name = self
            .track_name
            .or(self.any_name)
            .unwrap_or_else(|| DEFAULT_TRACK_NAME.to_string());

        log::debug!(
            "Parsed GPX track '{}': {} points, {} dropped",
            name,
            self.points.len(),
            self.dropped
        );

        Ok(ParsedTrack {
            name,
            points: self.points,
        })
    }
}

fn xml_error(reader: &Reader<&[u8]>, source: quick_xml::Error) -> ParseError {
    ParseError::Xml {
        position: reader.buffer_position(),
        source,
    }
}

/// Parse GPX text into a track name and its points.
pub fn parse(text: &str) -> Result<ParsedTrack, ParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut extractor = Extractor::default();

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => return Err(xml_error(&reader, e)),
        };

        match event {
            Event::Start(ref e) => {
                extractor.open(e)?;
            }
            Event::Empty(ref e) => {
                let tag = extractor.open(e)?;
                extractor.stack.pop();
                extractor.close(tag);
            }
            Event::End(_) => {
                // quick-xml has already checked the end name against the open element
                if let Some(tag) = extractor.stack.pop() {
                    extractor.close(tag);
                }
            }
            Event::Text(ref e) => {
                let text = e.unescape().map_err(|err| xml_error(&reader, err))?;
                extractor.text(&text)?;
            }
            Event::CData(e) => {
                let data = e.into_inner();
                extractor.text(&String::from_utf8_lossy(&data))?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    extractor.finish()
}

/// Parse GPX from a byte slice. Convenience wrapper for JNI.
pub fn parse_bytes(data: &[u8]) -> Result<ParsedTrack, ParseError> {
    parse(std::str::from_utf8(data)?)
}

/// Parse GPX and return the result as a JSON string.
pub fn parse_to_json(data: &[u8]) -> Result<String, ParseError> {
    let track = parse_bytes(data)?;
    Ok(serde_json::to_string(&track)?)
}
