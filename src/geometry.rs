//! Line Geometry
//!
//! WKT `LINESTRING` encoding of an ordered point sequence. Longitude comes
//! before latitude per point. The default float formatting is
//! shortest-round-trip, so serializing and parsing back is lossless.

use crate::track::TrackPoint;
use std::fmt::Write;
use thiserror::Error;

/// Errors from parsing WKT line geometry text
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("malformed LINESTRING text: {0}")]
    Malformed(String),
}

/// Serialize a point sequence as WKT `LINESTRING(lon lat, lon lat, ...)`.
///
/// An empty sequence yields the empty string, never `LINESTRING()`.
pub fn linestring_wkt(points: &[TrackPoint]) -> String {
    if points.is_empty() {
        return String::new();
    }

    let mut wkt = String::from("LINESTRING(");
    for (i, point) in points.iter().enumerate() {
        if i > 0 {
            wkt.push_str(", ");
        }
        write!(wkt, "{} {}", point.lon, point.lat).unwrap();
    }
    wkt.push(')');
    wkt
}

/// Parse WKT `LINESTRING` text back into a point sequence.
///
/// Inverse of [`linestring_wkt`]: the empty string parses to an empty
/// sequence.
pub fn parse_linestring_wkt(text: &str) -> Result<Vec<TrackPoint>, GeometryError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(vec![]);
    }

    let inner = text
        .strip_prefix("LINESTRING")
        .map(str::trim_start)
        .and_then(|s| s.strip_prefix('('))
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| GeometryError::Malformed(text.to_string()))?;

    let mut points = vec![];
    for pair in inner.split(',') {
        let mut coords = pair.split_whitespace();
        let lon = coords
            .next()
            .and_then(|c| c.parse().ok())
            .ok_or_else(|| GeometryError::Malformed(pair.to_string()))?;
        let lat = coords
            .next()
            .and_then(|c| c.parse().ok())
            .ok_or_else(|| GeometryError::Malformed(pair.to_string()))?;
        if coords.next().is_some() {
            return Err(GeometryError::Malformed(pair.to_string()));
        }
        points.push(TrackPoint { lon, lat });
    }

    Ok(points)
}
