//! Track Loader
//!
//! Loads a GPS track from a GPX file whose name encodes the calendar day
//! the track was recorded on (`YYYY-MM-DD.gpx`).

use chrono::NaiveDate;
use gpx::errors::GpxError;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

/// Date format encoded in track filenames
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single position fix, decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub lon: f64,
    pub lat: f64,
}

/// One outing: the date key from the filename plus the ordered point
/// sequence from the file. Immutable after loading.
#[derive(Debug, Clone)]
pub struct Track {
    pub date: NaiveDate,
    pub points: Vec<TrackPoint>,
}

impl Track {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Errors that can occur while loading a track file
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("filename {name:?} does not encode a YYYY-MM-DD date")]
    Naming { name: String },

    #[error("reading GPX failed: {0}")]
    Gpx(#[from] GpxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decode the date key from a track file's name.
///
/// The file stem (name without extension) must parse as `YYYY-MM-DD`.
pub fn date_from_filename(path: &Path) -> Result<NaiveDate, TrackError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| TrackError::Naming {
            name: path.display().to_string(),
        })?;

    NaiveDate::parse_from_str(stem, DATE_FORMAT).map_err(|_| TrackError::Naming {
        name: stem.to_string(),
    })
}

/// Load a track from a GPX file.
///
/// Point order follows the file: for each track, for each segment, each
/// point in sequence. Elevation and timestamps are dropped. Zero-point
/// tracks are valid and yield an empty geometry downstream.
pub fn load(path: &Path) -> Result<Track, TrackError> {
    let date = date_from_filename(path)?;
    let file = File::open(path)?;
    let gpx = gpx::read(BufReader::new(file))?;

    let mut points = vec![];
    for track in gpx.tracks {
        for segment in track.segments {
            for waypoint in segment.points {
                let point = waypoint.point();
                points.push(TrackPoint {
                    lon: point.x(),
                    lat: point.y(),
                });
            }
        }
    }

    Ok(Track { date, points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const THREE_POINT_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1" creator="unit-test">
  <trk>
    <name>Morning ride</name>
    <trkseg>
      <trkpt lat="47.3769" lon="8.5417"><ele>408.0</ele></trkpt>
      <trkpt lat="47.3770" lon="8.5420"/>
    </trkseg>
    <trkseg>
      <trkpt lat="47.3772" lon="8.5425"/>
    </trkseg>
  </trk>
</gpx>
"#;

    const EMPTY_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1" creator="unit-test">
  <trk><name>No fixes</name></trk>
</gpx>
"#;

    fn write_gpx(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_date_from_filename() {
        let date = date_from_filename(Path::new("/tracks/2024-01-15.gpx")).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_date_from_filename_rejects_non_dates() {
        assert!(date_from_filename(Path::new("notes.gpx")).is_err());
        assert!(date_from_filename(Path::new("2024-13-40.gpx")).is_err());
        assert!(date_from_filename(Path::new("20240115.gpx")).is_err());
    }

    #[test]
    fn test_load_preserves_point_order_across_segments() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gpx(dir.path(), "2024-01-15.gpx", THREE_POINT_GPX);

        let track = load(&path).unwrap();
        assert_eq!(track.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(track.points.len(), 3);
        // Longitude/latitude come back in file order
        assert!((track.points[0].lon - 8.5417).abs() < 1e-9);
        assert!((track.points[0].lat - 47.3769).abs() < 1e-9);
        assert!((track.points[2].lon - 8.5425).abs() < 1e-9);
    }

    #[test]
    fn test_load_empty_track() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gpx(dir.path(), "2024-01-16.gpx", EMPTY_GPX);

        let track = load(&path).unwrap();
        assert!(track.is_empty());
    }

    #[test]
    fn test_load_malformed_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gpx(dir.path(), "2024-01-17.gpx", "this is not xml");

        assert!(matches!(load(&path), Err(TrackError::Gpx(_))));
    }
}
