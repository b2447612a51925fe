//! Tabular Index
//!
//! The CSV index mirrors the remote record store: one row per outing day.
//! Column 0 holds the date key (`YYYY-MM-DD`), column 1 the remote record
//! identifier, and a header-designated column the WKT geometry. Everything
//! else passes through a load/save cycle unchanged.
//!
//! The whole file is read into memory at startup, rows are mutated in
//! place, and the file is rewritten once at the end of a run.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::track::DATE_FORMAT;

/// Errors from loading or persisting the index
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Failed to read index {path:?}: {error}")]
    Read { path: PathBuf, error: String },

    #[error("Failed to write index {path:?}: {error}")]
    Write { path: PathBuf, error: String },

    #[error("Index {path:?} has no {name:?} column")]
    MissingColumn { path: PathBuf, name: String },
}

/// In-memory copy of the CSV index with a date-keyed row lookup
#[derive(Debug)]
pub struct TrackIndex {
    path: PathBuf,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    geometry_col: usize,
    /// Row number per date; on duplicate dates the first occurrence wins
    by_date: HashMap<NaiveDate, usize>,
    dirty: bool,
}

/// Identifier column is fixed by the file layout
const RECORD_ID_COL: usize = 1;
/// Date key column is fixed by the file layout
const DATE_COL: usize = 0;

impl TrackIndex {
    /// Load the full index into memory.
    ///
    /// Rows whose date cell does not parse are kept (and written back
    /// verbatim) but excluded from matching. Duplicate dates keep the
    /// first row and log a warning per shadowed row.
    pub fn load(path: &Path, geometry_column: &str) -> Result<Self, IndexError> {
        let read_err = |e: csv::Error| IndexError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(read_err)?;

        let header: Vec<String> = reader
            .headers()
            .map_err(read_err)?
            .iter()
            .map(str::to_string)
            .collect();

        let geometry_col = header
            .iter()
            .position(|h| h == geometry_column)
            .ok_or_else(|| IndexError::MissingColumn {
                path: path.to_path_buf(),
                name: geometry_column.to_string(),
            })?;

        let mut rows = Vec::new();
        let mut by_date = HashMap::new();

        for record in reader.records() {
            let record = record.map_err(read_err)?;
            let row: Vec<String> = record.iter().map(str::to_string).collect();

            if let Some(date) = row
                .get(DATE_COL)
                .and_then(|cell| NaiveDate::parse_from_str(cell.trim(), DATE_FORMAT).ok())
            {
                if let Some(&first) = by_date.get(&date) {
                    tracing::warn!(
                        %date,
                        row = rows.len() + 2,
                        first_row = first + 2,
                        "duplicate date in index, keeping first occurrence"
                    );
                } else {
                    by_date.insert(date, rows.len());
                }
            }

            rows.push(row);
        }

        tracing::info!(
            rows = rows.len(),
            dated = by_date.len(),
            "Loaded index from {:?}",
            path
        );

        Ok(Self {
            path: path.to_path_buf(),
            header,
            rows,
            geometry_col,
            by_date,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether any row has been changed since load/save
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// All dates that have a matchable row
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.by_date.keys().copied().collect();
        dates.sort();
        dates
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.by_date.contains_key(&date)
    }

    /// Remote record identifier for a date's row, if the row exists
    pub fn record_id(&self, date: NaiveDate) -> Option<&str> {
        let row = *self.by_date.get(&date)?;
        Some(self.rows[row].get(RECORD_ID_COL).map_or("", |s| s.as_str()))
    }

    /// Current geometry text for a date's row, if the row exists
    pub fn geometry(&self, date: NaiveDate) -> Option<&str> {
        let row = *self.by_date.get(&date)?;
        Some(self.rows[row].get(self.geometry_col).map_or("", |s| s.as_str()))
    }

    /// Set the geometry cell for a date's row.
    ///
    /// Returns `false` when no row matches the date. Short rows are padded
    /// with empty cells up to the geometry column. The index is only
    /// marked dirty when the cell value actually changes, so re-running
    /// over unchanged inputs leaves the file untouched.
    pub fn set_geometry(&mut self, date: NaiveDate, wkt: &str) -> bool {
        let Some(&row) = self.by_date.get(&date) else {
            return false;
        };

        let cells = &mut self.rows[row];
        if cells.len() <= self.geometry_col {
            cells.resize(self.geometry_col + 1, String::new());
        }

        if cells[self.geometry_col] != wkt {
            cells[self.geometry_col] = wkt.to_string();
            self.dirty = true;
        }
        true
    }

    /// Rewrite the index file if any row changed.
    ///
    /// All rows are written together to a sibling temp file which is then
    /// renamed over the original, so readers never observe a partial
    /// index. Returns whether a rewrite happened.
    pub fn save(&mut self) -> Result<bool, IndexError> {
        if !self.dirty {
            return Ok(false);
        }

        let write_err = |error: String| IndexError::Write {
            path: self.path.to_path_buf(),
            error,
        };

        let tmp = self.path.with_extension("tmp");
        {
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_path(&tmp)
                .map_err(|e| write_err(e.to_string()))?;

            writer
                .write_record(&self.header)
                .map_err(|e| write_err(e.to_string()))?;
            for row in &self.rows {
                writer
                    .write_record(row)
                    .map_err(|e| write_err(e.to_string()))?;
            }
            writer.flush().map_err(|e| write_err(e.to_string()))?;
        }

        std::fs::rename(&tmp, &self.path).map_err(|e| write_err(e.to_string()))?;
        self.dirty = false;

        tracing::info!(rows = self.rows.len(), "Saved index to {:?}", self.path);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "day,record_id,distance,geometry,notes\n\
        2024-01-15,rec-aaa,42.5,,sunny\n\
        2024-01-16,rec-bbb,10.0,\"LINESTRING(1 2, 3 4)\",\n\
        2024-01-15,rec-shadowed,0.0,,duplicate day\n\
        not-a-date,rec-ccc,5.0,,passthrough\n";

    fn write_index(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_load_and_match() {
        let (_dir, path) = write_index(SAMPLE);
        let index = TrackIndex::load(&path, "geometry").unwrap();

        assert_eq!(index.len(), 4);
        assert_eq!(index.dates().len(), 2);
        assert_eq!(index.record_id(day(2024, 1, 16)), Some("rec-bbb"));
        assert_eq!(
            index.geometry(day(2024, 1, 16)),
            Some("LINESTRING(1 2, 3 4)")
        );
        assert!(!index.contains(day(2024, 1, 17)));
    }

    #[test]
    fn test_duplicate_date_first_occurrence_wins() {
        let (_dir, path) = write_index(SAMPLE);
        let index = TrackIndex::load(&path, "geometry").unwrap();

        assert_eq!(index.record_id(day(2024, 1, 15)), Some("rec-aaa"));
    }

    #[test]
    fn test_missing_geometry_column_is_fatal() {
        let (_dir, path) = write_index("day,record_id\n2024-01-15,rec-aaa\n");
        let err = TrackIndex::load(&path, "geometry").unwrap_err();
        assert!(matches!(err, IndexError::MissingColumn { .. }));
    }

    #[test]
    fn test_set_geometry_and_save_preserves_passthrough() {
        let (_dir, path) = write_index(SAMPLE);
        let mut index = TrackIndex::load(&path, "geometry").unwrap();

        assert!(index.set_geometry(day(2024, 1, 15), "LINESTRING(8.5 47.3, 8.6 47.4)"));
        assert!(index.is_dirty());
        assert!(index.save().unwrap());

        let reloaded = TrackIndex::load(&path, "geometry").unwrap();
        assert_eq!(
            reloaded.geometry(day(2024, 1, 15)),
            Some("LINESTRING(8.5 47.3, 8.6 47.4)")
        );
        // Untouched rows and columns survive the rewrite
        assert_eq!(reloaded.len(), 4);
        assert_eq!(
            reloaded.geometry(day(2024, 1, 16)),
            Some("LINESTRING(1 2, 3 4)")
        );
        assert_eq!(reloaded.record_id(day(2024, 1, 15)), Some("rec-aaa"));
    }

    #[test]
    fn test_unchanged_value_does_not_dirty() {
        let (_dir, path) = write_index(SAMPLE);
        let mut index = TrackIndex::load(&path, "geometry").unwrap();

        assert!(index.set_geometry(day(2024, 1, 16), "LINESTRING(1 2, 3 4)"));
        assert!(!index.is_dirty());
        assert!(!index.save().unwrap());
    }

    #[test]
    fn test_set_geometry_unknown_date() {
        let (_dir, path) = write_index(SAMPLE);
        let mut index = TrackIndex::load(&path, "geometry").unwrap();

        assert!(!index.set_geometry(day(2030, 1, 1), "LINESTRING(0 0, 1 1)"));
        assert!(!index.is_dirty());
    }

    #[test]
    fn test_short_row_is_padded() {
        let (_dir, path) = write_index("day,record_id,geometry\n2024-01-15,rec-aaa\n");
        let mut index = TrackIndex::load(&path, "geometry").unwrap();

        assert!(index.set_geometry(day(2024, 1, 15), "LINESTRING(0 0, 1 1)"));
        index.save().unwrap();

        let reloaded = TrackIndex::load(&path, "geometry").unwrap();
        assert_eq!(
            reloaded.geometry(day(2024, 1, 15)),
            Some("LINESTRING(0 0, 1 1)")
        );
    }
}
