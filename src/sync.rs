//! Batch Runner
//!
//! Drives one full sync: enumerate track files, load each, match it to an
//! index row by date, write the WKT geometry locally, push the update to
//! the remote record store, and persist the index once at the end.
//!
//! Per-file problems never abort the batch; they are folded into the
//! report. Interruption before the final save loses all in-memory row
//! updates, so the index on disk only ever reflects a completed run.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::geometry::linestring_wkt;
use crate::index::{IndexError, TrackIndex};
use crate::remote::RecordUpdater;
use crate::track;

/// Errors fatal to the whole run
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to read track directory {path:?}: {error}")]
    TracksDir { path: PathBuf, error: String },

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// What happened to one track file
#[derive(Debug)]
pub enum FileOutcome {
    /// Row geometry set and remote record updated (or dry run)
    Updated { points: usize },
    /// Row geometry set locally but the remote update failed
    Diverged { points: usize, error: String },
    /// Zero position fixes; prior geometry left untouched, no remote call
    Empty,
    /// Matching row has an empty record identifier
    NoRecordId,
    /// No index row for this date
    Unmatched,
    /// Filename does not encode a date
    BadName,
    /// Track content could not be parsed
    Unparseable { error: String },
}

impl FileOutcome {
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            FileOutcome::Empty
                | FileOutcome::NoRecordId
                | FileOutcome::Unmatched
                | FileOutcome::BadName
        )
    }
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOutcome::Updated { points } => write!(f, "updated ({} points)", points),
            FileOutcome::Diverged { points, error } => write!(
                f,
                "diverged: local geometry updated ({} points), remote failed: {}",
                points, error
            ),
            FileOutcome::Empty => write!(f, "skipped: no position fixes in track"),
            FileOutcome::NoRecordId => {
                write!(f, "skipped: matching row has no record identifier")
            }
            FileOutcome::Unmatched => write!(f, "skipped: no index row for this date"),
            FileOutcome::BadName => write!(f, "skipped: filename is not a YYYY-MM-DD date"),
            FileOutcome::Unparseable { error } => write!(f, "failed: {}", error),
        }
    }
}

/// Outcome for one enumerated file
#[derive(Debug)]
pub struct FileReport {
    pub file: String,
    pub date: Option<NaiveDate>,
    pub outcome: FileOutcome,
}

/// Result of a full batch run
#[derive(Debug)]
pub struct SyncReport {
    pub files: Vec<FileReport>,
    /// Index dates for which no track file was found
    pub rows_without_tracks: Vec<NaiveDate>,
    pub index_saved: bool,
}

impl SyncReport {
    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Updated { .. }))
    }

    pub fn diverged(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Diverged { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(FileOutcome::is_skip)
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Unparseable { .. }))
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Enumerate track files in a stable order.
///
/// Only `.gpx` files (case-insensitive) are considered, sorted by
/// filename so repeated runs over an unchanged directory log identically.
pub fn gpx_files(dir: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let entries = std::fs::read_dir(dir).map_err(|e| SyncError::TracksDir {
        path: dir.to_path_buf(),
        error: e.to_string(),
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("gpx"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Run the full batch over `tracks_dir` against `index`.
///
/// With `remote: None` the run is a dry run: no update calls are made and
/// the index is not rewritten, but every file is still loaded, matched,
/// and classified.
pub async fn run_batch(
    tracks_dir: &Path,
    index: &mut TrackIndex,
    remote: Option<&dyn RecordUpdater>,
) -> Result<SyncReport, SyncError> {
    let files = gpx_files(tracks_dir)?;
    if files.is_empty() {
        tracing::warn!("No track files found in {:?}", tracks_dir);
    }

    let mut reports = Vec::with_capacity(files.len());
    let mut seen_dates = HashSet::new();

    for path in files {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let date = match track::date_from_filename(&path) {
            Ok(date) => date,
            Err(e) => {
                tracing::warn!(%file, "{}", e);
                reports.push(FileReport {
                    file,
                    date: None,
                    outcome: FileOutcome::BadName,
                });
                continue;
            }
        };
        seen_dates.insert(date);

        let loaded = match track::load(&path) {
            Ok(track) => track,
            Err(e) => {
                tracing::error!(%file, %date, "{}", e);
                reports.push(FileReport {
                    file,
                    date: Some(date),
                    outcome: FileOutcome::Unparseable {
                        error: e.to_string(),
                    },
                });
                continue;
            }
        };

        if !index.contains(date) {
            tracing::warn!(%file, %date, "no index row for this date");
            reports.push(FileReport {
                file,
                date: Some(date),
                outcome: FileOutcome::Unmatched,
            });
            continue;
        }

        let record_id = index.record_id(date).unwrap_or("").to_string();
        if record_id.is_empty() {
            tracing::warn!(%file, %date, "index row has no record identifier");
            reports.push(FileReport {
                file,
                date: Some(date),
                outcome: FileOutcome::NoRecordId,
            });
            continue;
        }

        if loaded.is_empty() {
            tracing::warn!(%file, %date, "no position fixes, leaving prior geometry untouched");
            reports.push(FileReport {
                file,
                date: Some(date),
                outcome: FileOutcome::Empty,
            });
            continue;
        }

        // Local row takes the new geometry before the remote call; on a
        // remote failure the two stores diverge and the report says so.
        let points = loaded.points.len();
        let wkt = linestring_wkt(&loaded.points);
        index.set_geometry(date, &wkt);

        let outcome = match remote {
            None => {
                tracing::info!(%file, %date, record = %record_id, points, "dry run, skipping remote update");
                FileOutcome::Updated { points }
            }
            Some(store) => match store.update_geometry(&record_id, &loaded.points).await {
                Ok(()) => {
                    tracing::info!(%file, %date, record = %record_id, points, "updated record");
                    FileOutcome::Updated { points }
                }
                Err(e) => {
                    tracing::error!(
                        %file, %date, record = %record_id,
                        "remote update failed, local geometry kept: {}", e
                    );
                    FileOutcome::Diverged {
                        points,
                        error: e.to_string(),
                    }
                }
            },
        };
        reports.push(FileReport {
            file,
            date: Some(date),
            outcome,
        });
    }

    let index_saved = if remote.is_none() {
        if index.is_dirty() {
            tracing::info!("dry run, index changes not written");
        }
        false
    } else {
        index.save()?
    };

    let rows_without_tracks = index
        .dates()
        .into_iter()
        .filter(|date| !seen_dates.contains(date))
        .collect();

    Ok(SyncReport {
        files: reports,
        rows_without_tracks,
        index_saved,
    })
}
