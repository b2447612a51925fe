//! # Tracksync
//!
//! Batch tool that converts GPS tracks into line geometries and syncs them
//! into a local CSV index and a remote record store.
//!
//! Each track file is named after the day it was recorded
//! (`YYYY-MM-DD.gpx`). A run loads every track, matches it to the CSV row
//! with the same date, writes the WKT `LINESTRING` into the row, pushes a
//! GeoJSON update to the remote record by the row's stored identifier, and
//! rewrites the CSV once at the end.
//!
//! ## Modules
//!
//! - [`track`]: GPX loading and date-key decoding
//! - [`geometry`]: WKT line-geometry encoding
//! - [`index`]: the CSV index and date matcher
//! - [`remote`]: the record store HTTP client
//! - [`sync`]: the batch runner and run report
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use tracksync::{read_token, run_batch, RecordStore, RemoteConfig, TrackIndex};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut index = TrackIndex::load(Path::new("data.csv"), "geometry")?;
//!
//!     let token = read_token(Path::new(".api_token"))?;
//!     let store = RecordStore::new(&RemoteConfig::default(), token);
//!
//!     let report = run_batch(Path::new("tracks"), &mut index, Some(&store)).await?;
//!     println!("{} updated, {} skipped", report.updated(), report.skipped());
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod geometry;
pub mod index;
pub mod remote;
pub mod sync;
pub mod track;

// Re-export top-level types for convenience
pub use config::{Config, ConfigError, IndexConfig, LoggingConfig, RemoteConfig, TracksConfig};

pub use track::{Track, TrackError, TrackPoint};

pub use geometry::{linestring_wkt, parse_linestring_wkt, GeometryError};

pub use index::{IndexError, TrackIndex};

pub use remote::{read_token, RecordStore, RecordUpdater, RemoteError};

pub use sync::{run_batch, FileOutcome, FileReport, SyncError, SyncReport};
