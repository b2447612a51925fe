//! Remote Record Store Client
//!
//! HTTP client for pushing line geometries into the remote record store,
//! one update-by-identifier call per matched track. The bearer credential
//! is read once from a local secret file at startup.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::RemoteConfig;
use crate::track::TrackPoint;

/// Errors that can occur when talking to the record store
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Failed to read API token from {path:?}: {error}")]
    Token { path: PathBuf, error: String },

    #[error("Record store unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Authentication rejected")]
    Auth,

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Read the bearer credential from a secret file.
///
/// A missing file or an empty token is fatal to the whole run; without a
/// credential no update can succeed.
pub fn read_token(path: &Path) -> Result<String, RemoteError> {
    let content = std::fs::read_to_string(path).map_err(|e| RemoteError::Token {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    let token = content.trim();
    if token.is_empty() {
        return Err(RemoteError::Token {
            path: path.to_path_buf(),
            error: "file is empty".to_string(),
        });
    }
    Ok(token.to_string())
}

/// The single operation the batch runner needs from the record store
#[async_trait]
pub trait RecordUpdater: Send + Sync {
    /// Replace the geometry of the record identified by `record_id`.
    async fn update_geometry(
        &self,
        record_id: &str,
        points: &[TrackPoint],
    ) -> Result<(), RemoteError>;
}

/// Record store REST API client
pub struct RecordStore {
    client: Client,
    base_url: String,
    token: String,
}

impl RecordStore {
    /// Create a new client from the remote configuration and credential
    pub fn new(config: &RemoteConfig, token: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[async_trait]
impl RecordUpdater for RecordStore {
    async fn update_geometry(
        &self,
        record_id: &str,
        points: &[TrackPoint],
    ) -> Result<(), RemoteError> {
        let url = format!("{}/records/{}.json", self.base_url, record_id);

        let body = UpdateRecordRequest {
            record: RecordBody {
                geometry: GeoJsonLineString::from_points(points),
            },
        };

        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RemoteError::Timeout
                } else if e.is_connect() {
                    RemoteError::Unavailable
                } else {
                    RemoteError::Request(e)
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status.as_u16() == 401 || status.as_u16() == 403 {
            Err(RemoteError::Auth)
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(RemoteError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

// ============================================
// Request DTOs
// ============================================

#[derive(Debug, Serialize)]
struct UpdateRecordRequest {
    record: RecordBody,
}

/// The geometry field is the only payload field; everything else on the
/// record is left alone by the store.
#[derive(Debug, Serialize)]
struct RecordBody {
    geometry: GeoJsonLineString,
}

/// GeoJSON `LineString`, longitude before latitude per position
#[derive(Debug, Clone, Serialize)]
pub struct GeoJsonLineString {
    #[serde(rename = "type")]
    kind: &'static str,
    coordinates: Vec<[f64; 2]>,
}

impl GeoJsonLineString {
    pub fn from_points(points: &[TrackPoint]) -> Self {
        Self {
            kind: "LineString",
            coordinates: points.iter().map(|p| [p.lon, p.lat]).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".api_token");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"secret-token-123\n").unwrap();

        assert_eq!(read_token(&path).unwrap(), "secret-token-123");
    }

    #[test]
    fn test_read_token_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_token(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, RemoteError::Token { .. }));
    }

    #[test]
    fn test_read_token_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".api_token");
        std::fs::File::create(&path).unwrap();

        let err = read_token(&path).unwrap_err();
        assert!(matches!(err, RemoteError::Token { .. }));
    }

    #[test]
    fn test_payload_shape() {
        let points = [
            TrackPoint { lon: 8.5417, lat: 47.3769 },
            TrackPoint { lon: 8.542, lat: 47.377 },
        ];
        let body = UpdateRecordRequest {
            record: RecordBody {
                geometry: GeoJsonLineString::from_points(&points),
            },
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["record"]["geometry"]["type"], "LineString");
        // Longitude comes first in every position
        assert_eq!(value["record"]["geometry"]["coordinates"][0][0], 8.5417);
        assert_eq!(value["record"]["geometry"]["coordinates"][0][1], 47.3769);
        assert_eq!(
            value["record"]["geometry"]["coordinates"]
                .as_array()
                .unwrap()
                .len(),
            2
        );
    }
}
