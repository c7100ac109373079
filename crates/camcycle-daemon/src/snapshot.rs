//! Snapshot capture for the camera currently on screen.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, CONTENT_TYPE, PRAGMA};

use camcycle::types::CameraRecord;

/// Content type assumed when the upstream camera does not declare one.
const FALLBACK_CONTENT_TYPE: &str = "image/jpeg";

/// The latest image captured for one camera.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Camera the image belongs to.
    pub camera_id: String,
    /// Upstream content type, or the jpeg fallback.
    pub content_type: String,
    /// Raw image bytes.
    pub bytes: Vec<u8>,
    /// When the fetch completed.
    pub fetched_at: DateTime<Utc>,
}

/// Errors from one snapshot fetch attempt.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    BadStatus { url: String, status: u16 },

    #[error("{url} returned an empty body")]
    EmptyBody { url: String },
}

/// HTTP fetcher for camera snapshots.
///
/// Like the feed acquirer, every request carries no-cache headers so a stale
/// intermediary image never sticks to the screen.
#[derive(Debug, Clone)]
pub struct SnapshotFetcher {
    client: reqwest::Client,
}

impl SnapshotFetcher {
    /// Create a fetcher with the given per-request timeout.
    pub fn new(timeout: Duration) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .default_headers(headers)
            .user_agent(concat!("camcycle/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self { client }
    }

    /// Fetch the current image for one camera.
    pub async fn fetch(&self, camera: &CameraRecord) -> Result<Snapshot, SnapshotError> {
        let url = camera.source_url.as_str();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| SnapshotError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SnapshotError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|source| SnapshotError::Network {
                url: url.to_string(),
                source,
            })?;

        if bytes.is_empty() {
            return Err(SnapshotError::EmptyBody {
                url: url.to_string(),
            });
        }

        Ok(Snapshot {
            camera_id: camera.id.clone(),
            content_type,
            bytes: bytes.to_vec(),
            fetched_at: Utc::now(),
        })
    }
}
