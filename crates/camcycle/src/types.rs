//! Core data types for camera feeds.

use serde::{Deserialize, Serialize};

/// One camera reconstructed from the remote feed text.
///
/// Records are created only during a parse pass and never mutated afterward;
/// each re-acquisition replaces the whole list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraRecord {
    /// Opaque unique identifier scraped from the feed.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Owning organization.
    pub owner: String,
    /// URL the camera image is fetched from.
    pub source_url: String,
}

/// Backfill values for records whose metadata lines were missing from the
/// feed text.
///
/// A camera in the active list is never dropped for missing metadata; it gets
/// these values instead. The daemon overrides them from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDefaults {
    /// Owner used when the feed assigns none.
    pub owner: String,
    /// URL used when the feed assigns none.
    pub homepage: String,
}

impl Default for FeedDefaults {
    fn default() -> Self {
        Self {
            owner: "Campus Services".to_string(),
            homepage: "https://example.edu/webcams".to_string(),
        }
    }
}

/// Title used when the feed assigns none.
pub fn default_title(id: &str) -> String {
    format!("Camera {id}")
}

/// Ordered, materialized camera list produced by one parse pass.
///
/// Order follows active-list discovery order in the source text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraList {
    records: Vec<CameraRecord>,
}

impl CameraList {
    /// Wrap an already-ordered set of records.
    pub fn new(records: Vec<CameraRecord>) -> Self {
        Self { records }
    }

    /// Number of cameras in the list.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the list holds no cameras.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&CameraRecord> {
        self.records.get(index)
    }

    /// Position of the camera with the given id, if present.
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    /// All records in display order.
    pub fn records(&self) -> &[CameraRecord] {
        &self.records
    }

    /// Iterate over records in display order.
    pub fn iter(&self) -> std::slice::Iter<'_, CameraRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a CameraList {
    type Item = &'a CameraRecord;
    type IntoIter = std::slice::Iter<'a, CameraRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Errors that can occur while acquiring or parsing a feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Transport-level failure for one source URL.
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// One source URL answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    BadStatus { url: String, status: u16 },

    /// One source URL answered with an implausibly short body.
    #[error("{url} returned {len} characters, below the {min} character minimum")]
    TruncatedBody { url: String, len: usize, min: usize },

    /// Acquisition was attempted with an empty source list.
    #[error("no feed sources configured")]
    NoSources,

    /// Every candidate source URL failed; `last` is the final per-URL cause.
    #[error("all {attempts} feed source(s) failed")]
    FeedUnavailable {
        attempts: usize,
        #[source]
        last: Box<FeedError>,
    },

    /// The feed text parsed but yielded zero active camera ids.
    #[error("feed text contains no active camera ids")]
    NoActiveFeeds,
}

/// Convenience result type.
pub type FeedResult<T> = Result<T, FeedError>;
