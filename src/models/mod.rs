use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::similarity::format_hms;

/// One played song instance from listening history.
///
/// `duration_ms` starts out `None` and is filled in once by the resolver;
/// zero or negative provider values are treated as unresolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub artist: String,
    pub album: Album,
    /// Recording identifier from the history source, if it reported one.
    #[serde(default)]
    pub mb_id: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl Track {
    pub fn new(title: impl Into<String>, artist: impl Into<String>, album: Album) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            album,
            mb_id: None,
            duration_ms: None,
        }
    }

    pub fn with_mb_id(mut self, mb_id: impl Into<String>) -> Self {
        self.mb_id = Some(mb_id.into());
        self
    }
}

/// The record a track belongs to, as reported by the history source.
/// The artist field is unreliable and may differ between tracks of the
/// same album.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub cover_url: Option<String>,
    /// Release identifier from the history source, if it reported one.
    #[serde(default)]
    pub mb_id: Option<String>,
}

impl Album {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            cover_url: None,
            mb_id: None,
        }
    }

    pub fn with_cover(mut self, url: impl Into<String>) -> Self {
        self.cover_url = Some(url.into());
        self
    }

    pub fn with_mb_id(mut self, mb_id: impl Into<String>) -> Self {
        self.mb_id = Some(mb_id.into());
        self
    }
}

/// Accumulated listening time and data-quality flags for one album within
/// a window. Built exclusively by the aggregator; read-only downstream.
#[derive(Debug, Clone, Serialize)]
pub struct AlbumListening {
    pub album: Album,
    /// Total listening time in milliseconds. `-1` marks an album whose
    /// listening time is entirely unknown.
    pub total_ms: i64,
    /// At least one contributing track had no resolvable duration.
    pub incomplete: bool,
    /// Contributing tracks disagree on artist beyond the similarity
    /// threshold.
    pub various_artists: bool,
    pub track_count: u32,
}

impl AlbumListening {
    /// `HH:MM:SS` display string, or `None` when the total is the
    /// fully-unknown sentinel.
    pub fn formatted_total(&self) -> Option<String> {
        if self.total_ms > 0 {
            Some(format_hms(self.total_ms as u64))
        } else {
            None
        }
    }
}

/// Final output of the aggregator: ranked albums plus human-readable
/// diagnostics about data-quality gaps.
#[derive(Debug, Clone, Serialize)]
pub struct ActivitySummary {
    pub user: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub results: Vec<AlbumListening>,
    pub messages: Vec<String>,
}
