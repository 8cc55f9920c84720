//! History source seam.
//!
//! The raw paging client (retries included) is an external collaborator;
//! the pipeline only consumes a forward-only sequence of track pages and
//! may start resolving a page before the next one arrives.

use crate::models::Track;
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait HistorySource: Send {
    /// Next page of raw track events, or `None` when the history window is
    /// exhausted. Pages arrive in order; a source never restarts.
    async fn next_page(&mut self) -> Result<Option<Vec<Track>>>;
}

/// History source over an in-memory list of tracks, served as a single
/// page. Used by the demo binary (which reads history from a JSON file)
/// and by tests.
pub struct InMemoryHistory {
    tracks: Option<Vec<Track>>,
}

impl InMemoryHistory {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks: Some(tracks),
        }
    }
}

#[async_trait]
impl HistorySource for InMemoryHistory {
    async fn next_page(&mut self) -> Result<Option<Vec<Track>>> {
        Ok(self.tracks.take())
    }
}
