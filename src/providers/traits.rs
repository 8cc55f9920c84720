use crate::models::Track;
use anyhow::Result;
use async_trait::async_trait;

/// One external data source queried for a track's play length.
///
/// Providers absorb their own throttling; the resolver only sees an async
/// call that eventually yields `Some(duration_ms)`, `None` when the source
/// has no answer, or an error. Anything non-positive is reported as `None`.
#[async_trait]
pub trait DurationProvider: Send + Sync {
    /// Unique identifier (e.g., "musicbrainz", "lastfm")
    fn id(&self) -> &str;

    /// User-friendly name
    fn name(&self) -> &str;

    /// Whether this provider can only be queried for tracks whose album
    /// carries an external release identifier.
    fn requires_release_id(&self) -> bool {
        false
    }

    /// Look up the track's duration in milliseconds.
    async fn lookup(&self, track: &Track) -> Result<Option<u64>>;

    /// Flush any provider-owned cache to disk.
    fn save_cache(&self) -> Result<()> {
        Ok(())
    }
}
