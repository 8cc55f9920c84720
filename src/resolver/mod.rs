//! Cached fallback-chain duration resolver.
//!
//! Resolution never fails the batch: provider errors are logged and the
//! chain moves on, and a track that exhausts every provider simply keeps
//! `duration_ms = None` plus a diagnostic naming it.

use crate::cache::FileCache;
use crate::models::Track;
use crate::providers::traits::DurationProvider;
use futures_util::future::join_all;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub struct DurationResolver {
    cache: FileCache<u64>,
    providers: Vec<Arc<dyn DurationProvider>>,
    diagnostics: Mutex<Vec<String>>,
}

/// Cache key for a track's resolved length, case-normalized.
fn cache_key(track: &Track) -> String {
    format!("{}.{}.{}", track.artist, track.album.title, track.title).to_lowercase()
}

impl DurationResolver {
    pub fn new(
        cache_path: impl Into<PathBuf>,
        cache_ttl_ms: i64,
        providers: Vec<Arc<dyn DurationProvider>>,
    ) -> Self {
        Self {
            cache: FileCache::load(cache_path, cache_ttl_ms),
            providers,
            diagnostics: Mutex::new(Vec::new()),
        }
    }

    /// Best-effort duration for one track, in milliseconds. Consults the
    /// cache first; a positive cached value means zero provider calls.
    pub async fn resolve(&self, track: &Track) -> Option<u64> {
        let key = cache_key(track);
        if let Some(cached) = self.cache.get(&key).filter(|ms| *ms > 0) {
            log::debug!("Cache hit for '{}' by '{}'", track.title, track.artist);
            return Some(cached);
        }

        for provider in &self.providers {
            if provider.requires_release_id() && track.album.mb_id.is_none() {
                log::debug!(
                    "Skipping {} for '{}' (no release identifier)",
                    provider.name(),
                    track.title
                );
                continue;
            }
            match provider.lookup(track).await {
                Ok(Some(ms)) if ms > 0 => {
                    log::debug!(
                        "{} resolved '{}' by '{}' to {}ms",
                        provider.name(),
                        track.title,
                        track.artist,
                        ms
                    );
                    self.cache.set(key, ms);
                    return Some(ms);
                }
                Ok(_) => {
                    log::debug!(
                        "{} has no duration for '{}' by '{}'",
                        provider.name(),
                        track.title,
                        track.artist
                    );
                }
                Err(e) => {
                    log::warn!(
                        "Error occurred processing track '{}' by {} via {}: {:#}",
                        track.title,
                        track.artist,
                        provider.name(),
                        e
                    );
                }
            }
        }

        log::error!(
            "No track duration found for track '{}' by {}",
            track.title,
            track.artist
        );
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.push(format!(
                "{} - {} song length not found.",
                track.artist, track.title
            ));
        }
        None
    }

    /// Resolve a whole batch concurrently; the returned tracks carry their
    /// filled-in durations. Completes only after every resolution settled.
    pub async fn resolve_batch(&self, tracks: Vec<Track>) -> Vec<Track> {
        let resolutions = tracks.into_iter().map(|mut track| async move {
            track.duration_ms = self.resolve(&track).await;
            track
        });
        join_all(resolutions).await
    }

    /// Drain the diagnostics recorded since the last call.
    pub fn take_diagnostics(&self) -> Vec<String> {
        self.diagnostics
            .lock()
            .map(|mut d| std::mem::take(&mut *d))
            .unwrap_or_default()
    }

    /// Flush the duration cache and every provider-owned cache. Failures
    /// are logged, never propagated; a lost cache only costs lookups.
    pub fn save_caches(&self) {
        if let Err(e) = self.cache.save() {
            log::warn!("Could not save song length cache: {}", e);
        }
        for provider in &self.providers {
            if let Err(e) = provider.save_cache() {
                log::warn!("Could not save {} cache: {:#}", provider.name(), e);
            }
        }
    }

    #[cfg(test)]
    fn cache(&self) -> &FileCache<u64> {
        &self.cache
    }
}
