//! Identifier-based metadata provider.
//!
//! Looks a release up by the identifier the history source reported and
//! reads track lengths out of its recording list. Whole releases are
//! cached on disk, so every track of an already-seen album costs zero
//! network calls.

use crate::cache::FileCache;
use crate::models::Track;
use crate::providers::traits::DurationProvider;
use crate::similarity::similarity;
use crate::throttle::Throttle;
use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;
use std::time::Duration;

const API_ROOT: &str = "https://musicbrainz.org/ws/2";
const USER_AGENT: &str = "timecollage/0.1.0 ( https://github.com/timecollage/timecollage )";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    #[serde(default)]
    media: Vec<Media>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Media {
    #[serde(default)]
    tracks: Vec<ReleaseTrack>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReleaseTrack {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    length: Option<u64>,
    recording: Option<Recording>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Recording {
    #[serde(default)]
    id: String,
}

pub struct MusicBrainzProvider {
    client: Client,
    throttle: Throttle,
    release_cache: FileCache<Release>,
    title_match_threshold: f64,
}

impl MusicBrainzProvider {
    pub fn new(
        cache_path: impl Into<PathBuf>,
        cache_ttl_ms: i64,
        max_requests_per_second: u32,
        title_match_threshold: f64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            throttle: Throttle::per_second(max_requests_per_second),
            release_cache: FileCache::load(cache_path, cache_ttl_ms),
            title_match_threshold,
        })
    }

    async fn fetch_release(&self, mb_id: &str) -> Result<Release> {
        let key = format!("release.{}", mb_id);
        if let Some(release) = self.release_cache.get(&key) {
            return Ok(release);
        }
        log::debug!("MusicBrainz release cache miss for [{}]", mb_id);

        self.throttle.acquire().await;
        let url = format!("{}/release/{}?fmt=json&inc=recordings", API_ROOT, mb_id);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            bail!(
                "MusicBrainz release lookup for [{}] failed: {}",
                mb_id,
                response.status()
            );
        }
        let release: Release = response.json().await?;
        self.release_cache.set(key, release.clone());
        Ok(release)
    }
}

/// Pick the release track matching the requested one: exact recording
/// identifier first, then best fuzzy title match above `threshold`.
fn match_candidate<'a>(
    tracks: &'a [ReleaseTrack],
    mb_id: Option<&str>,
    title: &str,
    threshold: f64,
) -> Option<&'a ReleaseTrack> {
    if let Some(mb_id) = mb_id {
        let by_id = tracks.iter().find(|t| {
            t.id == mb_id
                || t.recording
                    .as_ref()
                    .map(|r| r.id == mb_id)
                    .unwrap_or(false)
        });
        if by_id.is_some() {
            return by_id;
        }
    }

    let mut plausible: Vec<(&ReleaseTrack, f64)> = tracks
        .iter()
        .map(|t| (t, similarity(&t.title, title)))
        .filter(|(_, score)| *score >= threshold)
        .collect();
    if plausible.len() > 1 {
        log::warn!(
            "More than one plausible release track for title [{}], using best match",
            title
        );
    }
    plausible
        .drain(..)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
        .map(|(t, _)| t)
}

#[async_trait]
impl DurationProvider for MusicBrainzProvider {
    fn id(&self) -> &str {
        "musicbrainz"
    }

    fn name(&self) -> &str {
        "MusicBrainz"
    }

    fn requires_release_id(&self) -> bool {
        true
    }

    async fn lookup(&self, track: &Track) -> Result<Option<u64>> {
        let Some(album_mb_id) = track.album.mb_id.as_deref() else {
            bail!("track.album.mb_id cannot be blank");
        };

        let release = self.fetch_release(album_mb_id).await?;
        let Some(media) = release.media.first() else {
            bail!("Release [{}] has no media", album_mb_id);
        };

        let matched = match_candidate(
            &media.tracks,
            track.mb_id.as_deref(),
            &track.title,
            self.title_match_threshold,
        );
        log::debug!(
            "MusicBrainz release [{}] match for track [{}]: {}",
            album_mb_id,
            track.title,
            matched.is_some()
        );
        Ok(matched.and_then(|t| t.length).filter(|len| *len > 0))
    }

    fn save_cache(&self) -> Result<()> {
        self.release_cache.save()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release_track(id: &str, title: &str, length: Option<u64>) -> ReleaseTrack {
        ReleaseTrack {
            id: id.to_string(),
            title: title.to_string(),
            length,
            recording: Some(Recording {
                id: format!("rec-{}", id),
            }),
        }
    }

    #[test]
    fn matches_by_identifier_before_title() {
        let tracks = vec![
            release_track("1", "Airbag", Some(284_000)),
            release_track("2", "Paranoid Android", Some(386_000)),
        ];
        let matched = match_candidate(&tracks, Some("rec-2"), "Airbag", 0.5).unwrap();
        assert_eq!(matched.title, "Paranoid Android");
    }

    #[test]
    fn falls_back_to_fuzzy_title_match() {
        let tracks = vec![
            release_track("1", "Airbag", Some(284_000)),
            release_track("2", "Paranoid Android", Some(386_000)),
        ];
        let matched = match_candidate(&tracks, None, "Paranoid Android (Remastered)", 0.5).unwrap();
        assert_eq!(matched.id, "2");
    }

    #[test]
    fn no_plausible_candidate_yields_none() {
        let tracks = vec![release_track("1", "Airbag", Some(284_000))];
        assert!(match_candidate(&tracks, None, "Completely Different", 0.5).is_none());
    }

    #[test]
    fn release_json_deserializes() {
        let raw = r#"{
            "media": [{
                "tracks": [
                    {"id": "t1", "title": "Airbag", "length": 284000,
                     "recording": {"id": "r1"}},
                    {"id": "t2", "title": "Untitled", "length": null}
                ]
            }]
        }"#;
        let release: Release = serde_json::from_str(raw).unwrap();
        assert_eq!(release.media[0].tracks.len(), 2);
        assert_eq!(release.media[0].tracks[0].length, Some(284_000));
        assert!(release.media[0].tracks[1].recording.is_none());
    }
}
