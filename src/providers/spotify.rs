//! Commercial-catalog provider (Spotify search).
//!
//! Uses a caller-supplied bearer token; acquiring and refreshing it is an
//! external concern.

use crate::models::Track;
use crate::providers::traits::DurationProvider;
use crate::similarity::similarity;
use crate::throttle::Throttle;
use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::cmp::Ordering;
use std::time::Duration;

const SEARCH_URL: &str = "https://api.spotify.com/v1/search";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<TrackPage>,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<CatalogTrack>,
}

#[derive(Debug, Deserialize)]
struct CatalogTrack {
    #[serde(default)]
    name: String,
    duration_ms: Option<u64>,
}

pub struct SpotifyProvider {
    client: Client,
    throttle: Throttle,
    access_token: String,
}

impl SpotifyProvider {
    pub fn new(access_token: impl Into<String>, max_requests_per_second: u32) -> Result<Self> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            bail!("accessToken cannot be blank");
        }
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            throttle: Throttle::per_second(max_requests_per_second),
            access_token,
        })
    }

    async fn search_tracks(&self, track: &Track) -> Result<Vec<CatalogTrack>> {
        self.throttle.acquire().await;
        let query = format!(
            "track:'{}' artist:'{}' album:'{}'",
            track.title, track.artist, track.album.title
        );
        let response = self
            .client
            .get(SEARCH_URL)
            .bearer_auth(&self.access_token)
            .query(&[("q", query.as_str()), ("type", "track"), ("limit", "10")])
            .send()
            .await?;
        if !response.status().is_success() {
            bail!("Spotify search [{}] failed: {}", query, response.status());
        }
        let body: SearchResponse = response.json().await?;
        let Some(page) = body.tracks else {
            bail!("No tracks returned in Spotify response body for [{}]", query);
        };
        log::debug!(
            "Spotify query [{}] returned [{}] results",
            query,
            page.items.len()
        );
        Ok(page.items)
    }
}

/// Best candidate by title similarity. More than one candidate is normal
/// for popular tracks; ambiguity is logged, never fatal.
fn pick_candidate(items: &[CatalogTrack], title: &str) -> Option<u64> {
    if items.len() > 1 {
        log::warn!(
            "More than one Spotify result for track '{}', using best title match",
            title
        );
    }
    items
        .iter()
        .map(|item| (item, similarity(&item.name, title)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
        .and_then(|(item, _)| item.duration_ms)
        .filter(|ms| *ms > 0)
}

#[async_trait]
impl DurationProvider for SpotifyProvider {
    fn id(&self) -> &str {
        "spotify"
    }

    fn name(&self) -> &str {
        "Spotify"
    }

    async fn lookup(&self, track: &Track) -> Result<Option<u64>> {
        let items = self.search_tracks(track).await?;
        Ok(pick_candidate(&items, &track.title))
    }
}
