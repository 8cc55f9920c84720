//! Fallback scraped-store provider.
//!
//! Bandcamp has no public metadata API, so this provider searches the
//! public autocomplete endpoint and pulls the duration out of the embedded
//! track data on the store page. Last in the chain by design; every parse
//! miss is simply "no answer".

use crate::models::Track;
use crate::providers::traits::DurationProvider;
use crate::throttle::Throttle;
use anyhow::{bail, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const SEARCH_URL: &str = "https://bandcamp.com/api/bcsearch_public_api/1/autocomplete_elastic";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    auto: Option<SearchResults>,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    item_url_path: Option<String>,
}

pub struct BandcampProvider {
    client: Client,
    throttle: Throttle,
    duration_pattern: Regex,
}

impl BandcampProvider {
    pub fn new(max_requests_per_second: u32) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            throttle: Throttle::per_second(max_requests_per_second),
            duration_pattern: Regex::new(r#""duration"\s*:\s*([0-9]+(?:\.[0-9]+)?)"#)?,
        })
    }

    async fn search_track_url(&self, track: &Track) -> Result<Option<String>> {
        self.throttle.acquire().await;
        let query = format!("{} {}", track.artist, track.title);
        let response = self
            .client
            .post(SEARCH_URL)
            .json(&json!({
                "search_text": query,
                "search_filter": "t",
                "full_page": false,
                "fan_id": null,
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            bail!("Bandcamp search [{}] failed: {}", query, response.status());
        }
        let body: SearchResponse = response.json().await?;
        let results = body.auto.map(|a| a.results).unwrap_or_default();
        log::debug!(
            "Bandcamp query [{}] returned [{}] results",
            query,
            results.len()
        );
        if results.len() > 1 {
            log::warn!(
                "More than one Bandcamp result for track '{}' by {}, using first",
                track.title,
                track.artist
            );
        }
        Ok(results.into_iter().find_map(|hit| hit.item_url_path))
    }

    fn duration_ms_from_page(&self, page: &str) -> Option<u64> {
        let captures = self.duration_pattern.captures(page)?;
        let seconds: f64 = captures.get(1)?.as_str().parse().ok()?;
        let ms = (seconds * 1000.0) as u64;
        (ms > 0).then_some(ms)
    }
}

#[async_trait]
impl DurationProvider for BandcampProvider {
    fn id(&self) -> &str {
        "bandcamp"
    }

    fn name(&self) -> &str {
        "Bandcamp"
    }

    async fn lookup(&self, track: &Track) -> Result<Option<u64>> {
        let Some(url) = self.search_track_url(track).await? else {
            return Ok(None);
        };

        self.throttle.acquire().await;
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            bail!("Bandcamp track page [{}] failed: {}", url, response.status());
        }
        let page = response.text().await?;
        Ok(self.duration_ms_from_page(&page))
    }
}
