//! Play-history metadata provider (Last.fm `track.getInfo`).

use crate::models::Track;
use crate::providers::traits::DurationProvider;
use crate::throttle::Throttle;
use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

const API_ROOT: &str = "https://ws.audioscrobbler.com/2.0/";

pub struct LastFmProvider {
    client: Client,
    throttle: Throttle,
    api_key: String,
}

impl LastFmProvider {
    pub fn new(api_key: impl Into<String>, max_requests_per_second: u32) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            bail!("lastFmApiKey cannot be blank");
        }
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            throttle: Throttle::per_second(max_requests_per_second),
            api_key,
        })
    }

    async fn track_info(&self, track: &Track) -> Result<Value> {
        self.throttle.acquire().await;
        let response = self
            .client
            .get(API_ROOT)
            .query(&[
                ("method", "track.getInfo"),
                ("api_key", self.api_key.as_str()),
                ("artist", track.artist.as_str()),
                ("track", track.title.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            bail!(
                "Last.fm track.getInfo for '{}' by '{}' failed: {}",
                track.title,
                track.artist,
                response.status()
            );
        }
        let body: Value = response.json().await?;
        if let Some(error) = body.get("error") {
            bail!(
                "Last.fm track.getInfo for '{}' by '{}' returned error {}",
                track.title,
                track.artist,
                error
            );
        }
        Ok(body)
    }
}

/// Duration from a `track.getInfo` body. The raw API reports `duration`
/// in milliseconds already, so the value passes through unconverted; the
/// field shows up as either a string or a number depending on the payload.
fn parse_duration_ms(body: &Value) -> Option<u64> {
    let duration = body.get("track")?.get("duration")?;
    let ms = match duration {
        Value::String(s) => s.parse::<u64>().ok()?,
        other => other.as_u64()?,
    };
    (ms > 0).then_some(ms)
}

#[async_trait]
impl DurationProvider for LastFmProvider {
    fn id(&self) -> &str {
        "lastfm"
    }

    fn name(&self) -> &str {
        "Last.fm"
    }

    async fn lookup(&self, track: &Track) -> Result<Option<u64>> {
        let body = self.track_info(track).await?;
        Ok(parse_duration_ms(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_string_duration() {
        let body = json!({"track": {"name": "Airbag", "duration": "284000"}});
        assert_eq!(parse_duration_ms(&body), Some(284_000));
    }

    #[test]
    fn parses_numeric_duration() {
        let body = json!({"track": {"duration": 284000}});
        assert_eq!(parse_duration_ms(&body), Some(284_000));
    }

    #[test]
    fn zero_duration_counts_as_unknown() {
        let body = json!({"track": {"duration": "0"}});
        assert_eq!(parse_duration_ms(&body), None);
    }

    #[test]
    fn missing_track_counts_as_unknown() {
        let body = json!({"message": "Track not found"});
        assert_eq!(parse_duration_ms(&body), None);
    }
}
