pub mod bandcamp;
pub mod lastfm;
pub mod musicbrainz;
pub mod spotify;
pub mod traits;

use crate::config::CollageConfig;
use anyhow::Result;
use bandcamp::BandcampProvider;
use lastfm::LastFmProvider;
use musicbrainz::MusicBrainzProvider;
use spotify::SpotifyProvider;
use std::sync::Arc;
use traits::DurationProvider;

/// Build the fallback chain in strict priority order: identifier-based
/// metadata, play-history metadata, commercial catalog, scraped store.
/// Providers whose credentials are missing are skipped with a log line
/// rather than failing construction.
pub fn build_chain(config: &CollageConfig) -> Result<Vec<Arc<dyn DurationProvider>>> {
    let mut chain: Vec<Arc<dyn DurationProvider>> = Vec::new();

    chain.push(Arc::new(MusicBrainzProvider::new(
        &config.musicbrainz_cache_path,
        config.cache_ttl_ms,
        config.rates.musicbrainz,
        config.title_match_threshold,
    )?));

    match &config.lastfm_api_key {
        Some(api_key) => {
            chain.push(Arc::new(LastFmProvider::new(api_key, config.rates.lastfm)?));
        }
        None => log::info!("No Last.fm API key configured, skipping Last.fm provider"),
    }

    match &config.spotify_access_token {
        Some(token) => {
            chain.push(Arc::new(SpotifyProvider::new(token, config.rates.spotify)?));
        }
        None => log::info!("No Spotify access token configured, skipping Spotify provider"),
    }

    chain.push(Arc::new(BandcampProvider::new(config.rates.bandcamp)?));

    log::info!(
        "Duration provider chain: [{}]",
        chain
            .iter()
            .map(|p| p.id())
            .collect::<Vec<_>>()
            .join(" -> ")
    );
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn chain_order_follows_priority() {
        let dir = tempdir().unwrap();
        let mut config = CollageConfig::default();
        config.musicbrainz_cache_path = dir.path().join("mb.json");
        config.lastfm_api_key = Some("key".to_string());
        config.spotify_access_token = Some("token".to_string());

        let chain = build_chain(&config).unwrap();
        let ids: Vec<&str> = chain.iter().map(|p| p.id()).collect();
        assert_eq!(ids, ["musicbrainz", "lastfm", "spotify", "bandcamp"]);
    }

    #[test]
    fn missing_credentials_skip_providers() {
        let dir = tempdir().unwrap();
        let mut config = CollageConfig::default();
        config.musicbrainz_cache_path = dir.path().join("mb.json");

        let chain = build_chain(&config).unwrap();
        let ids: Vec<&str> = chain.iter().map(|p| p.id()).collect();
        assert_eq!(ids, ["musicbrainz", "bandcamp"]);
    }
}
