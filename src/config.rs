use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::cache::DEFAULT_TTL_MS;

/// Per-provider request budgets, in calls per second.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderRates {
    pub musicbrainz: u32,
    pub lastfm: u32,
    pub spotify: u32,
    pub bandcamp: u32,
}

impl Default for ProviderRates {
    fn default() -> Self {
        Self {
            musicbrainz: 1,
            lastfm: 1,
            spotify: 1,
            bandcamp: 1,
        }
    }
}

/// Pipeline configuration. Every field has a working default; credentials
/// are optional and simply disable the providers that need them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollageConfig {
    pub lastfm_api_key: Option<String>,
    /// Bearer token for the commercial catalog. Obtaining it is the
    /// caller's business; the pipeline never performs an auth handshake.
    pub spotify_access_token: Option<String>,

    pub song_length_cache_path: PathBuf,
    pub musicbrainz_cache_path: PathBuf,
    pub cache_ttl_ms: i64,

    /// Below this artist-name similarity an album is flagged as a
    /// compilation. Heuristic, inherited tuning.
    pub artist_similarity_threshold: f64,
    /// Minimum title similarity for a provider candidate to count as a
    /// plausible match. Heuristic, inherited tuning.
    pub title_match_threshold: f64,
    pub max_albums: usize,

    pub show_labels: bool,
    pub label_trim_len: usize,
    pub font_path: PathBuf,

    pub rates: ProviderRates,
}

impl Default for CollageConfig {
    fn default() -> Self {
        Self {
            lastfm_api_key: None,
            spotify_access_token: None,
            song_length_cache_path: PathBuf::from("song-length-cache.json"),
            musicbrainz_cache_path: PathBuf::from("musicbrainz-album-cache.json"),
            cache_ttl_ms: DEFAULT_TTL_MS,
            artist_similarity_threshold: 0.8,
            title_match_threshold: 0.5,
            max_albums: 25,
            show_labels: true,
            label_trim_len: 32,
            font_path: PathBuf::from("resources/fonts/OpenSans-Regular.ttf"),
            rates: ProviderRates::default(),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_u32(name: &str, default: u32) -> u32 {
    match env_string(name).map(|v| v.parse::<u32>()) {
        Some(Ok(n)) => n,
        Some(Err(_)) => {
            log::warn!("Ignoring non-numeric value for {}", name);
            default
        }
        None => default,
    }
}

impl CollageConfig {
    /// Defaults overridden from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.lastfm_api_key = env_string("LAST_FM_API_KEY");
        config.spotify_access_token = env_string("SPOTIFY_ACCESS_TOKEN");
        if let Some(path) = env_string("SONG_LENGTH_CACHE_PATH") {
            config.song_length_cache_path = PathBuf::from(path);
        }
        if let Some(path) = env_string("MUSICBRAINZ_CACHE_PATH") {
            config.musicbrainz_cache_path = PathBuf::from(path);
        }
        if let Some(path) = env_string("LABEL_FONT_PATH") {
            config.font_path = PathBuf::from(path);
        }
        if let Some(value) = env_string("SHOW_LISTENING_TIME") {
            config.show_labels = value.eq_ignore_ascii_case("true");
        }
        config.rates.musicbrainz =
            env_u32("MUSICBRAINZ_MAX_REQUESTS_PER_SECOND", config.rates.musicbrainz);
        config.rates.lastfm = env_u32("LAST_FM_MAX_REQUESTS_PER_SECOND", config.rates.lastfm);
        config.rates.spotify = env_u32("SPOTIFY_MAX_REQUESTS_PER_SECOND", config.rates.spotify);
        config.rates.bandcamp = env_u32("BANDCAMP_MAX_REQUESTS_PER_SECOND", config.rates.bandcamp);
        config
    }
}
