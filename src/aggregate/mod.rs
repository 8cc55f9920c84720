//! Groups resolved tracks into per-album listening totals.

use crate::models::{ActivitySummary, AlbumListening, Track};
use crate::similarity::similarity;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

pub struct ActivityAggregator {
    /// Below this artist-name similarity an album gets the compilation flag.
    artist_similarity_threshold: f64,
    max_albums: usize,
}

impl ActivityAggregator {
    pub fn new(artist_similarity_threshold: f64, max_albums: usize) -> Self {
        Self {
            artist_similarity_threshold,
            max_albums,
        }
    }

    /// Group tracks by album title, rank by total listening time and cap
    /// the result list. Albums with no resolvable listening time at all
    /// get the `-1` sentinel and sort last.
    pub fn aggregate(
        &self,
        user: impl Into<String>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        tracks: &[Track],
    ) -> ActivitySummary {
        // Insertion order is the tie-break for equal totals, so albums
        // live in a Vec with a title index beside it.
        let mut albums: Vec<AlbumListening> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut messages: Vec<String> = Vec::new();

        for track in tracks {
            let duration = track.duration_ms.filter(|ms| *ms > 0);
            match index.get(&track.album.title) {
                None => {
                    index.insert(track.album.title.clone(), albums.len());
                    albums.push(AlbumListening {
                        album: track.album.clone(),
                        total_ms: duration.unwrap_or(0) as i64,
                        incomplete: duration.is_none(),
                        various_artists: false,
                        track_count: 1,
                    });
                }
                Some(&i) => {
                    let listening = &mut albums[i];
                    listening.track_count += 1;
                    // History data is not normalized, so compare artists
                    // fuzzily rather than by equality.
                    let artist_similarity =
                        similarity(&listening.album.artist, &track.artist);
                    if !listening.various_artists
                        && artist_similarity < self.artist_similarity_threshold
                    {
                        log::warn!(
                            "Track [{}] artist [{}] is different than album artist [{}], similarity = [{:.2}] - marking album as various artists",
                            track.title,
                            track.artist,
                            listening.album.artist,
                            artist_similarity
                        );
                        listening.various_artists = true;
                    }
                    match duration {
                        Some(ms) => listening.total_ms += ms as i64,
                        None => {
                            listening.incomplete = true;
                            messages.push(format!(
                                "{} - {} song length not found.",
                                track.artist, track.title
                            ));
                        }
                    }
                }
            }
        }

        // Distinguish "entirely unknown" from "zero listening time"
        for listening in &mut albums {
            if listening.total_ms <= 0 {
                listening.total_ms = -1;
            }
        }

        albums.sort_by(|a, b| b.total_ms.cmp(&a.total_ms));
        albums.truncate(self.max_albums);

        ActivitySummary {
            user: user.into(),
            from,
            to,
            results: albums,
            messages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Album;

    fn aggregator() -> ActivityAggregator {
        ActivityAggregator::new(0.8, 25)
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let to = Utc::now();
        (to - chrono::Duration::days(7), to)
    }

    fn track(album: &str, artist: &str, title: &str, duration_ms: Option<u64>) -> Track {
        let mut t = Track::new(title, artist, Album::new(album, artist));
        t.duration_ms = duration_ms;
        t
    }

    #[test]
    fn totals_sum_known_durations_independent_of_order() {
        let (from, to) = window();
        let mut tracks = vec![
            track("In Rainbows", "Radiohead", "Nude", Some(255_000)),
            track("In Rainbows", "Radiohead", "Reckoner", Some(290_000)),
            track("In Rainbows", "Radiohead", "Videotape", Some(280_000)),
        ];
        let forward = aggregator().aggregate("user", from, to, &tracks);
        tracks.reverse();
        let reversed = aggregator().aggregate("user", from, to, &tracks);

        assert_eq!(forward.results[0].total_ms, 825_000);
        assert_eq!(reversed.results[0].total_ms, 825_000);
        assert!(!forward.results[0].incomplete);
    }

    #[test]
    fn unknown_duration_marks_album_incomplete_with_message() {
        let (from, to) = window();
        let tracks = vec![
            track("Album X", "Artist", "One", Some(200_000)),
            track("Album X", "Artist", "Two", None),
            track("Album X", "Artist", "Three", Some(180_000)),
        ];
        let summary = aggregator().aggregate("user", from, to, &tracks);

        let listening = &summary.results[0];
        assert_eq!(listening.total_ms, 380_000);
        assert!(listening.incomplete);
        assert_eq!(listening.track_count, 3);
        assert_eq!(listening.formatted_total().as_deref(), Some("00:06:20"));
        assert_eq!(
            summary.messages,
            vec!["Artist - Two song length not found.".to_string()]
        );
    }

    #[test]
    fn fully_unknown_album_gets_sentinel_and_sorts_last() {
        let (from, to) = window();
        let tracks = vec![
            track("Unknown Album", "A", "One", None),
            track("Known Album", "B", "Two", Some(100_000)),
            track("Big Album", "C", "Three", Some(900_000)),
        ];
        let summary = aggregator().aggregate("user", from, to, &tracks);

        let titles: Vec<&str> = summary
            .results
            .iter()
            .map(|l| l.album.title.as_str())
            .collect();
        assert_eq!(titles, ["Big Album", "Known Album", "Unknown Album"]);
        assert_eq!(summary.results[2].total_ms, -1);
        assert_eq!(summary.results[2].formatted_total(), None);
    }

    #[test]
    fn similar_artist_does_not_flag_various_artists() {
        let (from, to) = window();
        let a = track("Album", "The National", "One", Some(100));
        let b = track("Album", "The National!", "Two", Some(100));
        let summary = aggregator().aggregate("user", from, to, &[a, b]);
        assert!(!summary.results[0].various_artists);
    }

    #[test]
    fn dissimilar_artist_flags_various_artists() {
        let (from, to) = window();
        let a = track("Compilation", "Aphex Twin", "One", Some(100));
        let b = track("Compilation", "Boards of Canada", "Two", Some(100));
        let summary = aggregator().aggregate("user", from, to, &[a, b]);
        assert!(summary.results[0].various_artists);
    }

    #[test]
    fn results_are_capped_at_the_album_limit() {
        let (from, to) = window();
        let tracks: Vec<Track> = (0..30)
            .map(|i| {
                track(
                    &format!("Album {}", i),
                    "Artist",
                    "Song",
                    Some(1_000 * (i as u64 + 1)),
                )
            })
            .collect();
        let summary = aggregator().aggregate("user", from, to, &tracks);

        assert_eq!(summary.results.len(), 25);
        // Descending by total
        assert!(summary
            .results
            .windows(2)
            .all(|w| w[0].total_ms >= w[1].total_ms));
        assert_eq!(summary.results[0].album.title, "Album 29");
    }

    #[test]
    fn equal_totals_keep_first_seen_order() {
        let (from, to) = window();
        let tracks = vec![
            track("First", "A", "One", Some(100_000)),
            track("Second", "B", "Two", Some(100_000)),
        ];
        let summary = aggregator().aggregate("user", from, to, &tracks);
        assert_eq!(summary.results[0].album.title, "First");
        assert_eq!(summary.results[1].album.title, "Second");
    }
}
