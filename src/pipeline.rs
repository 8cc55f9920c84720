//! End-to-end orchestration: history → resolved tracks → summary → image.

use crate::aggregate::ActivityAggregator;
use crate::collage::{CollageRenderer, OutputFormat};
use crate::config::CollageConfig;
use crate::errors::CollageError;
use crate::history::HistorySource;
use crate::models::{ActivitySummary, Track};
use crate::providers;
use crate::resolver::DurationResolver;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use std::path::Path;

pub struct CollagePipeline {
    resolver: DurationResolver,
    aggregator: ActivityAggregator,
    renderer: CollageRenderer,
}

impl CollagePipeline {
    /// Wire the full provider chain, caches and renderer from config.
    pub fn from_config(config: &CollageConfig) -> Result<Self, CollageError> {
        let chain = providers::build_chain(config)
            .map_err(|e| CollageError::Internal(format!("{:#}", e)))?;
        Ok(Self::new(
            DurationResolver::new(&config.song_length_cache_path, config.cache_ttl_ms, chain),
            ActivityAggregator::new(config.artist_similarity_threshold, config.max_albums),
            CollageRenderer::new(config)?,
        ))
    }

    pub fn new(
        resolver: DurationResolver,
        aggregator: ActivityAggregator,
        renderer: CollageRenderer,
    ) -> Self {
        Self {
            resolver,
            aggregator,
            renderer,
        }
    }

    /// Drain the history source, resolve every track's duration, aggregate
    /// per album and render the collage to `out_path`.
    ///
    /// Per-track failures never abort the batch; the returned summary
    /// carries diagnostics for every data gap. Only configuration-class
    /// problems (unsupported output format, broken source) are fatal.
    pub async fn generate<S: HistorySource>(
        &self,
        mut source: S,
        user: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        out_path: &Path,
    ) -> Result<ActivitySummary, CollageError> {
        // Fail on a bad output path before any provider is consulted.
        OutputFormat::from_path(out_path)?;

        log::info!(
            "Generating collage for user [{}] from [{}] to [{}]",
            user,
            from,
            to
        );

        let mut batches = Vec::new();
        while let Some(page) = source
            .next_page()
            .await
            .map_err(|e| CollageError::Internal(format!("history source failed: {:#}", e)))?
        {
            log::debug!("Received history page with {} tracks", page.len());
            batches.push(self.resolver.resolve_batch(page));
        }

        // Fan-in barrier: aggregation needs the complete set.
        let tracks: Vec<Track> = join_all(batches).await.into_iter().flatten().collect();
        log::info!("Resolved {} tracks", tracks.len());

        let mut summary = self.aggregator.aggregate(user, from, to, &tracks);
        for message in self.resolver.take_diagnostics() {
            if !summary.messages.contains(&message) {
                summary.messages.push(message);
            }
        }

        let render_result = self.renderer.render(out_path, &summary).await;
        // Keep resolved durations even when rendering failed.
        self.resolver.save_caches();
        render_result?;

        log::info!(
            "Generated collage [{}] with {} albums and {} diagnostics",
            out_path.display(),
            summary.results.len(),
            summary.messages.len()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::InMemoryHistory;
    use crate::models::Album;
    use crate::providers::traits::DurationProvider;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    struct CountingProvider {
        duration_ms: u64,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DurationProvider for CountingProvider {
        fn id(&self) -> &str {
            "counting"
        }

        fn name(&self) -> &str {
            "Counting"
        }

        async fn lookup(&self, _track: &Track) -> Result<Option<u64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(self.duration_ms))
        }
    }

    fn pipeline_with(
        dir: &tempfile::TempDir,
        provider: Arc<CountingProvider>,
    ) -> CollagePipeline {
        let config = CollageConfig {
            show_labels: false,
            ..CollageConfig::default()
        };
        CollagePipeline::new(
            DurationResolver::new(dir.path().join("lengths.json"), 60_000, vec![provider]),
            ActivityAggregator::new(0.8, 25),
            CollageRenderer::new(&config).unwrap(),
        )
    }

    fn history() -> InMemoryHistory {
        let album = Album::new("OK Computer", "Radiohead");
        InMemoryHistory::new(vec![
            Track::new("Airbag", "Radiohead", album.clone()),
            Track::new("Paranoid Android", "Radiohead", album),
        ])
    }

    #[tokio::test]
    async fn generates_summary_and_image() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(CountingProvider {
            duration_ms: 284_000,
            calls: AtomicUsize::new(0),
        });
        let pipeline = pipeline_with(&dir, provider.clone());
        let out = dir.path().join("collage.png");

        let to = Utc::now();
        let summary = pipeline
            .generate(history(), "user", to - chrono::Duration::days(7), to, &out)
            .await
            .unwrap();

        assert_eq!(summary.results.len(), 1);
        assert_eq!(summary.results[0].total_ms, 568_000);
        assert!(summary.messages.is_empty());
        assert!(out.exists());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        // Resolution results were persisted for the next run
        assert!(dir.path().join("lengths.json").exists());
    }

    #[tokio::test]
    async fn unsupported_output_format_fails_before_any_lookup() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(CountingProvider {
            duration_ms: 284_000,
            calls: AtomicUsize::new(0),
        });
        let pipeline = pipeline_with(&dir, provider.clone());
        let out = dir.path().join("collage.gif");

        let to = Utc::now();
        let result = pipeline
            .generate(history(), "user", to - chrono::Duration::days(7), to, &out)
            .await;

        assert!(matches!(result, Err(CollageError::UnsupportedFormat(_))));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }
}
