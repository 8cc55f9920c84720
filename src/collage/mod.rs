//! Grid-based collage renderer.
//!
//! Lays ranked albums out row-major on a square grid, fetches cover art
//! concurrently (best-effort; a failed fetch leaves the cell blank) and
//! overlays artist/title/listening-time labels. The canvas is encoded only
//! after every cell has been drawn.

use crate::config::CollageConfig;
use crate::errors::CollageError;
use crate::models::{ActivitySummary, AlbumListening};
use crate::similarity::trim_text;
use ab_glyph::{FontVec, PxScale};
use anyhow::{bail, Result};
use futures_util::future::join_all;
use image::{imageops, DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use reqwest::Client;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const ALBUM_ART_SIZE: u32 = 300;
const LABEL_LINE_HEIGHT: u32 = 16;
const LABEL_LINES: u32 = 3;
const LABEL_HEIGHT: u32 = LABEL_LINES * LABEL_LINE_HEIGHT;
const CELL_WIDTH: u32 = ALBUM_ART_SIZE;
const CELL_HEIGHT: u32 = ALBUM_ART_SIZE + LABEL_HEIGHT;
const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Output codec family, selected from the file extension. Checking this is
/// the first thing `render` does; an unknown extension fails before any
/// drawing or fetching starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self, CollageError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            _ => Err(CollageError::UnsupportedFormat(format!(
                "Unrecognized file extension for file [{}], cannot determine encode function.",
                path.display()
            ))),
        }
    }
}

/// Grid side length for `album_count` cells: `min(5, ceil(sqrt(n)))`,
/// never below 1.
pub fn grid_size(album_count: usize) -> u32 {
    let side = (album_count as f64).sqrt().ceil() as u32;
    side.clamp(1, 5)
}

/// Label lines for one cell: artist (or "Various Artists"), album title,
/// and the listening time when known. A total missing at least one track
/// duration is prefixed with `*`; the sentinel total gets no time line.
fn label_lines(listening: &AlbumListening, trim_len: usize) -> Vec<String> {
    let artist = if listening.various_artists {
        "Various Artists"
    } else {
        listening.album.artist.as_str()
    };
    let mut lines = vec![
        trim_text(artist, trim_len),
        trim_text(&listening.album.title, trim_len),
    ];
    if let Some(time) = listening.formatted_total() {
        lines.push(if listening.incomplete {
            format!("*{}", time)
        } else {
            time
        });
    }
    lines
}

pub struct CollageRenderer {
    client: Client,
    show_labels: bool,
    trim_len: usize,
    font: Option<FontVec>,
}

impl CollageRenderer {
    /// Label rendering needs the configured font at construction time;
    /// a missing or invalid font file is a configuration error.
    pub fn new(config: &CollageConfig) -> Result<Self, CollageError> {
        let font = if config.show_labels {
            let bytes = fs::read(&config.font_path).map_err(|e| {
                CollageError::InvalidArgument(format!(
                    "Cannot read label font [{}]: {}",
                    config.font_path.display(),
                    e
                ))
            })?;
            let font = FontVec::try_from_vec(bytes).map_err(|e| {
                CollageError::InvalidArgument(format!(
                    "Label font [{}] is not a usable font: {}",
                    config.font_path.display(),
                    e
                ))
            })?;
            Some(font)
        } else {
            None
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            show_labels: config.show_labels,
            trim_len: config.label_trim_len,
            font,
        })
    }

    /// Compose the collage and write it to `path`. Art failures degrade to
    /// blank cells; only an unsupported output format or the final encode
    /// can fail.
    pub async fn render(
        &self,
        path: &Path,
        summary: &ActivitySummary,
    ) -> Result<(), CollageError> {
        let format = OutputFormat::from_path(path)?;

        let grid = grid_size(summary.results.len());
        let mut canvas =
            RgbaImage::from_pixel(grid * CELL_WIDTH, grid * CELL_HEIGHT, BACKGROUND);

        // Fetch and decode all covers concurrently, then composite.
        let art = join_all(summary.results.iter().map(|l| self.fetch_art(l))).await;

        for (i, (listening, art)) in summary.results.iter().zip(art).enumerate() {
            let col = i as u32 % grid;
            let row = i as u32 / grid;
            let (x, y) = (col * CELL_WIDTH, row * CELL_HEIGHT);

            if let Some(cover) = art {
                log::info!(
                    "Rendering album art for album #{} ['{}' by {}] at [x={} y={}]",
                    i + 1,
                    listening.album.title,
                    listening.album.artist,
                    x,
                    y
                );
                imageops::overlay(&mut canvas, &cover, x as i64, (y + LABEL_HEIGHT) as i64);
            }
            if self.show_labels {
                self.draw_labels(&mut canvas, x, y, listening);
            }
        }

        // Every cell is drawn; encode once.
        match format {
            OutputFormat::Png => canvas.save_with_format(path, ImageFormat::Png)?,
            OutputFormat::Jpeg => DynamicImage::ImageRgba8(canvas)
                .to_rgb8()
                .save_with_format(path, ImageFormat::Jpeg)?,
        }
        Ok(())
    }

    async fn fetch_art(&self, listening: &AlbumListening) -> Option<RgbaImage> {
        let url = listening
            .album
            .cover_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())?;
        match self.download_and_decode(url).await {
            Ok(cover) => Some(cover),
            Err(e) => {
                log::warn!(
                    "Could not get album art for album [{}] with cover [{}]: {:#}",
                    listening.album.title,
                    url,
                    e
                );
                None
            }
        }
    }

    async fn download_and_decode(&self, url: &str) -> Result<RgbaImage> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            bail!("cover fetch returned {}", response.status());
        }
        let bytes = response.bytes().await?;
        let cover = image::load_from_memory(&bytes)?;
        Ok(imageops::resize(
            &cover.to_rgba8(),
            ALBUM_ART_SIZE,
            ALBUM_ART_SIZE,
            imageops::FilterType::Triangle,
        ))
    }

    fn draw_labels(&self, canvas: &mut RgbaImage, x: u32, y: u32, listening: &AlbumListening) {
        let Some(font) = &self.font else {
            return;
        };
        let scale = PxScale::from(LABEL_LINE_HEIGHT as f32);

        let lines = label_lines(listening, self.trim_len);
        for (line, text) in lines.iter().enumerate() {
            draw_text_mut(
                canvas,
                TEXT_COLOR,
                x as i32,
                (y + line as u32 * LABEL_LINE_HEIGHT) as i32,
                scale,
                font,
                text,
            );
        }
    }
}
