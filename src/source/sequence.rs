use super::FrameSource;
use crate::config::SourceConfig;
use crate::error::{Result, SourceError};
use crate::frame::FramePair;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Replays a directory of color images as frame pairs at the configured rate.
///
/// Images are played in file-name order with an empty depth frame. Files that
/// fail to decode or have the wrong resolution are reported as missing pairs.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    position: usize,
    next_id: u64,
    resolution: (u32, u32),
    frame_interval: Duration,
    ticker: Option<Interval>,
    loop_sequence: bool,
    released: bool,
}

impl ImageSequenceSource {
    /// Scan a directory for images
    pub fn open<P: AsRef<Path>>(dir: P, config: &SourceConfig) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && has_image_extension(path))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(SourceError::Read {
                details: format!("No images found in {}", dir.display()),
            }
            .into());
        }

        info!(
            "Opened image sequence {} ({} frames, {}x{} @ {}fps)",
            dir.display(),
            paths.len(),
            config.resolution.0,
            config.resolution.1,
            config.fps
        );

        Ok(Self {
            paths,
            position: 0,
            next_id: 0,
            resolution: config.resolution,
            frame_interval: Duration::from_secs_f64(1.0 / config.fps.max(1) as f64),
            ticker: None,
            loop_sequence: config.loop_sequence,
            released: false,
        })
    }

    /// Number of images in the sequence
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    async fn pace(&mut self) {
        let frame_interval = self.frame_interval;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = interval(frame_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        ticker.tick().await;
    }
}

#[async_trait]
impl FrameSource for ImageSequenceSource {
    async fn wait_for_frame_pair(&mut self) -> Result<Option<FramePair>> {
        if self.released {
            return Err(SourceError::Disconnected {
                details: "image sequence already released".to_string(),
            }
            .into());
        }

        self.pace().await;

        if self.position >= self.paths.len() {
            if !self.loop_sequence {
                return Err(SourceError::EndOfStream.into());
            }
            debug!("Image sequence exhausted, looping");
            self.position = 0;
        }

        let path = self.paths[self.position].clone();
        self.position += 1;

        let decode_path = path.clone();
        let decoded = tokio::task::spawn_blocking(move || image::open(&decode_path))
            .await
            .map_err(|e| SourceError::Read {
                details: format!("decoder task failed: {}", e),
            })?;

        let image = match decoded {
            Ok(image) => image.to_rgb8(),
            Err(e) => {
                warn!("Skipping undecodable frame {}: {}", path.display(), e);
                return Ok(None);
            }
        };

        if image.dimensions() != self.resolution {
            warn!(
                "Skipping frame {}: {}x{} does not match {}x{}",
                path.display(),
                image.width(),
                image.height(),
                self.resolution.0,
                self.resolution.1
            );
            return Ok(None);
        }

        let id = self.next_id;
        self.next_id += 1;
        Ok(Some(FramePair::from_color(id, SystemTime::now(), image)))
    }

    async fn release(&mut self) -> Result<()> {
        if !self.released {
            info!("Releasing image sequence after {} frames", self.next_id);
        }
        self.released = true;
        self.ticker = None;
        Ok(())
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
