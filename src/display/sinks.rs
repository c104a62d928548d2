use super::{DisplaySink, Overlay, RenderFrame};
use crate::error::{PunchcamError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Writes every annotated frame as a PNG file
pub struct ImageDirectorySink {
    dir: PathBuf,
    frames_written: u64,
}

impl ImageDirectorySink {
    /// Create the output directory if needed
    pub async fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        info!("Writing annotated frames to {}", dir.display());
        Ok(Self {
            dir,
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn frame_path(&self, frame_id: u64) -> PathBuf {
        self.dir.join(format!("frame_{:06}.png", frame_id))
    }
}

#[async_trait]
impl DisplaySink for ImageDirectorySink {
    async fn present(&mut self, frame: RenderFrame) -> Result<()> {
        let path = self.frame_path(frame.frame_id);
        let image = frame.image;

        tokio::task::spawn_blocking(move || image.save(&path))
            .await
            .map_err(|e| {
                PunchcamError::component("image_sink", format!("Writer task failed: {}", e))
            })??;

        self.frames_written += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        info!(
            "Image sink closed after {} frames in {}",
            self.frames_written,
            self.dir.display()
        );
        Ok(())
    }
}

/// Logs counters and banners instead of showing an image
#[derive(Default)]
pub struct LogDisplaySink {
    last_overlay: Option<Overlay>,
}

impl LogDisplaySink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DisplaySink for LogDisplaySink {
    async fn present(&mut self, frame: RenderFrame) -> Result<()> {
        if self.last_overlay != Some(frame.overlay) {
            let overlay = &frame.overlay;
            match overlay.message {
                Some(message) => info!(
                    "{} CNT:{} TOT:{} ({:02}s)",
                    message, overlay.punch_count, overlay.goal, overlay.seconds_remaining
                ),
                None => info!(
                    "CNT:{} TOT:{} {:02}s",
                    overlay.punch_count, overlay.goal, overlay.seconds_remaining
                ),
            }
            self.last_overlay = Some(frame.overlay);
        } else {
            debug!("Frame {} unchanged overlay", frame.frame_id);
        }
        Ok(())
    }
}

/// Keeps presented frames in memory; clones share the same storage
#[derive(Clone, Default)]
pub struct MemoryDisplaySink {
    frames: Arc<Mutex<Vec<RenderFrame>>>,
    closed: Arc<AtomicBool>,
}

impl MemoryDisplaySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    /// Overlays of all presented frames, in order
    pub fn overlays(&self) -> Vec<Overlay> {
        self.frames.lock().iter().map(|f| f.overlay).collect()
    }

    pub fn last(&self) -> Option<RenderFrame> {
        self.frames.lock().last().cloned()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl DisplaySink for MemoryDisplaySink {
    async fn present(&mut self, frame: RenderFrame) -> Result<()> {
        self.frames.lock().push(frame);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
