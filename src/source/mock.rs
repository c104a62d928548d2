use super::FrameSource;
use crate::error::{Result, SourceError};
use crate::frame::FramePair;
use async_trait::async_trait;
use image::{Rgb, RgbImage};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// In-memory frame source for testing without a camera.
///
/// Each scripted entry is returned by one poll; `None` entries simulate an
/// incoherent pair. Once the script runs out the source reports a disconnect.
pub struct ScriptedFrameSource {
    script: VecDeque<Option<FramePair>>,
    frame_interval: Option<Duration>,
    released: Arc<AtomicBool>,
}

impl ScriptedFrameSource {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            frame_interval: None,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sleep this long before answering each poll
    pub fn with_frame_interval(mut self, frame_interval: Duration) -> Self {
        self.frame_interval = Some(frame_interval);
        self
    }

    pub fn push_frame(&mut self, pair: FramePair) {
        self.script.push_back(Some(pair));
    }

    /// Queue a poll that yields no coherent pair
    pub fn push_gap(&mut self) {
        self.script.push_back(None);
    }

    /// Queue the same frame `count` times
    pub fn push_repeated(&mut self, pair: &FramePair, count: usize) {
        for _ in 0..count {
            self.script.push_back(Some(pair.clone()));
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// Flag set once `release` has been called
    pub fn release_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }
}

impl Default for ScriptedFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameSource for ScriptedFrameSource {
    async fn wait_for_frame_pair(&mut self) -> Result<Option<FramePair>> {
        if self.released.load(Ordering::Acquire) {
            return Err(SourceError::Disconnected {
                details: "scripted source released".to_string(),
            }
            .into());
        }

        if let Some(frame_interval) = self.frame_interval {
            tokio::time::sleep(frame_interval).await;
        }

        match self.script.pop_front() {
            Some(entry) => Ok(entry),
            None => {
                debug!("Scripted frame source exhausted");
                Err(SourceError::Disconnected {
                    details: "script exhausted".to_string(),
                }
                .into())
            }
        }
    }

    async fn release(&mut self) -> Result<()> {
        self.released.store(true, Ordering::Release);
        Ok(())
    }
}

/// Uniform color frame pair
pub fn solid_frame(id: u64, width: u32, height: u32, value: u8) -> FramePair {
    let image = RgbImage::from_pixel(width, height, Rgb([value, value, value]));
    FramePair::from_color(id, SystemTime::now(), image)
}

/// Dark frame pair with a bright square at (x0, y0)
pub fn square_frame(id: u64, width: u32, height: u32, x0: u32, y0: u32, side: u32) -> FramePair {
    let image = RgbImage::from_fn(width, height, |x, y| {
        if x >= x0 && x < x0 + side && y >= y0 && y < y0 + side {
            Rgb([250, 250, 250])
        } else {
            Rgb([20, 20, 20])
        }
    });
    FramePair::from_color(id, SystemTime::now(), image)
}
