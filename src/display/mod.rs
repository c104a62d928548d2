mod renderer;
mod sinks;

pub use renderer::{draw_closed_polyline, OverlayRenderer};
pub use sinks::{ImageDirectorySink, LogDisplaySink, MemoryDisplaySink};

use crate::error::Result;
use crate::round::{RoundPhase, RoundState};
use async_trait::async_trait;
use image::RgbImage;
use imageproc::point::Point;

/// Counters and banner shown on top of the annotated image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlay {
    pub punch_count: u32,
    pub goal: u32,
    pub seconds_remaining: u32,
    pub phase: RoundPhase,
    pub message: Option<&'static str>,
}

impl Overlay {
    pub fn from_state(state: &RoundState) -> Self {
        Self {
            punch_count: state.punch_count,
            goal: state.goal,
            seconds_remaining: state.time_remaining,
            phase: state.phase,
            message: state.phase.message(),
        }
    }
}

/// One annotated output frame
#[derive(Debug, Clone)]
pub struct RenderFrame {
    pub frame_id: u64,
    /// Binary mask as RGB with contour and hull drawn in
    pub image: RgbImage,
    pub overlay: Overlay,
    /// Blob boundary, empty when no qualifying blob was found
    pub contour: Vec<Point<i32>>,
    /// Convex hull of the blob boundary
    pub hull: Vec<Point<i32>>,
}

/// Write-only consumer of annotated frames
#[async_trait]
pub trait DisplaySink: Send {
    /// Present one frame. Called once per processed frame.
    async fn present(&mut self, frame: RenderFrame) -> Result<()>;

    /// Flush and close the sink
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
