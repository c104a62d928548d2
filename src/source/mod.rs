mod mock;
mod sequence;
#[cfg(test)]
mod tests;

pub use mock::{solid_frame, square_frame, ScriptedFrameSource};
pub use sequence::ImageSequenceSource;

use crate::error::Result;
use crate::frame::FramePair;
use async_trait::async_trait;

/// Supplier of synchronized depth/color frame pairs.
///
/// `Ok(None)` means no coherent pair was available on this poll and the
/// caller should simply try again. An `Err` means the source is gone.
#[async_trait]
pub trait FrameSource: Send {
    /// Block until the next frame pair is available
    async fn wait_for_frame_pair(&mut self) -> Result<Option<FramePair>>;

    /// Release the underlying device or stream
    async fn release(&mut self) -> Result<()>;
}
