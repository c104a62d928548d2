pub mod app;
pub mod config;
pub mod detector;
pub mod display;
pub mod error;
pub mod events;
pub mod frame;
pub mod round;
pub mod source;

pub use app::{spawn_signal_handlers, PunchcamApp, RunSummary, ShutdownHandle, ShutdownReason};
pub use config::PunchcamConfig;
pub use detector::{
    BackgroundModel, Blob, BlobDetector, DetectionState, ForegroundExtractor, FrameAnalysis,
    MotionDetector, PunchDebouncer, PunchEvent,
};
pub use display::{
    DisplaySink, ImageDirectorySink, LogDisplaySink, MemoryDisplaySink, Overlay, OverlayRenderer,
    RenderFrame,
};
pub use error::{PunchcamError, Result, SourceError};
pub use events::{EventBus, PunchcamEvent};
pub use frame::{ColorFrame, DepthFrame, FramePair};
pub use round::{Countdown, RoundController, RoundPhase, RoundState, RoundTimer};
pub use source::{FrameSource, ImageSequenceSource, ScriptedFrameSource};
