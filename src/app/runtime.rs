use super::{RunSummary, ShutdownHandle, ShutdownReason};
use crate::config::PunchcamConfig;
use crate::detector::{FrameAnalysis, MotionDetector};
use crate::display::{DisplaySink, OverlayRenderer};
use crate::error::Result;
use crate::events::{EventBus, PunchcamEvent};
use crate::frame::FramePair;
use crate::round::{RoundController, RoundPhase, RoundState, RoundTimer};
use crate::source::FrameSource;
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

/// Frame-processing loop wiring a source, the detector, the round logic and a
/// display sink together
pub struct PunchcamApp<S, D> {
    pub(super) source: S,
    pub(super) sink: D,
    detector: MotionDetector,
    controller: RoundController,
    pub(super) timer: RoundTimer,
    renderer: OverlayRenderer,
    pub(super) event_bus: EventBus,
    pub(super) shutdown: ShutdownHandle,
    pub(super) summary: RunSummary,
}

impl<S: FrameSource, D: DisplaySink> PunchcamApp<S, D> {
    /// Build the session. Starts the round timer, so this must run inside a
    /// tokio runtime.
    pub fn new(config: PunchcamConfig, source: S, sink: D) -> Self {
        let timer = RoundTimer::start(0, Duration::from_millis(config.round.tick_millis));
        let controller = RoundController::new(
            config.round.clone(),
            config.detector.detect_threshold,
            timer.countdown(),
        );

        Self {
            source,
            sink,
            detector: MotionDetector::new(&config.detector, config.source.roi),
            controller,
            timer,
            renderer: OverlayRenderer::new(&config.display),
            event_bus: EventBus::new(config.system.event_bus_capacity),
            shutdown: ShutdownHandle::new(),
            summary: RunSummary::default(),
        }
    }

    /// Replace the overlay renderer
    pub fn with_renderer(mut self, renderer: OverlayRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn event_bus(&self) -> EventBus {
        self.event_bus.clone()
    }

    /// Handle that stops `run` from another task
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn round_state(&self) -> RoundState {
        self.controller.state()
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn is_calibrated(&self) -> bool {
        self.detector.is_calibrated()
    }

    /// Process frames until shutdown is requested or the source fails.
    ///
    /// Shutdown always releases the source and stops the timer before this
    /// returns. A source failure is returned after shutdown completes.
    pub async fn run(&mut self) -> Result<RunSummary> {
        info!("Punchcam session running");

        let outcome = self.process_frames().await;
        let reason = match &outcome {
            Ok(reason) => reason.clone(),
            Err(e) if e.is_end_of_stream() => ShutdownReason::SourceEnded,
            Err(e) => ShutdownReason::SourceError(e.to_string()),
        };

        let shutdown_result = self.shutdown(&reason).await;

        outcome?;
        shutdown_result?;
        Ok(self.summary.clone())
    }

    async fn process_frames(&mut self) -> Result<ShutdownReason> {
        let token = self.shutdown.token();

        loop {
            let next = tokio::select! {
                _ = token.cancelled() => return Ok(self.requested_reason()),
                next = self.source.wait_for_frame_pair() => next,
            };

            let pair = match next {
                Ok(Some(pair)) if pair.is_coherent() => pair,
                Ok(_) => {
                    self.skip_frame();
                    continue;
                }
                Err(e) => {
                    if e.is_end_of_stream() {
                        info!("Input sequence ended");
                    } else {
                        error!("Frame source failed: {}", e);
                    }
                    self.event_bus.notify(PunchcamEvent::SourceLost {
                        error: e.to_string(),
                    });
                    return Err(e);
                }
            };

            if !self.process_pair(pair).await {
                return Ok(self.requested_reason());
            }
        }
    }

    fn skip_frame(&mut self) {
        self.summary.frames_skipped += 1;
        warn!("No coherent frame pair, skipping iteration");
        self.event_bus.notify(PunchcamEvent::FrameSkipped {
            timestamp: SystemTime::now(),
        });
    }

    /// Returns false when shutdown was requested during the post-round pause
    async fn process_pair(&mut self, pair: FramePair) -> bool {
        self.summary.frames_processed += 1;
        let frame_id = pair.id();

        let detection = match self.detector.process(&pair.color) {
            FrameAnalysis::Calibrating { observed, required } => {
                debug!("Calibrating background: {}/{}", observed, required);
                return true;
            }
            FrameAnalysis::CalibrationComplete { frames } => {
                info!("Background calibrated after {} frames", frames);
                self.event_bus.notify(PunchcamEvent::CalibrationComplete {
                    frames,
                    timestamp: SystemTime::now(),
                });
                self.begin_round();
                return true;
            }
            FrameAnalysis::Analyzed(detection) => detection,
        };

        let update = self.controller.update(detection.has_qualifying_blob());

        let frame = self.renderer.render(
            frame_id,
            &detection.foreground.mask,
            detection.blob.as_ref(),
            &update.state,
        );
        if let Err(e) = self.sink.present(frame).await {
            warn!("Display sink failed on frame {}: {}", frame_id, e);
        }

        if update.punch.is_some() {
            self.summary.punches += 1;
            self.event_bus.notify(PunchcamEvent::PunchCounted {
                count: update.state.punch_count,
                goal: update.state.goal,
                timestamp: SystemTime::now(),
            });
        }

        let Some(phase) = update.finished else {
            return true;
        };

        match phase {
            RoundPhase::Success => self.summary.rounds_won += 1,
            RoundPhase::Failed => self.summary.rounds_failed += 1,
            RoundPhase::Calibrating | RoundPhase::Active => {}
        }
        self.event_bus.notify(PunchcamEvent::RoundFinished {
            round: self.controller.rounds_started(),
            phase,
            punches: update.state.punch_count,
            goal: update.state.goal,
        });

        if !self.pause().await {
            return false;
        }
        self.begin_round();
        true
    }

    fn begin_round(&mut self) {
        let state = self.controller.start_round();
        self.summary.rounds_started = self.controller.rounds_started();
        self.event_bus.notify(PunchcamEvent::RoundStarted {
            round: self.controller.rounds_started(),
            goal: state.goal,
            seconds: state.time_remaining,
        });
    }

    /// Hold the terminal phase on screen. Frames are not read meanwhile.
    async fn pause(&self) -> bool {
        let pause = self.controller.pause_duration();
        debug!("Pausing {:?} before the next round", pause);

        let token = self.shutdown.token();
        tokio::select! {
            _ = token.cancelled() => false,
            _ = tokio::time::sleep(pause) => true,
        }
    }

    fn requested_reason(&self) -> ShutdownReason {
        self.shutdown.reason().unwrap_or(ShutdownReason::Cancelled)
    }
}
