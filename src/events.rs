use crate::round::RoundPhase;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },
}

/// Events that can occur while a session is running
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PunchcamEvent {
    /// Background model finished calibrating
    CalibrationComplete { frames: u32, timestamp: SystemTime },
    /// A new round began
    RoundStarted {
        round: u32,
        goal: u32,
        seconds: u32,
    },
    /// A punch was counted in the current round
    PunchCounted {
        count: u32,
        goal: u32,
        timestamp: SystemTime,
    },
    /// A round ended
    RoundFinished {
        round: u32,
        phase: RoundPhase,
        punches: u32,
        goal: u32,
    },
    /// The source returned no coherent frame pair
    FrameSkipped { timestamp: SystemTime },
    /// The frame source was lost
    SourceLost { error: String },
    /// Session shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl PunchcamEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            PunchcamEvent::CalibrationComplete { frames, .. } => {
                format!("Calibration complete after {} frames", frames)
            }
            PunchcamEvent::RoundStarted {
                round,
                goal,
                seconds,
            } => format!("Round {} started: {} punches in {}s", round, goal, seconds),
            PunchcamEvent::PunchCounted { count, goal, .. } => {
                format!("Punch {}/{}", count, goal)
            }
            PunchcamEvent::RoundFinished {
                round,
                phase,
                punches,
                goal,
            } => format!(
                "Round {} finished {:?}: {}/{} punches",
                round, phase, punches, goal
            ),
            PunchcamEvent::FrameSkipped { .. } => "Frame skipped".to_string(),
            PunchcamEvent::SourceLost { error } => format!("Frame source lost: {}", error),
            PunchcamEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            PunchcamEvent::CalibrationComplete { .. } => "calibration_complete",
            PunchcamEvent::RoundStarted { .. } => "round_started",
            PunchcamEvent::PunchCounted { .. } => "punch_counted",
            PunchcamEvent::RoundFinished { .. } => "round_finished",
            PunchcamEvent::FrameSkipped { .. } => "frame_skipped",
            PunchcamEvent::SourceLost { .. } => "source_lost",
            PunchcamEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Broadcast bus for session events
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PunchcamEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let mut bus = Self::new(capacity);
        bus.debug_logging = true;
        bus
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<PunchcamEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: PunchcamEvent) -> Result<usize, EventBusError> {
        if self.debug_logging {
            debug!("Publishing event: {}", event.description());
        }

        match &event {
            PunchcamEvent::SourceLost { error } => {
                error!("Frame source lost: {}", error);
            }
            PunchcamEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            PunchcamEvent::FrameSkipped { .. } => {
                debug!("Frame skipped: no coherent frame pair");
            }
            _ => {}
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Publish, treating "nobody is listening" as a non-event
    pub fn notify(&self, event: PunchcamEvent) {
        if !self.has_subscribers() {
            return;
        }
        if let Err(e) = self.publish(event) {
            warn!("Failed to publish event: {}", e);
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

/// Drain a receiver without waiting, skipping over lag
pub fn drain(receiver: &mut broadcast::Receiver<PunchcamEvent>) -> Vec<PunchcamEvent> {
    let mut events = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                warn!("Event receiver lagged behind by {} events", n);
            }
            Err(_) => break,
        }
    }
    events
}
