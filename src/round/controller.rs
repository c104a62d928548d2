use super::timer::Countdown;
use crate::config::RoundConfig;
use crate::detector::{PunchDebouncer, PunchEvent};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Phase of the round state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Background model still being built; no scoring
    Calibrating,
    /// Punches are being counted against the goal
    Active,
    /// Goal reached before the countdown expired
    Success,
    /// Countdown expired before the goal was reached
    Failed,
}

impl RoundPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RoundPhase::Success | RoundPhase::Failed)
    }

    /// Banner shown while the phase is displayed
    pub fn message(&self) -> Option<&'static str> {
        match self {
            RoundPhase::Success => Some("SUCCESS!"),
            RoundPhase::Failed => Some("FAILED!"),
            RoundPhase::Calibrating | RoundPhase::Active => None,
        }
    }
}

/// Snapshot of the current round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundState {
    pub goal: u32,
    pub punch_count: u32,
    pub time_remaining: u32,
    pub phase: RoundPhase,
}

/// Outcome of feeding one frame into the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundUpdate {
    pub state: RoundState,
    /// Punch counted on this frame
    pub punch: Option<PunchEvent>,
    /// Terminal phase entered on this frame
    pub finished: Option<RoundPhase>,
}

/// Seconds granted for a goal. Halves round to even.
pub fn round_seconds(goal: u32, difficulty: f64) -> u32 {
    (goal as f64 * difficulty).round_ties_even().max(0.0) as u32
}

/// Round-based scoring state machine.
///
/// Owns the punch debouncer so that a round reset clears goal, count,
/// debouncer and countdown together before scoring resumes.
pub struct RoundController {
    config: RoundConfig,
    debouncer: PunchDebouncer,
    countdown: Countdown,
    rng: StdRng,
    goal: u32,
    punch_count: u32,
    phase: RoundPhase,
    rounds_started: u32,
}

impl RoundController {
    pub fn new(config: RoundConfig, detect_threshold: u32, countdown: Countdown) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, detect_threshold, countdown, rng)
    }

    pub fn with_rng(
        config: RoundConfig,
        detect_threshold: u32,
        countdown: Countdown,
        rng: StdRng,
    ) -> Self {
        Self {
            config,
            debouncer: PunchDebouncer::new(detect_threshold),
            countdown,
            rng,
            goal: 0,
            punch_count: 0,
            phase: RoundPhase::Calibrating,
            rounds_started: 0,
        }
    }

    /// Draw a new goal, clear the count and debouncer, reassign the countdown
    /// and enter `Active`.
    pub fn start_round(&mut self) -> RoundState {
        if self.phase == RoundPhase::Active {
            warn!("Restarting round {} while it is still active", self.rounds_started);
        }

        self.goal = self
            .rng
            .gen_range(self.config.goal_min..=self.config.goal_max);
        self.punch_count = 0;
        self.debouncer.reset();

        let seconds = round_seconds(self.goal, self.config.difficulty);
        self.countdown.set(seconds);

        self.rounds_started += 1;
        self.phase = RoundPhase::Active;

        info!(
            "Round {} started: goal {} punches in {}s",
            self.rounds_started, self.goal, seconds
        );
        self.state()
    }

    /// Feed one processed frame's blob decision.
    ///
    /// Outside `Active` nothing changes. Success is checked before the
    /// countdown, so reaching the goal as the timer expires is a success.
    pub fn update(&mut self, has_qualifying_blob: bool) -> RoundUpdate {
        if self.phase != RoundPhase::Active {
            return RoundUpdate {
                state: self.state(),
                punch: None,
                finished: None,
            };
        }

        let punch = self.debouncer.update(has_qualifying_blob);
        if punch.is_some() {
            self.punch_count += 1;
            info!("Punch {}/{}", self.punch_count, self.goal);
        }

        let finished = if self.punch_count >= self.goal {
            Some(RoundPhase::Success)
        } else if self.countdown.remaining() < 1 {
            Some(RoundPhase::Failed)
        } else {
            None
        };

        if let Some(phase) = finished {
            self.phase = phase;
            info!(
                "Round {} finished: {:?} with {}/{} punches",
                self.rounds_started, phase, self.punch_count, self.goal
            );
        } else {
            debug!(
                "Round {}: {}/{} punches, {}s left",
                self.rounds_started,
                self.punch_count,
                self.goal,
                self.countdown.remaining()
            );
        }

        RoundUpdate {
            state: self.state(),
            punch,
            finished,
        }
    }

    pub fn state(&self) -> RoundState {
        RoundState {
            goal: self.goal,
            punch_count: self.punch_count,
            time_remaining: self.countdown.remaining(),
            phase: self.phase,
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Number of rounds started since creation
    pub fn rounds_started(&self) -> u32 {
        self.rounds_started
    }

    /// Pause between a terminal phase and the next round
    pub fn pause_duration(&self) -> Duration {
        Duration::from_secs(self.config.pause_seconds)
    }

    pub fn debouncer(&self) -> &PunchDebouncer {
        &self.debouncer
    }
}
