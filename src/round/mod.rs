mod controller;
mod timer;

pub use controller::{round_seconds, RoundController, RoundPhase, RoundState, RoundUpdate};
pub use timer::{Countdown, RoundTimer};
