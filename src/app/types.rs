use std::fmt;

/// Why a session stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    Signal(String),
    Cancelled,
    SourceEnded,
    SourceError(String),
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(signal) => write!(f, "received {}", signal),
            ShutdownReason::Cancelled => write!(f, "cancelled"),
            ShutdownReason::SourceEnded => write!(f, "input ended"),
            ShutdownReason::SourceError(error) => write!(f, "frame source error: {}", error),
        }
    }
}

/// Counters collected over one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub rounds_started: u32,
    pub rounds_won: u32,
    pub rounds_failed: u32,
    pub punches: u32,
}
