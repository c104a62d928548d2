use crate::error::{PunchcamError, Result};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Shared remaining-seconds cell. Cloning yields another handle to the same value.
#[derive(Debug, Clone, Default)]
pub struct Countdown {
    remaining: Arc<AtomicU32>,
    restarted: Arc<Notify>,
}

impl Countdown {
    pub fn new(seconds: u32) -> Self {
        Self {
            remaining: Arc::new(AtomicU32::new(seconds)),
            restarted: Arc::new(Notify::new()),
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::Acquire)
    }

    /// Replace the remaining count regardless of its current value.
    ///
    /// A running [`RoundTimer`] restarts its tick phase, so the next
    /// decrement lands one full interval after this call.
    pub fn set(&self, seconds: u32) {
        self.remaining.store(seconds, Ordering::Release);
        self.restarted.notify_one();
    }

    /// Decrement by one, holding at zero. Returns the new value.
    pub fn tick(&self) -> u32 {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |value| {
                Some(value.saturating_sub(1))
            })
            .unwrap_or(0);
        previous.saturating_sub(1)
    }

    pub fn is_expired(&self) -> bool {
        self.remaining() == 0
    }
}

/// Wall-clock countdown running on its own task, independent of frame cadence
pub struct RoundTimer {
    countdown: Countdown,
    tick_interval: Duration,
    cancellation_token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RoundTimer {
    /// Spawn the countdown task. Must be called from within a tokio runtime.
    pub fn start(initial_seconds: u32, tick_interval: Duration) -> Self {
        let countdown = Countdown::new(initial_seconds);
        let cancellation_token = CancellationToken::new();

        info!(
            "Starting round timer at {}s (tick every {:?})",
            initial_seconds, tick_interval
        );

        let task_countdown = countdown.clone();
        let task_token = cancellation_token.clone();
        let restarted = Arc::clone(&countdown.restarted);
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + tick_interval, tick_interval);

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => {
                        debug!("Round timer task cancelled");
                        break;
                    }
                    _ = restarted.notified() => {
                        ticker.reset();
                        debug!("Round timer phase restarted");
                    }
                    _ = ticker.tick() => {
                        let remaining = task_countdown.tick();
                        debug!("Round timer tick: {}s remaining", remaining);
                    }
                }
            }
        });

        Self {
            countdown,
            tick_interval,
            cancellation_token,
            task: Some(task),
        }
    }

    /// Handle to the shared remaining count
    pub fn countdown(&self) -> Countdown {
        self.countdown.clone()
    }

    pub fn remaining(&self) -> u32 {
        self.countdown.remaining()
    }

    pub fn set(&self, seconds: u32) {
        self.countdown.set(seconds);
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |task| !task.is_finished())
    }

    /// Stop the countdown task permanently and wait for it to exit
    pub async fn stop(&mut self) -> Result<()> {
        self.cancellation_token.cancel();

        let Some(task) = self.task.take() else {
            warn!("Round timer is not running");
            return Ok(());
        };

        task.await.map_err(|e| {
            PunchcamError::component("round_timer", format!("Timer task failed: {}", e))
        })?;

        info!("Round timer stopped at {}s", self.countdown.remaining());
        Ok(())
    }
}

impl Drop for RoundTimer {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}
