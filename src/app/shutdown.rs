use super::{PunchcamApp, ShutdownReason};
use crate::display::DisplaySink;
use crate::error::{PunchcamError, Result};
use crate::events::PunchcamEvent;
use crate::source::FrameSource;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::signal;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Cloneable handle that asks a running session to stop.
///
/// The first recorded reason wins; later requests only cancel.
#[derive(Clone, Default)]
pub struct ShutdownHandle {
    token: CancellationToken,
    reason: Arc<Mutex<Option<ShutdownReason>>>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self, reason: ShutdownReason) {
        {
            let mut slot = self.reason.lock();
            if slot.is_none() {
                *slot = Some(reason);
            }
        }
        self.token.cancel();
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Reason recorded by the first request, if any
    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.lock().clone()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

/// Request shutdown on SIGINT (Ctrl+C) and, on Unix, SIGTERM
pub fn spawn_signal_handlers(handle: ShutdownHandle) {
    #[cfg(unix)]
    {
        let sigterm_handle = handle.clone();
        tokio::spawn(async move {
            let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    warn!("Failed to register SIGTERM handler: {}", e);
                    return;
                }
            };
            if sigterm.recv().await.is_some() {
                info!("Received SIGTERM signal");
                sigterm_handle.request(ShutdownReason::Signal("SIGTERM".to_string()));
            }
        });
    }

    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received SIGINT signal (Ctrl+C)");
                handle.request(ShutdownReason::Signal("SIGINT".to_string()));
            }
            Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
        }
    });
}

impl<S: FrameSource, D: DisplaySink> PunchcamApp<S, D> {
    /// Release the source, stop the timer and close the sink.
    ///
    /// Every step runs even if an earlier one fails; the first failure is returned.
    pub(super) async fn shutdown(&mut self, reason: &ShutdownReason) -> Result<()> {
        info!("Beginning shutdown: {}", reason);

        self.event_bus.notify(PunchcamEvent::ShutdownRequested {
            timestamp: SystemTime::now(),
            reason: reason.to_string(),
        });
        self.shutdown.token.cancel();

        let mut first_error = None;

        let released = stop_component("source", self.source.release()).await;
        record(&mut first_error, released);

        let stopped = stop_component("timer", self.timer.stop()).await;
        record(&mut first_error, stopped);

        let closed = stop_component("display", self.sink.close()).await;
        record(&mut first_error, closed);

        match first_error {
            None => {
                info!(
                    "Shutdown complete: {} frames processed, {} rounds started ({} won, {} failed)",
                    self.summary.frames_processed,
                    self.summary.rounds_started,
                    self.summary.rounds_won,
                    self.summary.rounds_failed
                );
                Ok(())
            }
            Some(e) => {
                error!("Shutdown completed with errors");
                Err(e)
            }
        }
    }
}

async fn stop_component<F>(component: &str, stop: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    info!("Stopping {}", component);
    match timeout(STOP_TIMEOUT, stop).await {
        Ok(Ok(())) => {
            info!("{} stopped", component);
            Ok(())
        }
        Ok(Err(e)) => {
            error!("Error stopping {}: {}", component, e);
            Err(e)
        }
        Err(_) => {
            error!("{} stop timeout", component);
            Err(PunchcamError::component(component, "stop timeout"))
        }
    }
}

fn record(first_error: &mut Option<PunchcamError>, result: Result<()>) {
    if let Err(e) = result {
        first_error.get_or_insert(e);
    }
}
