mod runtime;
mod shutdown;
mod types;


pub use runtime::PunchcamApp;
pub use shutdown::{spawn_signal_handlers, ShutdownHandle};
pub use types::{RunSummary, ShutdownReason};
