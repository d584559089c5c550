use deskpilot_core::agent::CancelFlag;
use std::future::Future;
use std::io;
use tracing::warn;

/// Exit status used when a second interrupt forces the process down.
pub const FORCED_EXIT_CODE: i32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptWatch {
    /// A second interrupt arrived while the run was still winding down.
    Forced,
    /// The signal source failed before a second interrupt.
    Closed,
}

/// First interrupt requests a cooperative stop; a second one ends the watch
/// with [`InterruptWatch::Forced`].
pub async fn watch_interrupts<F, Fut>(mut next_signal: F, cancel: CancelFlag) -> InterruptWatch
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if next_signal().await.is_err() {
        return InterruptWatch::Closed;
    }
    warn!("Interrupt received, stopping after the current step (press Ctrl+C again to exit)");
    cancel.cancel();

    match next_signal().await {
        Ok(()) => {
            warn!("Second interrupt received, exiting immediately");
            InterruptWatch::Forced
        }
        Err(_) => InterruptWatch::Closed,
    }
}
