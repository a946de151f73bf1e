use std::ops::ControlFlow;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// One repeating tick registration running on the current `LocalSet`.
///
/// Cancellation is synchronous: once [`TickRegistration::cancel`] returns,
/// `on_tick` is not called again.
pub(crate) struct TickRegistration {
    /// Cancellation token for the tick task
    cancel_token: CancellationToken,

    task: JoinHandle<()>,
}

impl TickRegistration {
    /// Spawn a local task calling `on_tick` every `period`, first one period
    /// from now. The task ends when `on_tick` breaks or the registration is
    /// cancelled.
    ///
    /// # Panics
    ///
    /// Panics if called outside a `tokio::task::LocalSet`.
    pub(crate) fn spawn<F>(name: String, period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> ControlFlow<()> + 'static,
    {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let task = tokio::task::spawn_local(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            log::debug!("Ticks for timer '{}' started every {:?}", name, period);

            loop {
                tokio::select! {
                    biased;

                    _ = token.cancelled() => {
                        log::debug!("Ticks for timer '{}' cancelled", name);
                        break;
                    },

                    _ = ticker.tick() => {
                        if token.is_cancelled() {
                            break;
                        }
                        if on_tick().is_break() {
                            log::debug!("Ticks for timer '{}' finished", name);
                            break;
                        }
                    }
                }
            }
        });

        TickRegistration { cancel_token, task }
    }

    pub(crate) fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TickRegistration {
    fn drop(&mut self) {
        self.cancel();
    }
}
