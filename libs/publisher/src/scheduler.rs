use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// When to run: every `period`, first run immediately, optionally stopping
/// after `limit` runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub period: Duration,
    pub limit: Option<u64>,
}

impl Schedule {
    pub fn every(period: Duration) -> Self {
        Self { period, limit: None }
    }

    pub fn limit(mut self, ticks: u64) -> Self {
        self.limit = Some(ticks);
        self
    }
}

/// Periodic runner owning one tokio task.
///
/// The action is blocking; each run goes to the blocking pool and the loop
/// waits for it, so runs never overlap and the async workers stay free. A
/// tick that overruns the period pushes the next one back instead of
/// triggering a burst of catch-up runs. Cancellation is observed between
/// ticks only, so a tick in progress always completes.
pub struct Scheduler {
    token: CancellationToken,
    handle: JoinHandle<u64>,
}

impl Scheduler {
    /// Spawn the loop on the current tokio runtime.
    ///
    /// # Panics
    /// If `schedule.period` is zero.
    pub fn start<F>(schedule: Schedule, mut action: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        assert!(!schedule.period.is_zero(), "schedule period must be non-zero");

        let token = CancellationToken::new();
        let t = token.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(schedule.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks = 0u64;

            loop {
                if schedule.limit.is_some_and(|limit| ticks >= limit) {
                    tracing::info!(ticks, "tick limit reached");
                    break;
                }
                tokio::select! {
                    biased;
                    _ = t.cancelled() => {
                        tracing::info!(ticks, "scheduler cancelled");
                        break;
                    }
                    _ = interval.tick() => {}
                }
                ticks += 1;
                tracing::debug!(tick = ticks, "tick");
                action = match run_blocking(action).await {
                    Some(action) => action,
                    None => break,
                };
            }
            ticks
        });

        Self { token, handle }
    }

    /// Token that stops the loop when cancelled.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait for the loop to end on its own (tick limit or external cancel).
    /// Returns the number of ticks run.
    ///
    /// # Panics
    /// Re-raises a panic from the action.
    pub async fn join(self) -> u64 {
        match self.handle.await {
            Ok(ticks) => ticks,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                tracing::error!(error = %e, "scheduler task failed");
                0
            }
        }
    }

    /// Stop after the tick in progress, if any. Returns the number of ticks run.
    pub async fn shutdown(self) -> u64 {
        self.token.cancel();
        self.join().await
    }
}

/// Run one tick on the blocking pool and hand the action back.
/// `None` once the runtime is shutting down.
async fn run_blocking<F>(mut action: F) -> Option<F>
where
    F: FnMut() + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || {
        action();
        action
    })
    .await;
    match result {
        Ok(action) => Some(action),
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => {
            tracing::warn!(error = %e, "tick abandoned");
            None
        }
    }
}
