//! Cancellable repeating tasks

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::debug;

/// When the first run of a scheduled task fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstRun {
    Immediately,
    AfterInterval,
}

/// Handle to a task started by [`schedule`]. Cancelling or dropping the
/// handle stops the task; no further run fires afterwards.
#[derive(Debug)]
pub struct TaskHandle {
    every: Duration,
    join: JoinHandle<()>,
}

impl TaskHandle {
    pub fn every(&self) -> Duration {
        self.every
    }

    pub fn is_active(&self) -> bool {
        !self.join.is_finished()
    }

    pub fn cancel(self) {
        // Drop does the work
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.join.abort();
    }
}

/// Run `task` every `every`, starting per `first_run`. Runs never overlap: a
/// slow run delays the next tick instead of stacking.
pub fn schedule<F, Fut>(every: Duration, first_run: FirstRun, mut task: F) -> TaskHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let start = match first_run {
        FirstRun::Immediately => Instant::now(),
        FirstRun::AfterInterval => Instant::now() + every,
    };

    let join = tokio::spawn(async move {
        let mut ticker = interval_at(start, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            task().await;
        }
    });

    debug!("Scheduled task every {:?}", every);
    TaskHandle { every, join }
}
