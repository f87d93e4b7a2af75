//! Cancel-and-replace delayed task.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Runs at most one delayed task at a time.
///
/// Arming a new task aborts the previous one while it is still waiting out
/// its delay. Once the delay has passed the task is detached and always runs
/// to completion, so an in-progress write is never cut off mid-request.
#[derive(Debug)]
pub(crate) struct Debouncer {
    runtime: Handle,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Spawns onto `runtime` so arming works from any thread.
    pub(crate) const fn new(runtime: Handle, delay: Duration) -> Self {
        Self {
            runtime,
            delay,
            pending: Mutex::new(None),
        }
    }

    pub(crate) const fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `task` after the delay, replacing whatever was pending.
    pub(crate) fn arm<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            drop(tokio::spawn(task));
        });

        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Abort the task if it is still waiting. Returns whether one was.
    pub(crate) fn cancel(&self) -> bool {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        pending.is_some_and(|handle| {
            let unfinished = !handle.is_finished();
            handle.abort();
            unfinished
        })
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
