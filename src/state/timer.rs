//! Timer Slots - Tracked, cancellable delayed actions
//!
//! Every delayed action in pageflow (hide delay, cycle flip, section component
//! hide) lives in a `TimerSlot`. A slot holds at most one pending task:
//! scheduling aborts whatever was pending, and dropping the slot aborts it too.
//!
//! Tasks are spawned with `tokio::task::spawn_local`, so they must be scheduled
//! from inside a `tokio::task::LocalSet`.

use std::time::Duration;

use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub struct TimerSlot {
    handle: Option<JoinHandle<()>>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` after `delay`, replacing any pending action.
    pub fn schedule<F>(&mut self, delay: Duration, action: F)
    where
        F: FnOnce() + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            action();
        }));
    }

    /// Abort the pending action, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether an action is scheduled and has not run yet.
    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
