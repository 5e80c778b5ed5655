//! [`TaskSlot`]: an owned, cancellable handle to one background task.
//!
//! Every periodic or delayed task the agent runs (reconnect timer, idle
//! action loop, auto-chat loop, session event pump) lives in a slot. A slot
//! holds at most one task; installing a new one aborts the old one first,
//! and cancelling an empty or already-finished slot is a no-op.

use tokio::task::JoinHandle;

// ---------------------------------------------------------------------------
// TaskSlot
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct TaskSlot {
    // ---
    handle: Option<JoinHandle<()>>,
}

// ---

impl TaskSlot {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    // ---

    /// Install `handle`, aborting whatever the slot held before.
    pub fn replace(&mut self, handle: JoinHandle<()>) {
        self.cancel();
        self.handle = Some(handle);
    }

    // ---

    /// Abort the task if there is one. Returns `true` if a task was present.
    pub fn cancel(&mut self) -> bool {
        // ---
        match self.handle.take() {
            Some(h) => {
                h.abort();
                true
            }
            None => false,
        }
    }

    // ---

    /// `true` while the slot holds a task that has not run to completion.
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn replace_aborts_previous_task() {
        // ---
        let fired = Arc::new(AtomicBool::new(false));
        let mut slot = TaskSlot::new();

        let f = Arc::clone(&fired);
        slot.replace(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            f.store(true, Ordering::SeqCst);
        }));
        slot.replace(tokio::spawn(async {}));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!fired.load(Ordering::SeqCst), "first task must not run");
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        // ---
        let mut slot = TaskSlot::new();
        assert!(!slot.cancel());

        slot.replace(tokio::spawn(std::future::pending::<()>()));
        assert!(slot.is_active());
        assert!(slot.cancel());
        assert!(!slot.cancel());
        assert!(!slot.is_active());
    }
}
