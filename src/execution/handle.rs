// ABOUTME: Implements RunHandle - the live, shareable view of one agent run with
// ABOUTME: lock-free status, exclusive terminal transitions, waiting and cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

/// Lifecycle state of an agent run.
///
/// `Created -> Running -> {Completed, Timeout, Error, Cancelled}`. The four
/// terminal states are exclusive: whichever transition lands first wins.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Created = 0,
    Running = 1,
    Completed = 2,
    Timeout = 3,
    Error = 4,
    Cancelled = 5,
}

impl RunStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => RunStatus::Created,
            1 => RunStatus::Running,
            2 => RunStatus::Completed,
            3 => RunStatus::Timeout,
            5 => RunStatus::Cancelled,
            _ => RunStatus::Error,
        }
    }

    /// True for the four final states.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Timeout | RunStatus::Error | RunStatus::Cancelled
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Created => write!(f, "created"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Timeout => write!(f, "timeout"),
            RunStatus::Error => write!(f, "error"),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Shared handle to a run in progress.
///
/// The executor keeps one per active run so other tasks can poll the status,
/// count recorded steps, wait for the end, or cancel.
#[derive(Debug)]
pub struct RunHandle {
    status: AtomicU8,
    steps: Arc<AtomicUsize>,
    done: Notify,
    start_time: Instant,
    end_time: Mutex<Option<Instant>>,
}

impl RunHandle {
    /// Create a handle in the `Created` state.
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(RunStatus::Created as u8),
            steps: Arc::new(AtomicUsize::new(0)),
            done: Notify::new(),
            start_time: Instant::now(),
            end_time: Mutex::new(None),
        }
    }

    pub fn status(&self) -> RunStatus {
        RunStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    /// Returns true once the run reached a terminal state.
    pub fn is_complete(&self) -> bool {
        self.status().is_terminal()
    }

    /// Number of steps recorded so far.
    pub fn steps(&self) -> usize {
        self.steps.load(Ordering::SeqCst)
    }

    /// How long the run has been going (or went, if complete).
    pub fn duration(&self) -> Duration {
        match *self.end_time.lock() {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Wait until the run reaches a terminal state and return it.
    pub async fn wait(&self) -> RunStatus {
        let notified = self.done.notified();
        tokio::pin!(notified);
        // Register before checking so a transition in between is not missed.
        notified.as_mut().enable();
        let status = self.status();
        if status.is_terminal() {
            return status;
        }
        notified.await;
        self.status()
    }

    /// Wait with a deadline; `None` if the run is still going when it passes.
    pub async fn wait_with_timeout(&self, timeout: Duration) -> Option<RunStatus> {
        tokio::time::timeout(timeout, self.wait()).await.ok()
    }

    /// Request cancellation.
    ///
    /// Returns true if the run was still live and is now `Cancelled`.
    pub fn cancel(&self) -> bool {
        self.finish(RunStatus::Cancelled)
    }

    pub(crate) fn step_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.steps)
    }

    pub(crate) fn set_running(&self) -> bool {
        self.status
            .compare_exchange(
                RunStatus::Created as u8,
                RunStatus::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Move to a terminal state if none has been reached yet.
    pub(crate) fn finish(&self, terminal: RunStatus) -> bool {
        debug_assert!(terminal.is_terminal());
        let mut current = self.status.load(Ordering::SeqCst);
        loop {
            if RunStatus::from_u8(current).is_terminal() {
                return false;
            }
            match self.status.compare_exchange(
                current,
                terminal as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        *self.end_time.lock() = Some(Instant::now());
        self.done.notify_waiters();
        true
    }
}

impl Default for RunHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_display() {
        assert_eq!(RunStatus::Created.to_string(), "created");
        assert_eq!(RunStatus::Running.to_string(), "running");
        assert_eq!(RunStatus::Completed.to_string(), "completed");
        assert_eq!(RunStatus::Timeout.to_string(), "timeout");
        assert_eq!(RunStatus::Error.to_string(), "error");
        assert_eq!(RunStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_run_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(RunStatus::Timeout).unwrap(),
            serde_json::json!("timeout")
        );
    }

    #[test]
    fn test_run_status_from_u8() {
        assert_eq!(RunStatus::from_u8(0), RunStatus::Created);
        assert_eq!(RunStatus::from_u8(3), RunStatus::Timeout);
        assert_eq!(RunStatus::from_u8(5), RunStatus::Cancelled);
        // Unknown value is treated as an error
        assert_eq!(RunStatus::from_u8(255), RunStatus::Error);
    }

    #[test]
    fn test_new_handle_is_created() {
        let handle = RunHandle::new();
        assert_eq!(handle.status(), RunStatus::Created);
        assert!(!handle.is_complete());
        assert_eq!(handle.steps(), 0);
    }

    #[test]
    fn test_set_running_only_from_created() {
        let handle = RunHandle::new();
        assert!(handle.set_running());
        assert!(!handle.set_running());
        assert_eq!(handle.status(), RunStatus::Running);
    }

    #[test]
    fn test_terminal_states_are_exclusive() {
        let handle = RunHandle::new();
        handle.set_running();
        assert!(handle.finish(RunStatus::Timeout));
        assert!(!handle.finish(RunStatus::Completed));
        assert!(!handle.cancel());
        assert_eq!(handle.status(), RunStatus::Timeout);
    }

    #[test]
    fn test_cancel_running() {
        let handle = RunHandle::new();
        handle.set_running();
        assert!(handle.cancel());
        assert_eq!(handle.status(), RunStatus::Cancelled);
        assert!(handle.is_complete());
    }

    #[test]
    fn test_cancelled_run_cannot_start() {
        let handle = RunHandle::new();
        assert!(handle.cancel());
        assert!(!handle.set_running());
        assert_eq!(handle.status(), RunStatus::Cancelled);
    }

    #[test]
    fn test_duration_freezes_on_complete() {
        let handle = RunHandle::new();
        std::thread::sleep(Duration::from_millis(10));
        handle.finish(RunStatus::Completed);
        let d1 = handle.duration();
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(d1, handle.duration());
    }

    #[test]
    fn test_step_counter_is_shared() {
        let handle = RunHandle::new();
        handle.step_counter().store(3, Ordering::SeqCst);
        assert_eq!(handle.steps(), 3);
    }

    #[test]
    fn test_wait_is_pending_until_terminal() {
        let handle = RunHandle::new();
        handle.set_running();

        let mut wait = tokio_test::task::spawn(handle.wait());
        tokio_test::assert_pending!(wait.poll());

        handle.cancel();
        assert!(wait.is_woken());
        tokio_test::assert_ready_eq!(wait.poll(), RunStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_wait_immediate_completion() {
        let handle = RunHandle::new();
        handle.finish(RunStatus::Completed);
        assert_eq!(handle.wait().await, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_wait_wakes_on_cancel() {
        let handle = Arc::new(RunHandle::new());
        handle.set_running();

        let canceller = Arc::clone(&handle);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        assert_eq!(handle.wait().await, RunStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_wait_with_timeout_expired() {
        let handle = RunHandle::new();
        handle.set_running();
        assert!(handle.wait_with_timeout(Duration::from_millis(10)).await.is_none());
    }
}
