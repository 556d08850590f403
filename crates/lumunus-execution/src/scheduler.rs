//! Delayed task scheduling.
//!
//! The engines never sleep. Every "thinking" or "message" step is a task handed
//! to a [`Scheduler`] with a delay, and every task can be cancelled through the
//! [`TaskHandle`] returned when it was scheduled.
//!
//! Two implementations are provided:
//! - [`TokioScheduler`] runs tasks on a tokio runtime after a real delay.
//! - [`ManualScheduler`] keeps a virtual clock that only moves when
//!   [`ManualScheduler::advance`] is called, for deterministic tests and
//!   step-by-step drivers.

use crate::lock;
use lumunus_core::{LumunusError, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

/// A unit of scheduled work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Identifies a scheduled task for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

pub trait Scheduler: Send + Sync {
    /// Runs `task` once `delay` has elapsed, unless cancelled first.
    fn after(&self, delay: Duration, task: Task) -> TaskHandle;

    /// Cancels a pending task. Unknown or already-run handles are ignored.
    fn cancel(&self, handle: TaskHandle);
}

// ============================================================================
// Tokio
// ============================================================================

/// Schedules tasks on a tokio runtime.
pub struct TokioScheduler {
    runtime: Handle,
    next_id: AtomicU64,
    tasks: Arc<Mutex<HashMap<TaskHandle, AbortHandle>>>,
}

impl TokioScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            next_id: AtomicU64::new(0),
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Uses the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// Returns [`LumunusError::Scheduler`] when called outside a tokio runtime.
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| LumunusError::scheduler(format!("No tokio runtime available: {e}")))
    }

    /// Number of tasks that have neither run nor been cancelled.
    pub fn pending(&self) -> usize {
        lock(&self.tasks).len()
    }
}

impl Scheduler for TokioScheduler {
    fn after(&self, delay: Duration, task: Task) -> TaskHandle {
        let handle = TaskHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let tasks = Arc::clone(&self.tasks);

        // Hold the map while spawning so the task cannot look itself up
        // before it has been registered.
        let mut registered = lock(&self.tasks);
        let join = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // A cancel that raced the timer removes the entry first.
            let still_scheduled = lock(&tasks).remove(&handle).is_some();
            if still_scheduled {
                task();
            }
        });
        registered.insert(handle, join.abort_handle());
        handle
    }

    fn cancel(&self, handle: TaskHandle) {
        if let Some(abort) = lock(&self.tasks).remove(&handle) {
            abort.abort();
        }
    }
}

// ============================================================================
// Virtual clock
// ============================================================================

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_id: u64,
    queue: BTreeMap<(Duration, TaskHandle), Task>,
    due: HashMap<TaskHandle, Duration>,
}

/// A scheduler driven by an explicit virtual clock.
///
/// Tasks due at the same instant run in the order they were scheduled. Tasks
/// scheduled by a running task are eligible in the same
/// [`advance`](ManualScheduler::advance) call if they fall due within it.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        lock(&self.state).now
    }

    pub fn pending(&self) -> usize {
        lock(&self.state).queue.len()
    }

    /// Virtual time at which the earliest pending task falls due.
    pub fn next_due(&self) -> Option<Duration> {
        lock(&self.state).queue.keys().next().map(|(due, _)| *due)
    }

    /// Moves the clock forward by `by`, running every task that falls due.
    ///
    /// Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let deadline = self.now() + by;
        let mut ran = 0;
        while let Some(task) = self.pop_due(Some(deadline)) {
            task();
            ran += 1;
        }
        lock(&self.state).now = deadline;
        ran
    }

    /// Runs pending tasks in due order until none remain, moving the clock to
    /// each task's due time.
    ///
    /// Does not return while tasks keep scheduling new tasks.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.pop_due(None) {
            task();
            ran += 1;
        }
        ran
    }

    /// Removes the earliest task due at or before `deadline`.
    ///
    /// The lock is released before the task runs, so tasks may schedule more.
    fn pop_due(&self, deadline: Option<Duration>) -> Option<Task> {
        let mut state = lock(&self.state);
        let (due, handle) = *state.queue.keys().next()?;
        if deadline.is_some_and(|deadline| due > deadline) {
            return None;
        }
        state.due.remove(&handle);
        state.now = state.now.max(due);
        state.queue.remove(&(due, handle))
    }
}

impl Scheduler for ManualScheduler {
    fn after(&self, delay: Duration, task: Task) -> TaskHandle {
        let mut state = lock(&self.state);
        let handle = TaskHandle(state.next_id);
        state.next_id += 1;
        let due = state.now + delay;
        state.queue.insert((due, handle), task);
        state.due.insert(handle, due);
        handle
    }

    fn cancel(&self, handle: TaskHandle) {
        let mut state = lock(&self.state);
        if let Some(due) = state.due.remove(&handle) {
            state.queue.remove(&(due, handle));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Task) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let make = move |label: &'static str| -> Task {
            let sink = Arc::clone(&sink);
            Box::new(move || sink.lock().unwrap().push(label))
        };
        (log, make)
    }

    #[test]
    fn test_manual_runs_in_due_order() {
        let scheduler = ManualScheduler::new();
        let (log, task) = recorder();

        scheduler.after(Duration::from_millis(30), task("late"));
        scheduler.after(Duration::from_millis(10), task("early"));
        scheduler.after(Duration::from_millis(10), task("early-second"));

        assert_eq!(scheduler.advance(Duration::from_millis(5)), 0);
        assert_eq!(scheduler.advance(Duration::from_millis(5)), 2);
        assert_eq!(*log.lock().unwrap(), vec!["early", "early-second"]);
        assert_eq!(scheduler.now(), Duration::from_millis(10));
        assert_eq!(scheduler.next_due(), Some(Duration::from_millis(30)));

        assert_eq!(scheduler.run_until_idle(), 1);
        assert_eq!(scheduler.now(), Duration::from_millis(30));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_manual_cancel() {
        let scheduler = ManualScheduler::new();
        let (log, task) = recorder();

        let handle = scheduler.after(Duration::from_millis(10), task("cancelled"));
        scheduler.after(Duration::from_millis(20), task("kept"));
        scheduler.cancel(handle);
        scheduler.cancel(handle);

        scheduler.advance(Duration::from_secs(1));
        assert_eq!(*log.lock().unwrap(), vec!["kept"]);
    }

    #[test]
    fn test_manual_chained_tasks_within_one_advance() {
        let scheduler = Arc::new(ManualScheduler::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let inner_scheduler = Arc::clone(&scheduler);
        let inner_log = Arc::clone(&log);
        scheduler.after(
            Duration::from_millis(10),
            Box::new(move || {
                inner_log.lock().unwrap().push("first");
                let chained_log = Arc::clone(&inner_log);
                inner_scheduler.after(
                    Duration::from_millis(10),
                    Box::new(move || chained_log.lock().unwrap().push("second")),
                );
            }),
        );

        assert_eq!(scheduler.advance(Duration::from_millis(15)), 1);
        assert_eq!(scheduler.advance(Duration::from_millis(5)), 1);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_runs_after_delay() {
        let scheduler = TokioScheduler::current().unwrap();
        let (log, task) = recorder();

        scheduler.after(Duration::from_millis(100), task("fired"));
        assert_eq!(scheduler.pending(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(log.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*log.lock().unwrap(), vec!["fired"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_cancel() {
        let scheduler = TokioScheduler::current().unwrap();
        let (log, task) = recorder();

        let handle = scheduler.after(Duration::from_millis(100), task("cancelled"));
        scheduler.cancel(handle);
        assert_eq!(scheduler.pending(), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_tokio_requires_runtime() {
        let err = TokioScheduler::current().err().unwrap();
        assert!(matches!(err, LumunusError::Scheduler(_)));
    }
}
