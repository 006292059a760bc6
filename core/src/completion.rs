//! Fire-after-delay delivery of the host's completion callback.

use std::{cell::RefCell, fmt, rc::Rc, thread, time::Duration};

/// Real-time delay between an engine latching `ended` and the host callback.
pub const COMPLETION_GRACE: Duration = Duration::from_millis(800);

/// Callback supplied by the host and invoked once a run has finished.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

/// Runs a task once a real-time delay has elapsed.
///
/// Scheduling is fire-and-forget: a scheduled task cannot be cancelled and
/// does not observe anything the engine does afterwards.
pub trait Scheduler {
    /// Arranges for `task` to run once `delay` has elapsed.
    fn fire_after(&self, delay: Duration, task: CompletionCallback);
}

/// Scheduler that sleeps on a dedicated thread before running the task.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadScheduler;

impl Scheduler for ThreadScheduler {
    fn fire_after(&self, delay: Duration, task: CompletionCallback) {
        let spawned = thread::Builder::new()
            .name("stabilize-completion".to_owned())
            .spawn(move || {
                thread::sleep(delay);
                task();
            });
        if let Err(error) = spawned {
            log::error!("failed to spawn completion timer thread: {error}");
        }
    }
}

struct PendingTask {
    due: Duration,
    task: CompletionCallback,
}

#[derive(Default)]
struct ManualQueue {
    now: Duration,
    pending: Vec<PendingTask>,
}

/// Scheduler driven by explicit calls to [`ManualScheduler::advance`].
///
/// Clones share one queue, so a host keeps a handle while the engine owns
/// another. Tests use it to observe delivery timing without sleeping.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Rc<RefCell<ManualQueue>>,
}

impl ManualScheduler {
    /// Creates a scheduler with an empty queue at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the scheduler's clock forward and runs every task now due.
    ///
    /// Tasks run in due order. Returns the number of tasks that ran.
    pub fn advance(&self, elapsed: Duration) -> usize {
        let due = {
            let mut queue = self.queue.borrow_mut();
            queue.now = queue.now.saturating_add(elapsed);
            let now = queue.now;
            let (due, waiting): (Vec<_>, Vec<_>) =
                queue.pending.drain(..).partition(|pending| pending.due <= now);
            queue.pending = waiting;
            due
        };

        let mut due = due;
        due.sort_by_key(|pending| pending.due);
        let count = due.len();
        for pending in due {
            (pending.task)();
        }
        count
    }

    /// Number of tasks scheduled but not yet run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().pending.len()
    }
}

impl Scheduler for ManualScheduler {
    fn fire_after(&self, delay: Duration, task: CompletionCallback) {
        let mut queue = self.queue.borrow_mut();
        let due = queue.now.saturating_add(delay);
        queue.pending.push(PendingTask { due, task });
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queue = self.queue.borrow();
        f.debug_struct("ManualScheduler")
            .field("now", &queue.now)
            .field("pending", &queue.pending.len())
            .finish()
    }
}

/// One-shot hand-off of the completion callback to a [`Scheduler`].
///
/// The callback is moved out on the first [`trigger`](Self::trigger), so it
/// can be scheduled at most once no matter how often the engine calls it.
pub struct CompletionNotice {
    scheduler: Box<dyn Scheduler>,
    callback: Option<CompletionCallback>,
    grace: Duration,
}

impl CompletionNotice {
    /// Creates a notice that runs `callback` on `scheduler` after [`COMPLETION_GRACE`].
    #[must_use]
    pub fn new<S, F>(scheduler: S, callback: F) -> Self
    where
        S: Scheduler + 'static,
        F: FnOnce() + Send + 'static,
    {
        Self {
            scheduler: Box::new(scheduler),
            callback: Some(Box::new(callback)),
            grace: COMPLETION_GRACE,
        }
    }

    /// Creates a notice with no callback attached.
    #[must_use]
    pub fn silent() -> Self {
        Self {
            scheduler: Box::new(ThreadScheduler),
            callback: None,
            grace: COMPLETION_GRACE,
        }
    }

    /// Overrides the delay between triggering and running the callback.
    #[must_use]
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Delay applied between triggering and running the callback.
    #[must_use]
    pub const fn grace(&self) -> Duration {
        self.grace
    }

    /// Hands the callback to the scheduler if it has not been handed over yet.
    ///
    /// Returns `true` on the call that scheduled the callback.
    pub fn trigger(&mut self) -> bool {
        let Some(callback) = self.callback.take() else {
            return false;
        };
        self.scheduler.fire_after(self.grace, callback);
        true
    }

    /// Reports whether the callback has already been handed to the scheduler
    /// or was never attached.
    #[must_use]
    pub fn is_spent(&self) -> bool {
        self.callback.is_none()
    }
}

impl fmt::Debug for CompletionNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionNotice")
            .field("armed", &self.callback.is_some())
            .field("grace", &self.grace)
            .finish()
    }
}

impl Default for CompletionNotice {
    fn default() -> Self {
        Self::silent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc,
    };

    fn counting_notice(scheduler: &ManualScheduler) -> (CompletionNotice, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&calls);
        let notice = CompletionNotice::new(scheduler.clone(), move || {
            let _ = observed.fetch_add(1, Ordering::SeqCst);
        });
        (notice, calls)
    }

    #[test]
    fn manual_scheduler_runs_task_only_after_grace() {
        let scheduler = ManualScheduler::new();
        let (mut notice, calls) = counting_notice(&scheduler);

        assert!(notice.trigger());
        assert_eq!(scheduler.advance(Duration::from_millis(799)), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.advance(Duration::from_millis(1)), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn repeated_triggers_schedule_once() {
        let scheduler = ManualScheduler::new();
        let (mut notice, calls) = counting_notice(&scheduler);

        assert!(notice.trigger());
        assert!(!notice.trigger());
        assert!(!notice.trigger());
        assert!(notice.is_spent());
        assert_eq!(scheduler.pending(), 1);

        let _ = scheduler.advance(Duration::from_secs(10));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn manual_scheduler_runs_tasks_in_due_order() {
        let scheduler = ManualScheduler::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        for (label, delay) in [("late", 30), ("early", 10), ("middle", 20)] {
            let order = Arc::clone(&order);
            scheduler.fire_after(
                Duration::from_millis(delay),
                Box::new(move || order.lock().expect("poisoned").push(label)),
            );
        }

        assert_eq!(scheduler.advance(Duration::from_millis(50)), 3);
        assert_eq!(
            *order.lock().expect("poisoned"),
            vec!["early", "middle", "late"]
        );
    }

    #[test]
    fn silent_notice_never_schedules() {
        let mut notice = CompletionNotice::silent();
        assert!(notice.is_spent());
        assert!(!notice.trigger());
    }

    #[test]
    fn thread_scheduler_delivers_after_delay() {
        let (sender, receiver) = mpsc::channel();
        let mut notice = CompletionNotice::new(ThreadScheduler, move || {
            let _ = sender.send(());
        })
        .with_grace(Duration::from_millis(20));

        assert!(receiver.try_recv().is_err());
        assert!(notice.trigger());
        receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("completion callback should fire");
    }
}
