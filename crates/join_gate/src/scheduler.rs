//! Deferred single-shot tasks on the host's cooperative thread.
//!
//! Nothing here is `Send`: scheduled work resumes on the same thread that
//! scheduled it, between host callbacks, so it can touch the coordinator's
//! shared state without locks.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Boxed one-shot work item.
pub type Task = Box<dyn FnOnce()>;

/// Runs a task once after a delay.
pub trait Scheduler {
    fn schedule(&self, delay: Duration, task: Task) -> Box<dyn ScheduledTask>;
}

/// Handle to a task handed to a [`Scheduler`].
pub trait ScheduledTask {
    /// Best-effort cancel; a task already running or finished is unaffected.
    fn cancel(&self);

    /// True until the task runs or is cancelled.
    fn is_pending(&self) -> bool;
}

/// Scheduler backed by the current tokio `LocalSet`.
///
/// `schedule` must be called from inside a `LocalSet` (it uses
/// `tokio::task::spawn_local`).
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> Box<dyn ScheduledTask> {
        let cancel = CancellationToken::new();
        let cancel_child = cancel.clone();

        let handle = tokio::task::spawn_local(async move {
            tokio::select! {
                biased;
                _ = cancel_child.cancelled() => {}
                _ = tokio::time::sleep(delay) => task(),
            }
        });

        Box::new(TokioTask { handle, cancel })
    }
}

struct TokioTask {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl ScheduledTask for TokioTask {
    fn cancel(&self) {
        self.cancel.cancel();
    }

    fn is_pending(&self) -> bool {
        !self.cancel.is_cancelled() && !self.handle.is_finished()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Pending,
    Cancelled,
    Fired,
}

struct QueuedTask {
    due: Duration,
    seq: u64,
    state: Rc<Cell<TaskState>>,
    task: Task,
}

#[derive(Default)]
struct ManualQueue {
    now: Duration,
    next_seq: u64,
    tasks: Vec<QueuedTask>,
}

impl ManualQueue {
    /// Remove and return the earliest pending task due at or before `until`.
    fn pop_due(&mut self, until: Duration) -> Option<QueuedTask> {
        self.tasks
            .retain(|queued| queued.state.get() == TaskState::Pending);
        let index = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, queued)| queued.due <= until)
            .min_by_key(|(_, queued)| (queued.due, queued.seq))
            .map(|(index, _)| index)?;
        let queued = self.tasks.remove(index);
        self.now = self.now.max(queued.due);
        Some(queued)
    }
}

/// Virtual-clock scheduler. Time only moves when [`ManualScheduler::advance`]
/// is called, which makes timer races reproducible.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Rc<RefCell<ManualQueue>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.queue.borrow().now
    }

    /// Number of tasks still waiting to run.
    pub fn pending(&self) -> usize {
        self.queue
            .borrow()
            .tasks
            .iter()
            .filter(|queued| queued.state.get() == TaskState::Pending)
            .count()
    }

    /// Move the clock forward, running due tasks in order. Returns how many ran.
    ///
    /// Tasks may schedule further tasks; those run too if they fall due
    /// inside the window.
    pub fn advance(&self, by: Duration) -> usize {
        let until = self.now() + by;
        let mut ran = 0;

        loop {
            let next = self.queue.borrow_mut().pop_due(until);
            let Some(queued) = next else {
                break;
            };
            queued.state.set(TaskState::Fired);
            (queued.task)();
            ran += 1;
        }

        self.queue.borrow_mut().now = until;
        ran
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now", &self.now())
            .field("pending", &self.pending())
            .finish()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> Box<dyn ScheduledTask> {
        let state = Rc::new(Cell::new(TaskState::Pending));
        let mut queue = self.queue.borrow_mut();
        let seq = queue.next_seq;
        queue.next_seq += 1;
        let due = queue.now + delay;
        queue.tasks.push(QueuedTask {
            due,
            seq,
            state: state.clone(),
            task,
        });
        Box::new(ManualTask { state })
    }
}

struct ManualTask {
    state: Rc<Cell<TaskState>>,
}

impl ScheduledTask for ManualTask {
    fn cancel(&self) {
        if self.state.get() == TaskState::Pending {
            self.state.set(TaskState::Cancelled);
        }
    }

    fn is_pending(&self) -> bool {
        self.state.get() == TaskState::Pending
    }
}
