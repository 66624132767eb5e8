//! Backstop timer that forces the room open when the level-ready callback is lost.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::{debug, warn};

use crate::scheduler::{ScheduledTask, Scheduler};

/// Opaque handle to one arming of the failsafe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FailsafeHandle(u64);

struct Armed {
    handle: FailsafeHandle,
    task: Box<dyn ScheduledTask>,
}

type Slot = RefCell<Option<Armed>>;

fn holds(slot: &Slot, handle: FailsafeHandle) -> bool {
    matches!(slot.borrow().as_ref(), Some(armed) if armed.handle == handle)
}

/// Clears the slot if it still belongs to `handle`.
fn release(slot: &Slot, handle: FailsafeHandle) -> Option<Armed> {
    let mut guard = slot.borrow_mut();
    if matches!(guard.as_ref(), Some(armed) if armed.handle == handle) {
        guard.take()
    } else {
        None
    }
}

/// Single-shot, cancellable deferred correction. At most one arming is live.
pub struct FailsafeTimer {
    scheduler: Rc<dyn Scheduler>,
    slot: Rc<Slot>,
    next_id: Cell<u64>,
}

impl FailsafeTimer {
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            slot: Rc::new(RefCell::new(None)),
            next_id: Cell::new(1),
        }
    }

    /// Schedule `corrective` after `delay`, replacing any pending arming.
    ///
    /// When the timer fires it first asks `is_resolved`; if normal resolution
    /// already happened the corrective action is skipped.
    pub fn arm<P, A>(&self, delay: Duration, is_resolved: P, corrective: A) -> FailsafeHandle
    where
        P: Fn() -> bool + 'static,
        A: FnOnce() + 'static,
    {
        self.disarm_current();

        let handle = FailsafeHandle(self.next_id.get());
        self.next_id.set(handle.0 + 1);

        let slot: Weak<Slot> = Rc::downgrade(&self.slot);
        let task = self.scheduler.schedule(
            delay,
            Box::new(move || {
                let Some(slot) = slot.upgrade() else {
                    return;
                };
                // Cancellation is best effort: a superseded arming can still
                // get here, so confirm it is the live one.
                if !holds(&slot, handle) {
                    debug!(
                        target = "join_gate::failsafe",
                        "stale failsafe {handle:?} fired, ignoring"
                    );
                    return;
                }
                if is_resolved() {
                    debug!(
                        target = "join_gate::failsafe",
                        "failsafe {handle:?} fired after normal resolution, nothing to do"
                    );
                    release(&slot, handle);
                    return;
                }
                warn!(
                    target = "join_gate::failsafe",
                    "level ready not observed within {delay:?}, forcing room open"
                );
                corrective();
                release(&slot, handle);
            }),
        );

        *self.slot.borrow_mut() = Some(Armed { handle, task });
        debug!(
            target = "join_gate::failsafe",
            "failsafe {handle:?} armed for {delay:?}"
        );
        handle
    }

    /// Cancel `handle` if it is still the pending arming. Returns whether
    /// anything was cancelled; disarming twice or after firing is a no-op.
    pub fn disarm(&self, handle: FailsafeHandle) -> bool {
        let released = release(&self.slot, handle);
        Self::cancel(released)
    }

    /// Cancel whatever arming is pending, if any.
    pub fn disarm_current(&self) -> bool {
        let released = self.slot.borrow_mut().take();
        Self::cancel(released)
    }

    fn cancel(released: Option<Armed>) -> bool {
        match released {
            Some(armed) => {
                let was_pending = armed.task.is_pending();
                armed.task.cancel();
                if was_pending {
                    debug!(
                        target = "join_gate::failsafe",
                        "failsafe {:?} disarmed",
                        armed.handle
                    );
                }
                was_pending
            }
            None => false,
        }
    }

    /// Whether a pending arming exists.
    pub fn is_armed(&self) -> bool {
        self.slot
            .borrow()
            .as_ref()
            .is_some_and(|armed| armed.task.is_pending())
    }

    /// Handle of the live arming, if any.
    pub fn current(&self) -> Option<FailsafeHandle> {
        self.slot.borrow().as_ref().map(|armed| armed.handle)
    }
}

impl fmt::Debug for FailsafeTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailsafeTimer")
            .field("current", &self.current())
            .field("armed", &self.is_armed())
            .finish()
    }
}
