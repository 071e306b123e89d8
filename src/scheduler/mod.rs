//! Single-threaded cooperative timer queue.
//!
//! Timers are kept in a min-heap keyed by `(due, lane, seq)`: earlier deadlines
//! fire first, [`Lane::Control`] fires before [`Lane::Data`] at the same instant,
//! and within a lane timers fire in the order they were scheduled.
//!
//! The queue owns a virtual clock. Tests advance it explicitly with
//! [`Scheduler::advance_by`] or [`Scheduler::run_until_idle`]; binaries drive the
//! same queue against the `Tokio` clock with [`Scheduler::run_realtime`].

use std::{
    cmp::Ordering as CmpOrdering,
    collections::BinaryHeap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

use crate::subscription::subscribe::UnsubscribeLogic;

type Task = Box<dyn FnOnce() + Send>;

/// Priority class of a timer among timers due at the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lane {
    /// Lifecycle control such as unsubscribing. Observed before same-instant data.
    Control,
    /// Value emissions.
    Data,
}

struct Entry {
    due: Duration,
    lane: Lane,
    seq: u64,
    done: Arc<AtomicBool>,
    task: Task,
}

impl Entry {
    fn key(&self) -> (Duration, Lane, u64) {
        (self.due, self.lane, self.seq)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed so the max-heap pops the earliest key.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other.key().cmp(&self.key())
    }
}

#[derive(Default)]
struct TimerQueue {
    now: Duration,
    next_seq: u64,
    entries: BinaryHeap<Entry>,
}

impl TimerQueue {
    fn drop_cancelled_head(&mut self) {
        while self
            .entries
            .peek()
            .is_some_and(|e| e.done.load(Ordering::Acquire))
        {
            self.entries.pop();
        }
    }

    fn next_due(&mut self) -> Option<Duration> {
        self.drop_cancelled_head();
        self.entries.peek().map(|e| e.due)
    }

    /// Pops the earliest live timer if it is due at or before `limit`, moving the
    /// clock forward to its deadline.
    fn pop_due(&mut self, limit: Option<Duration>) -> Option<(u64, Task)> {
        self.drop_cancelled_head();
        if let (Some(limit), Some(head)) = (limit, self.entries.peek()) {
            if head.due > limit {
                return None;
            }
        }
        let entry = self.entries.pop()?;
        entry.done.store(true, Ordering::Release);
        self.now = self.now.max(entry.due);
        Some((entry.seq, entry.task))
    }
}

/// Handle to a scheduled timer.
///
/// Converts into [`UnsubscribeLogic`] so it can be registered with an
/// [`Emitter`](crate::subscribe::Emitter) and cancelled when the subscription closes.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    seq: u64,
    done: Arc<AtomicBool>,
}

impl TimerHandle {
    /// Prevents the timer from firing. Returns `false` if it already fired or was
    /// cancelled before.
    pub fn cancel(&self) -> bool {
        let cancelled = !self.done.swap(true, Ordering::AcqRel);
        if cancelled {
            debug!(timer = self.seq, "timer cancelled");
        }
        cancelled
    }

    /// Returns `true` while the timer has neither fired nor been cancelled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.done.load(Ordering::Acquire)
    }
}

impl From<TimerHandle> for UnsubscribeLogic {
    fn from(handle: TimerHandle) -> Self {
        UnsubscribeLogic::Timer(handle)
    }
}

/// Shared handle to a timer queue. Cloning is shallow.
#[derive(Clone, Default)]
pub struct Scheduler {
    queue: Arc<Mutex<TimerQueue>>,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self) -> MutexGuard<'_, TimerQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current virtual time, measured from the creation of the scheduler.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.queue().now
    }

    /// Schedules `task` on the data lane, `delay` after the current virtual time.
    pub fn schedule(&self, delay: Duration, task: impl FnOnce() + Send + 'static) -> TimerHandle {
        self.schedule_on(Lane::Data, delay, task)
    }

    /// Schedules `task` on `lane`, `delay` after the current virtual time.
    ///
    /// Safe to call from inside a running task.
    pub fn schedule_on(
        &self,
        lane: Lane,
        delay: Duration,
        task: impl FnOnce() + Send + 'static,
    ) -> TimerHandle {
        let mut queue = self.queue();
        let seq = queue.next_seq;
        queue.next_seq += 1;

        let due = queue.now + delay;
        let done = Arc::new(AtomicBool::new(false));
        queue.entries.push(Entry {
            due,
            lane,
            seq,
            done: Arc::clone(&done),
            task: Box::new(task),
        });
        trace!(timer = seq, ?lane, ?due, "timer scheduled");

        TimerHandle { seq, done }
    }

    /// Number of timers that have neither fired nor been cancelled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue()
            .entries
            .iter()
            .filter(|e| !e.done.load(Ordering::Acquire))
            .count()
    }

    // The lock is released before the task runs so it can schedule more timers.
    fn fire_next(&self, limit: Option<Duration>) -> bool {
        let popped = self.queue().pop_due(limit);
        match popped {
            Some((seq, task)) => {
                trace!(timer = seq, "timer fired");
                task();
                true
            }
            None => false,
        }
    }

    /// Fires every pending timer in order, jumping the virtual clock from one
    /// deadline to the next. Returns the number of timers fired.
    pub fn run_until_idle(&self) -> usize {
        let mut fired = 0;
        while self.fire_next(None) {
            fired += 1;
        }
        debug!(fired, now = ?self.now(), "scheduler idle");
        fired
    }

    /// Moves the virtual clock forward by `by`, firing every timer that falls due
    /// on the way, including timers scheduled by those timers. Returns the number
    /// of timers fired.
    pub fn advance_by(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let mut fired = 0;
        while self.fire_next(Some(target)) {
            fired += 1;
        }
        let mut queue = self.queue();
        queue.now = queue.now.max(target);
        fired
    }

    /// Drives the queue against the `Tokio` clock until no timers are left: each
    /// timer fires once its virtual deadline has elapsed in real time. Returns
    /// the number of timers fired.
    ///
    /// Must not run concurrently with another driver of the same scheduler.
    pub async fn run_realtime(&self) -> usize {
        let origin = Instant::now() - self.now();
        let mut fired = 0;

        loop {
            let next_due = self.queue().next_due();
            let Some(due) = next_due else {
                break;
            };
            sleep_until(origin + due).await;
            while self.fire_next(Some(due)) {
                fired += 1;
            }
        }
        debug!(fired, now = ?self.now(), "scheduler idle");
        fired
    }
}
