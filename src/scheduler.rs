//! Deferred, cancellable tasks
//!
//! A scheduled task never runs code itself: when its delay elapses the
//! scheduler reports the task id back to the owner's event loop, which then
//! decides what to do. Cancelling a handle before it fires guarantees the id
//! is never reported.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: TaskId,
    token: CancellationToken,
}

impl TaskHandle {
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the task is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

pub trait Scheduler {
    fn schedule(&mut self, delay: Duration) -> TaskHandle;
}

/// Virtual-clock scheduler; nothing fires until `advance` is called.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: Duration,
    next_id: u64,
    queue: Vec<(Duration, TaskHandle)>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward and return the ids that fired, oldest deadline first.
    pub fn advance(&mut self, by: Duration) -> Vec<TaskId> {
        self.now += by;
        let now = self.now;
        let (due, rest): (Vec<_>, Vec<_>) = self.queue.drain(..).partition(|(at, _)| *at <= now);
        self.queue = rest;
        let mut due: Vec<_> = due
            .into_iter()
            .filter(|(_, handle)| !handle.is_cancelled())
            .collect();
        due.sort_by_key(|(at, handle)| (*at, handle.id()));
        due.into_iter().map(|(_, handle)| handle.id()).collect()
    }

    /// Live (not cancelled) tasks still waiting.
    pub fn pending(&self) -> usize {
        self.queue.iter().filter(|(_, h)| !h.is_cancelled()).count()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration) -> TaskHandle {
        self.next_id += 1;
        let handle = TaskHandle::new(TaskId(self.next_id));
        self.queue.push((self.now + delay, handle.clone()));
        handle
    }
}

/// Timer-backed scheduler; fired ids arrive on the paired receiver.
#[derive(Debug)]
pub struct TokioScheduler {
    next_id: u64,
    tx: mpsc::UnboundedSender<TaskId>,
}

impl TokioScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TaskId>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { next_id: 0, tx }, rx)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration) -> TaskHandle {
        self.next_id += 1;
        let handle = TaskHandle::new(TaskId(self.next_id));
        let task = handle.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = task.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    // Always yields at least once, so a zero delay still runs later
                    tokio::task::yield_now().await;
                    if !task.is_cancelled() {
                        let _ = tx.send(task.id());
                    }
                }
            }
        });
        handle
    }
}
