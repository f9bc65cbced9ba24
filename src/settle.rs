//! # Calling Conventions
//!
//! Every overlay operation has one synchronous core. The two asynchronous
//! shapes are thin adapters over it:
//!
//! | Shape | Delivery |
//! |-------|----------|
//! | `op(..) -> Result<T, FsError>` | returned directly |
//! | `op_callback(.., cb)` | `cb(result)` queued on a [`TickQueue`], runs on the next [`TickQueue::run_pending`] |
//! | `op_async(..) -> Settle<T>` | future that returns `Pending` once, then settles |
//!
//! In both asynchronous shapes the result is delivered on a later turn even
//! when it is already known, and exactly once.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use parking_lot::Mutex;

use crate::FsError;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Queue of work deferred to the next scheduling turn.
///
/// The owner decides when a turn happens by calling
/// [`run_pending`](Self::run_pending).
#[derive(Default)]
pub struct TickQueue {
    tasks: Mutex<VecDeque<Task>>,
}

impl TickQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` for the next turn.
    pub fn defer(&self, task: impl FnOnce() + Send + 'static) {
        self.tasks.lock().push_back(Box::new(task));
    }

    /// Run queued tasks in order until the queue is empty.
    ///
    /// Tasks queued while running are run in the same call. Returns the
    /// number of tasks run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.tasks.lock().pop_front();
            let Some(task) = next else {
                return ran;
            };
            task();
            ran += 1;
        }
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

impl fmt::Debug for TickQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickQueue").field("pending", &self.len()).finish()
    }
}

type Work<T> = Box<dyn FnOnce() -> Result<T, FsError> + Send + 'static>;

/// Future returned by the `*_async` operations.
///
/// Holds either a finished result or the deferred part of the work (the
/// packed byte read). The first poll only schedules a wake-up; the second
/// runs the work and settles.
#[must_use = "futures do nothing unless polled"]
pub struct Settle<T> {
    work: Option<Work<T>>,
    yielded: bool,
}

impl<T: Send + 'static> Settle<T> {
    /// Settle with an already known result.
    pub fn ready(result: Result<T, FsError>) -> Self {
        Self::deferred(move || result)
    }

    /// Settle with the result of `work`, run when the future completes.
    pub fn deferred(work: impl FnOnce() -> Result<T, FsError> + Send + 'static) -> Self {
        Self {
            work: Some(Box::new(work)),
            yielded: false,
        }
    }
}

impl<T> Future for Settle<T> {
    type Output = Result<T, FsError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if !this.yielded {
            this.yielded = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        match this.work.take() {
            Some(work) => Poll::Ready(work()),
            None => panic!("`Settle` polled after completion"),
        }
    }
}

impl<T> fmt::Debug for Settle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settle")
            .field("settled", &self.work.is_none())
            .field("yielded", &self.yielded)
            .finish()
    }
}
