//! Host-loop wake primitives and a reference single-threaded event loop.
//!
//! A [`MailboxContext`] never runs handlers itself. It asks a [`Waker`] to
//! schedule a drain, and the host loop owning that waker calls
//! [`MailboxContext::drain`] on its own thread. [`EventLoop`] is a minimal
//! loop built on `crossbeam` channels that hosts can drive directly or use as a
//! model for integrating with their own reactor.

use super::context::MailboxContext;
use super::error::{MailboxError, MailboxResult};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{
    Arc, Weak,
    atomic::{AtomicU64, AtomicUsize, Ordering},
};
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// Creates the wake primitive a [`MailboxContext`] uses to schedule drains.
///
/// Called lazily when the first sender registers with the context.
pub trait WakeSource: Send + Sync {
    /// Open a wake primitive that drains `context` on the host thread.
    fn open(&self, context: Weak<MailboxContext>) -> MailboxResult<Box<dyn Waker>>;
}

/// A handle that schedules drains on the host loop.
pub trait Waker: Send + Sync {
    /// Request one drain. Callable from any thread.
    fn wake(&self) -> MailboxResult<()>;

    /// Release the primitive. Teardown completes asynchronously on the host thread.
    fn close(self: Box<Self>);
}

enum Task {
    Drain(Weak<MailboxContext>),
    Close(u64),
}

/// A single-threaded host loop that executes mailbox drains.
///
/// The thread that calls [`run_once`](Self::run_once) and friends is the host
/// thread: every message handler of every context bound to this loop runs there.
pub struct EventLoop {
    receiver: Receiver<Task>,
    source: Arc<LoopWakeSource>,
}

impl EventLoop {
    /// Create a new, idle loop.
    pub fn new() -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            receiver,
            source: Arc::new(LoopWakeSource {
                sender,
                open_handles: Arc::new(AtomicUsize::new(0)),
                next_handle: AtomicU64::new(1),
            }),
        }
    }

    /// The wake source to hand to [`MailboxContext::new`].
    pub fn wake_source(&self) -> Arc<dyn WakeSource> {
        self.source.clone()
    }

    /// Number of wake primitives opened on this loop and not yet torn down.
    pub fn active_handles(&self) -> usize {
        self.source.open_handles.load(Ordering::Acquire)
    }

    /// Run at most one task, blocking up to `timeout` for one to arrive.
    ///
    /// Returns `true` if a task ran.
    pub fn run_once(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(task) => {
                self.dispatch(task);
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Run every task that is already queued without blocking.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            self.dispatch(task);
            ran += 1;
        }
        ran
    }

    /// Run tasks until `done` returns `true` or `timeout` elapses.
    ///
    /// Returns the final value of `done`.
    pub fn run_until<F>(&self, timeout: Duration, mut done: F) -> bool
    where
        F: FnMut() -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if done() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return done();
            }
            self.run_once((deadline - now).min(Duration::from_millis(20)));
        }
    }

    fn dispatch(&self, task: Task) {
        match task {
            Task::Drain(context) => {
                if let Some(context) = context.upgrade() {
                    context.drain();
                }
            }
            Task::Close(id) => {
                self.source.open_handles.fetch_sub(1, Ordering::AcqRel);
                trace!(handle = id, "wake handle closed");
            }
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

struct LoopWakeSource {
    sender: Sender<Task>,
    open_handles: Arc<AtomicUsize>,
    next_handle: AtomicU64,
}

impl WakeSource for LoopWakeSource {
    fn open(&self, context: Weak<MailboxContext>) -> MailboxResult<Box<dyn Waker>> {
        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.open_handles.fetch_add(1, Ordering::AcqRel);
        trace!(handle = id, "wake handle opened");
        Ok(Box::new(LoopWaker {
            id,
            sender: self.sender.clone(),
            context,
        }))
    }
}

struct LoopWaker {
    id: u64,
    sender: Sender<Task>,
    context: Weak<MailboxContext>,
}

impl Waker for LoopWaker {
    fn wake(&self) -> MailboxResult<()> {
        self.sender
            .send(Task::Drain(self.context.clone()))
            .map_err(|_| MailboxError::HostClosed)
    }

    fn close(self: Box<Self>) {
        if self.sender.send(Task::Close(self.id)).is_err() {
            warn!(handle = self.id, "host loop gone before wake handle teardown");
        }
    }
}
