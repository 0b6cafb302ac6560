//! The shared mailbox context: pending list, drain scheduling and delivery waits.

use super::error::{MailboxError, MailboxResult};
use super::host::{WakeSource, Waker};
use super::message::Message;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Configuration for a [`MailboxContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxConfig {
    /// Messages delivered per batch before blocked senders are woken.
    pub batch_size: usize,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self { batch_size: 10_000 }
    }
}

struct Queue {
    /// Insertion order; drained from the back.
    pending: Vec<Arc<Message>>,
    /// A drain has been requested and not yet started.
    draining: bool,
    waker: Option<Box<dyn Waker>>,
    senders: usize,
}

/// Multi-producer, single-consumer bridge from worker threads to one host loop.
///
/// Workers [`send`](Message::send) messages from any thread; the host loop
/// calls [`drain`](Self::drain) on its own thread, which runs every pending
/// handler there. One context may serve any number of streams; the wake
/// primitive lives only while at least one [`Message`] is registered.
pub struct MailboxContext {
    source: Arc<dyn WakeSource>,
    queue: Mutex<Queue>,
    wait_lock: Mutex<()>,
    delivered: Condvar,
    config: MailboxConfig,
    this: Weak<MailboxContext>,
}

impl MailboxContext {
    /// Create a context that schedules drains through `source`.
    pub fn new(source: Arc<dyn WakeSource>) -> Arc<Self> {
        Self::with_config(source, MailboxConfig::default())
    }

    /// Create a context with an explicit configuration.
    pub fn with_config(source: Arc<dyn WakeSource>, config: MailboxConfig) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            source,
            queue: Mutex::new(Queue {
                pending: Vec::new(),
                draining: false,
                waker: None,
                senders: 0,
            }),
            wait_lock: Mutex::new(()),
            delivered: Condvar::new(),
            config: MailboxConfig {
                batch_size: config.batch_size.max(1),
            },
            this: this.clone(),
        })
    }

    /// Number of registered senders.
    pub fn sender_count(&self) -> usize {
        self.queue.lock().senders
    }

    /// Number of messages waiting for the next drain.
    pub fn pending_count(&self) -> usize {
        self.queue.lock().pending.len()
    }

    /// Whether the wake primitive is currently open.
    pub fn is_open(&self) -> bool {
        self.queue.lock().waker.is_some()
    }

    pub(crate) fn register(&self) -> MailboxResult<()> {
        let mut queue = self.queue.lock();
        let senders = queue
            .senders
            .checked_add(1)
            .ok_or(MailboxError::TooManySenders(queue.senders))?;

        if queue.waker.is_none() {
            queue.waker = Some(self.source.open(self.this.clone())?);
            debug!("mailbox wake primitive opened");
        }
        queue.senders = senders;
        Ok(())
    }

    pub(crate) fn unregister(&self, message: &Message) {
        let waker = {
            let mut queue = self.queue.lock();
            if message.is_pending() {
                queue
                    .pending
                    .retain(|queued| !std::ptr::eq(Arc::as_ptr(queued), message));
                message.clear_pending();
            }
            queue.senders = queue.senders.saturating_sub(1);
            if queue.senders == 0 {
                queue.draining = false;
                queue.waker.take()
            } else {
                None
            }
        };

        self.interrupt_waiters();

        if let Some(waker) = waker {
            debug!("last sender gone, closing mailbox wake primitive");
            waker.close();
        }
    }

    pub(crate) fn release(&self) {
        let waker = {
            let mut queue = self.queue.lock();
            queue.senders = queue.senders.saturating_sub(1);
            if queue.senders == 0 {
                queue.draining = false;
                queue.waker.take()
            } else {
                None
            }
        };
        if let Some(waker) = waker {
            waker.close();
        }
    }

    pub(crate) fn send(&self, message: &Arc<Message>) -> MailboxResult<()> {
        let mut queue = self.queue.lock();
        if queue.waker.is_none() {
            return Err(MailboxError::NotRegistered);
        }

        let enqueued = message.mark_pending();
        if enqueued {
            queue.pending.push(Arc::clone(message));
        }

        if !queue.draining {
            let woken = match queue.waker.as_ref() {
                Some(waker) => waker.wake(),
                None => Err(MailboxError::NotRegistered),
            };
            if let Err(err) = woken {
                if enqueued {
                    queue.pending.pop();
                    message.clear_pending();
                }
                return Err(err);
            }
            queue.draining = true;
        }
        Ok(())
    }

    /// Deliver every pending message. Must be called on the host thread.
    ///
    /// The pending list is detached in one step; messages sent while the
    /// drain runs are left for the next drain. Returns the number of handlers
    /// invoked.
    pub fn drain(&self) -> usize {
        let mut batch = {
            let mut queue = self.queue.lock();
            queue.draining = false;
            std::mem::take(&mut queue.pending)
        };

        let mut delivered = 0;
        while !batch.is_empty() {
            let start = batch.len().saturating_sub(self.config.batch_size);
            for message in batch.drain(start..).rev() {
                message.deliver();
                delivered += 1;
            }
            self.interrupt_waiters();
        }

        trace!(delivered, "mailbox drained");
        delivered
    }

    /// Block until `message` has been delivered.
    pub fn wait(&self, message: &Message) {
        self.wait_while(message, || false);
    }

    /// Block until `message` has been delivered or `interrupted` returns `true`.
    ///
    /// `interrupted` is re-checked whenever [`interrupt_waiters`](Self::interrupt_waiters)
    /// runs. Returns `true` if the message was delivered.
    pub fn wait_while<F>(&self, message: &Message, interrupted: F) -> bool
    where
        F: Fn() -> bool,
    {
        let mut guard = self.wait_lock.lock();
        while message.is_pending() {
            if interrupted() {
                return false;
            }
            self.delivered.wait(&mut guard);
        }
        true
    }

    /// Wake every thread blocked in [`wait`](Self::wait) so it re-checks its condition.
    pub fn interrupt_waiters(&self) {
        let _guard = self.wait_lock.lock();
        self.delivered.notify_all();
    }
}
