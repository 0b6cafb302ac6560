//! A reusable signal slot bound to one [`MailboxContext`].

use super::context::MailboxContext;
use super::error::{MailboxError, MailboxResult};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Callback invoked on the host thread when a [`Message`] is delivered.
pub trait MessageHandler: Send {
    /// Handle one delivery.
    fn handle_message(&mut self);
}

impl<F> MessageHandler for F
where
    F: FnMut() + Send,
{
    fn handle_message(&mut self) {
        self()
    }
}

/// A message that worker threads send to the host loop.
///
/// A message is queued at most once at a time: sending a message that is
/// already pending only makes sure a drain is scheduled. The handler runs on
/// the host thread, after which the message may be sent again.
///
/// # Example
///
/// ```rust,ignore
/// let events = EventLoop::new();
/// let context = MailboxContext::new(events.wake_source());
/// let message = Message::new(&context, || println!("delivered"));
/// message.register()?;
///
/// message.send()?;
/// events.run_pending();
/// ```
pub struct Message {
    context: Arc<MailboxContext>,
    handler: Mutex<Box<dyn MessageHandler>>,
    pending: AtomicBool,
    registered: AtomicBool,
}

impl Message {
    /// Create an unregistered message that runs `handler` on delivery.
    pub fn new<H>(context: &Arc<MailboxContext>, handler: H) -> Arc<Self>
    where
        H: MessageHandler + 'static,
    {
        Arc::new(Self {
            context: Arc::clone(context),
            handler: Mutex::new(Box::new(handler)),
            pending: AtomicBool::new(false),
            registered: AtomicBool::new(false),
        })
    }

    /// The context this message is delivered through.
    pub fn context(&self) -> &Arc<MailboxContext> {
        &self.context
    }

    /// Attach this message as a sender. Registering twice is a no-op.
    pub fn register(&self) -> MailboxResult<()> {
        if self
            .registered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        if let Err(err) = self.context.register() {
            self.registered.store(false, Ordering::Release);
            return Err(err);
        }
        Ok(())
    }

    /// Detach this message. A still-queued delivery is cancelled and its
    /// waiters are released.
    pub fn unregister(&self) {
        if self.registered.swap(false, Ordering::AcqRel) {
            self.context.unregister(self);
        }
    }

    /// Whether the message is attached to its context.
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    /// Queue this message for delivery on the host thread.
    pub fn send(self: &Arc<Self>) -> MailboxResult<()> {
        if !self.is_registered() {
            return Err(MailboxError::NotRegistered);
        }
        self.context.send(self)
    }

    /// Whether the message is queued and not yet delivered.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Block until the message has been delivered.
    pub fn wait(&self) {
        self.context.wait(self);
    }

    /// Block until the message has been delivered or `interrupted` returns `true`.
    ///
    /// Returns `true` if the message was delivered.
    pub fn wait_while<F>(&self, interrupted: F) -> bool
    where
        F: Fn() -> bool,
    {
        self.context.wait_while(self, interrupted)
    }

    pub(crate) fn mark_pending(&self) -> bool {
        !self.pending.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn clear_pending(&self) {
        self.pending.store(false, Ordering::Release);
    }

    pub(crate) fn deliver(&self) {
        self.handler.lock().handle_message();
        self.clear_pending();
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("pending", &self.is_pending())
            .field("registered", &self.is_registered())
            .finish()
    }
}

impl Drop for Message {
    fn drop(&mut self) {
        // A queued message is owned by the pending list, so only the sender
        // count can still be outstanding here.
        if *self.registered.get_mut() {
            self.context.release();
        }
    }
}
