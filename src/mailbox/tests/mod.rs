//! Tests for the mailbox: delivery, waits and wake-primitive lifetime.

use super::{EventLoop, MailboxContext, Message};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

mod delivery_tests;
mod lifecycle_tests;

/// A registered message that counts its deliveries.
pub(crate) fn counting_message(context: &Arc<MailboxContext>) -> (Arc<Message>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let message = {
        let calls = calls.clone();
        Message::new(context, move || {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    };
    message.register().expect("register message");
    (message, calls)
}

/// A fresh loop and a context bound to it.
pub(crate) fn host() -> (EventLoop, Arc<MailboxContext>) {
    let events = EventLoop::new();
    let context = MailboxContext::new(events.wake_source());
    (events, context)
}
