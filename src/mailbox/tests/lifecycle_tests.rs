//! Sender registration and wake-primitive lifetime.

use super::super::*;
use super::{counting_message, host};
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

#[test]
fn test_wake_primitive_opens_lazily_and_closes_on_host() {
    let (events, context) = host();
    assert!(!context.is_open());
    assert_eq!(events.active_handles(), 0);

    let (first, _) = counting_message(&context);
    assert!(context.is_open());
    assert_eq!(events.active_handles(), 1);

    let (second, _) = counting_message(&context);
    assert_eq!(events.active_handles(), 1);
    assert_eq!(context.sender_count(), 2);

    first.unregister();
    assert!(context.is_open());

    second.unregister();
    assert!(!context.is_open());
    // Teardown is posted to the host loop.
    assert_eq!(events.active_handles(), 1);
    events.run_pending();
    assert_eq!(events.active_handles(), 0);

    let (_third, _) = counting_message(&context);
    assert_eq!(events.active_handles(), 1);
}

#[test]
fn test_register_twice_counts_once() {
    let (_events, context) = host();
    let (message, _) = counting_message(&context);

    message.register().unwrap();
    assert_eq!(context.sender_count(), 1);

    message.unregister();
    message.unregister();
    assert_eq!(context.sender_count(), 0);
}

#[test]
fn test_unregister_cancels_queued_delivery() {
    let (events, context) = host();
    let (message, calls) = counting_message(&context);

    message.send().unwrap();
    assert_eq!(context.pending_count(), 1);

    message.unregister();
    assert_eq!(context.pending_count(), 0);
    assert!(!message.is_pending());

    events.run_pending();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_unregister_releases_blocked_waiter() {
    let (_events, context) = host();
    let (message, _) = counting_message(&context);

    let worker = {
        let message = message.clone();
        thread::spawn(move || {
            message.send().unwrap();
            message.wait();
        })
    };

    while context.pending_count() == 0 {
        thread::sleep(Duration::from_millis(1));
    }
    message.unregister();

    worker.join().unwrap();
}

#[test]
fn test_dropping_registered_message_releases_sender() {
    let (events, context) = host();
    let (message, _) = counting_message(&context);
    assert_eq!(context.sender_count(), 1);

    drop(message);
    assert_eq!(context.sender_count(), 0);
    assert!(!context.is_open());

    events.run_pending();
    assert_eq!(events.active_handles(), 0);
}

#[test]
fn test_contexts_share_one_loop() {
    let events = EventLoop::new();
    let left = MailboxContext::new(events.wake_source());
    let right = MailboxContext::new(events.wake_source());

    let (a, a_calls) = counting_message(&left);
    let (b, b_calls) = counting_message(&right);
    assert_eq!(events.active_handles(), 2);

    a.send().unwrap();
    b.send().unwrap();
    events.run_pending();

    assert_eq!(a_calls.load(Ordering::SeqCst), 1);
    assert_eq!(b_calls.load(Ordering::SeqCst), 1);
}
