//! Delivery ordering, coalescing and blocking waits.

use super::super::*;
use super::{counting_message, host};
use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::thread;
use std::time::Duration;

#[test]
fn test_messages_from_many_threads_delivered_once_on_host() {
    const THREADS: usize = 4;
    const ROUNDS: usize = 50;

    let (events, context) = host();
    let host_thread = thread::current().id();
    let off_host = Arc::new(AtomicBool::new(false));

    let mut counters = Vec::new();
    let mut workers = Vec::new();
    for _ in 0..THREADS {
        let calls = Arc::new(AtomicUsize::new(0));
        let message = {
            let calls = calls.clone();
            let off_host = off_host.clone();
            Message::new(&context, move || {
                if thread::current().id() != host_thread {
                    off_host.store(true, Ordering::SeqCst);
                }
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };
        message.register().unwrap();
        counters.push(calls);

        workers.push(thread::spawn(move || {
            for _ in 0..ROUNDS {
                message.send().unwrap();
                message.wait();
            }
            message.unregister();
        }));
    }

    let finished = events.run_until(Duration::from_secs(20), || {
        workers.iter().all(|worker| worker.is_finished())
    });
    assert!(finished, "workers did not finish");
    for worker in workers {
        worker.join().unwrap();
    }

    for calls in &counters {
        assert_eq!(calls.load(Ordering::SeqCst), ROUNDS);
    }
    assert!(!off_host.load(Ordering::SeqCst));
}

#[test]
fn test_pending_message_is_queued_once() {
    let (events, context) = host();
    let (message, calls) = counting_message(&context);

    message.send().unwrap();
    message.send().unwrap();
    message.send().unwrap();

    assert!(message.is_pending());
    assert_eq!(context.pending_count(), 1);

    // Only the first send requested a drain.
    assert_eq!(events.run_pending(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!message.is_pending());
}

#[test]
fn test_drain_runs_in_reverse_insertion_order() {
    let (events, context) = host();
    let order = Arc::new(Mutex::new(Vec::new()));

    let messages: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|name| {
            let order = order.clone();
            let message = Message::new(&context, move || order.lock().push(name));
            message.register().unwrap();
            message
        })
        .collect();

    for message in &messages {
        message.send().unwrap();
    }
    events.run_pending();

    assert_eq!(*order.lock(), vec!["c", "b", "a"]);
}

#[test]
fn test_drain_in_small_batches_delivers_everything() {
    let events = EventLoop::new();
    let context = MailboxContext::with_config(events.wake_source(), MailboxConfig { batch_size: 2 });

    let tracked: Vec<_> = (0..5).map(|_| counting_message(&context)).collect();
    for (message, _) in &tracked {
        message.send().unwrap();
    }

    assert_eq!(context.drain(), 5);
    for (message, calls) in &tracked {
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!message.is_pending());
    }

    // The scheduled drain finds nothing left.
    events.run_pending();
    for (_, calls) in &tracked {
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn test_message_can_be_resent_after_delivery() {
    let (events, context) = host();
    let (message, calls) = counting_message(&context);

    message.send().unwrap();
    events.run_pending();
    message.send().unwrap();
    events.run_pending();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_interrupted_wait_returns_without_delivery() {
    let (_events, context) = host();
    let (message, calls) = counting_message(&context);
    let stop = Arc::new(AtomicBool::new(false));

    let worker = {
        let message = message.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            message.send().unwrap();
            message.wait_while(|| stop.load(Ordering::SeqCst))
        })
    };

    while context.pending_count() == 0 {
        thread::sleep(Duration::from_millis(1));
    }
    stop.store(true, Ordering::SeqCst);
    context.interrupt_waiters();

    assert!(!worker.join().unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_send_without_registration_fails() {
    let (_events, context) = host();
    let message = Message::new(&context, || {});

    assert_eq!(message.send(), Err(MailboxError::NotRegistered));
    assert!(!message.is_pending());
}

#[test]
fn test_send_after_host_loop_gone_fails() {
    let (events, context) = host();
    let (message, _) = counting_message(&context);
    drop(events);

    assert_eq!(message.send(), Err(MailboxError::HostClosed));
    assert!(!message.is_pending());
    assert_eq!(context.pending_count(), 0);
}
