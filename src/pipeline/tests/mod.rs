//! End-to-end tests for players driven by the scripted backend.
//!
//! Each test owns an [`EventLoop`] acting as the host thread and records every
//! signal its players deliver.

use super::*;
use crate::codec::testing::{ScriptedBackend, ScriptedSource};
use crate::mailbox::EventLoop;
use crossbeam::channel::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;

mod secure_tests;

/// Upper bound for any single wait in these tests.
pub(crate) const TIMEOUT: Duration = Duration::from_secs(10);

/// A host loop with its context and scripted backend.
pub(crate) struct Harness {
    pub events: EventLoop,
    pub host: HostContext,
    pub backend: Arc<ScriptedBackend>,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::with_config(PlayerConfig::default())
    }

    pub(crate) fn with_config(config: PlayerConfig) -> Self {
        let events = EventLoop::new();
        let backend = Arc::new(ScriptedBackend::new());
        let host = HostContext::with_config(events.wake_source(), backend.clone(), config);
        Self {
            events,
            host,
            backend,
        }
    }

    /// Register `source` under `url` and create a player opened on it.
    pub(crate) fn player(&self, url: &str, source: ScriptedSource) -> (Player, Recorder) {
        self.backend.insert(url, source);
        let (sender, receiver) = channel::unbounded();
        let player = self.host.player(sender);
        player.open(url, true);
        (
            player,
            Recorder {
                receiver,
                seen: Vec::new(),
            },
        )
    }

    /// Run the host loop until `done` holds, collecting signals on the way.
    pub(crate) fn run_while<F>(&self, recorder: &mut Recorder, mut done: F) -> bool
    where
        F: FnMut(&Recorder) -> bool,
    {
        self.events.run_until(TIMEOUT, || {
            recorder.poll();
            done(recorder)
        })
    }

    /// Run the host loop for `duration`, collecting signals.
    pub(crate) fn settle(&self, recorder: &mut Recorder, duration: Duration) {
        self.events.run_until(duration, || {
            recorder.poll();
            false
        });
    }
}

/// Signals delivered to one player's events.
pub(crate) struct Recorder {
    receiver: Receiver<Signal>,
    pub seen: Vec<Signal>,
}

impl Recorder {
    /// Move newly delivered signals into `seen`.
    pub(crate) fn poll(&mut self) -> usize {
        let before = self.seen.len();
        self.seen.extend(self.receiver.try_iter());
        self.seen.len() - before
    }

    pub(crate) fn packets(&self) -> Vec<&OutboundPacket> {
        self.seen
            .iter()
            .filter_map(|signal| match signal {
                Signal::Packet(packet) => Some(packet),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn errors(&self) -> Vec<&PlayerError> {
        self.seen
            .iter()
            .filter_map(|signal| match signal {
                Signal::Error(error) => Some(error),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn count<F>(&self, matches: F) -> usize
    where
        F: Fn(&Signal) -> bool,
    {
        self.seen.iter().filter(|signal| matches(signal)).count()
    }

    pub(crate) fn finished(&self) -> bool {
        self.count(|signal| matches!(signal, Signal::Finish)) > 0
    }

    pub(crate) fn ready_count(&self) -> usize {
        self.count(|signal| matches!(signal, Signal::Ready))
    }
}
