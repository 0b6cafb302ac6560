//! Signals a worker delivers to the host thread.

use super::error::PlayerError;
use super::shared::Shared;
use crossbeam::channel::Sender;
use std::sync::Arc;
use tracing::trace;

/// One encoded packet handed to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundPacket {
    /// Payload bytes: the sealed frame when secure framing is on, else the codec packet.
    pub data: Vec<u8>,
    /// Duration in output time-base units.
    pub duration: i64,
    /// Whether `data` is a sealed frame.
    pub sealed: bool,
}

impl OutboundPacket {
    /// Payload length in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// A lifecycle event or packet from a worker.
#[derive(Debug, Clone)]
pub enum Signal {
    /// The source is open and packets are about to flow.
    Ready,
    /// A seek was applied.
    Seeked,
    /// One output packet.
    Packet(OutboundPacket),
    /// End of stream.
    Finish,
    /// The run failed. Sent at most once per run.
    Error(PlayerError),
}

/// Host-side receiver of player signals.
///
/// Every method runs on the host thread. The worker that produced a signal
/// stays blocked until the method returns.
pub trait PlayerEvents: Send {
    /// The source opened.
    fn on_ready(&mut self) {}

    /// A seek completed.
    fn on_seeked(&mut self) {}

    /// A packet is ready.
    fn on_packet(&mut self, _packet: OutboundPacket) {}

    /// The stream ended.
    fn on_finish(&mut self) {}

    /// The run failed. `error.code()` and `error.is_retryable()` carry the details.
    fn on_error(&mut self, _error: PlayerError) {}
}

/// Forward every signal into a channel.
impl PlayerEvents for Sender<Signal> {
    fn on_ready(&mut self) {
        let _ = self.send(Signal::Ready);
    }

    fn on_seeked(&mut self) {
        let _ = self.send(Signal::Seeked);
    }

    fn on_packet(&mut self, packet: OutboundPacket) {
        let _ = self.send(Signal::Packet(packet));
    }

    fn on_finish(&mut self) {
        let _ = self.send(Signal::Finish);
    }

    fn on_error(&mut self, error: PlayerError) {
        let _ = self.send(Signal::Error(error));
    }
}

/// Mailbox handler that hands the worker's signal slot to the host's events.
pub(crate) struct Dispatcher {
    shared: Arc<Shared>,
    events: Box<dyn PlayerEvents>,
}

impl Dispatcher {
    pub(crate) fn new(shared: Arc<Shared>, events: Box<dyn PlayerEvents>) -> Self {
        Self { shared, events }
    }

    pub(crate) fn dispatch(&mut self) {
        let Some(signal) = self.shared.take_signal() else {
            return;
        };
        if self.shared.is_destroyed() {
            trace!("dropping signal queued before destroy");
            return;
        }

        match signal {
            Signal::Ready => self.events.on_ready(),
            Signal::Seeked => self.events.on_seeked(),
            Signal::Packet(packet) => self.events.on_packet(packet),
            Signal::Finish => self.events.on_finish(),
            Signal::Error(error) => self.events.on_error(error),
        }
    }
}
