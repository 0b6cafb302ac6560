//! Host-side handle of one relayed stream.

use super::config::{OutputFormat, PlayerConfig};
use super::error::{PlayerError, PlayerResult};
use super::events::{Dispatcher, PlayerEvents};
use super::session::clamp_seek;
use super::shared::{Shared, Stats};
use super::state::PlayerState;
use super::worker::Worker;
use crate::codec::{CodecId, MediaBackend, SourceLocator};
use crate::effects::{Effect, EffectKind};
use crate::framing::{FramerCounters, FramerResult, NonceMode, SecureFramer, UdpTransport};
use crate::mailbox::{MailboxContext, Message};
use crate::registry::StreamRegistry;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, info};

/// Relays one audio source as paced, optionally sealed packets.
///
/// Commands are applied by the player's worker thread at its next safe
/// point. Signals arrive through the [`PlayerEvents`] given at creation, on
/// whichever thread drains the player's [`MailboxContext`].
///
/// Dropping the player destroys it.
///
/// # Example
///
/// ```rust,ignore
/// let player = host.player(sender);
/// player.open("https://example.com/stream.ogg", false);
/// player.set_effect(Effect::Volume(0.5))?;
/// player.start()?;
///
/// events.run_until(Duration::from_secs(5), || player.state() == PlayerState::Finished);
/// ```
pub struct Player {
    shared: Arc<Shared>,
    message: Arc<Message>,
    backend: Arc<dyn MediaBackend>,
    registry: Arc<StreamRegistry>,
}

impl Player {
    /// Create an idle player whose signals are delivered to `events`.
    pub fn new<E>(
        mailbox: &Arc<MailboxContext>,
        registry: Arc<StreamRegistry>,
        backend: Arc<dyn MediaBackend>,
        config: PlayerConfig,
        events: E,
    ) -> Self
    where
        E: PlayerEvents + 'static,
    {
        let shared = Arc::new(Shared::new(config));
        let mut dispatcher = Dispatcher::new(shared.clone(), Box::new(events));
        let message = Message::new(mailbox, move || dispatcher.dispatch());

        Self {
            shared,
            message,
            backend,
            registry,
        }
    }

    /// Set the source for the next start.
    pub fn open(&self, url: impl Into<String>, is_file: bool) {
        let source = if is_file {
            SourceLocator::file(url)
        } else {
            SourceLocator::remote(url)
        };
        debug!(url = %source.url, is_file, "source set");
        self.shared.control().source = Some(source);
    }

    /// Codec of produced packets. Takes effect on the next start.
    pub fn set_output_codec(&self, codec: CodecId) {
        self.shared.control().output.codec = codec;
    }

    /// Channels, sample rate and bitrate of produced packets.
    ///
    /// Channels and rate take effect on the next start.
    pub fn set_output_format(&self, channels: u16, sample_rate: u32, bitrate: u32) {
        let mut control = self.shared.control();
        control.output = OutputFormat {
            channels,
            sample_rate,
            bitrate,
            ..control.output
        };
    }

    /// The output format used by the next start.
    pub fn output_format(&self) -> OutputFormat {
        self.shared.control().output
    }

    /// Request a new effect value. The running graph adopts it before the next frame.
    pub fn set_effect(&self, effect: Effect) -> PlayerResult<()> {
        self.shared.control().effects.set(effect)?;
        Ok(())
    }

    /// Return one effect to its identity value.
    pub fn clear_effect(&self, kind: EffectKind) {
        self.shared.control().effects.clear(kind);
    }

    /// Seek to `seconds`, clamped to `[0, duration]` once the duration is known.
    pub fn seek(&self, seconds: f64) {
        let target = clamp_seek(seconds, self.duration());
        self.shared.control().seek = Some(target);
        self.shared.notify();
    }

    /// Suspend or resume packet production.
    pub fn set_paused(&self, paused: bool) {
        self.shared.control().paused = paused;
        self.shared.notify();
    }

    /// Change the encoder bitrate. Applied before the encoder's next frame.
    pub fn set_bitrate(&self, bitrate: u32) {
        let mut control = self.shared.control();
        control.output.bitrate = bitrate;
        control.bitrate_dirty = true;
    }

    /// Start the worker, or restart the source once the current run ends.
    pub fn start(&self) -> PlayerResult<()> {
        if self.shared.is_destroyed() {
            return Err(PlayerError::Destroyed);
        }

        let mut control = self.shared.control();
        if control.source.is_none() {
            return Err(PlayerError::NoSource);
        }
        if control.running {
            control.start = true;
            drop(control);
            self.shared.notify();
            return Ok(());
        }

        // A stop issued before the first start must not park the new worker.
        control.stop = false;
        control.start = false;
        self.message.register()?;
        let worker = Worker {
            shared: self.shared.clone(),
            message: self.message.clone(),
            backend: self.backend.clone(),
            registry: self.registry.clone(),
        };
        match self.registry.spawn("audio-relay-stream", move |id| worker.main(id)) {
            Ok(id) => {
                control.running = true;
                info!(worker = %id, "player started");
                Ok(())
            }
            Err(err) => {
                drop(control);
                self.message.unregister();
                Err(PlayerError::spawn(err))
            }
        }
    }

    /// End the current run. The worker waits for the next start.
    pub fn stop(&self) {
        self.shared.control().stop = true;
        self.shared.notify();
    }

    /// Tear the player down. No signal is delivered afterwards.
    ///
    /// A worker blocked on the host is released and exits on its own; join it
    /// through [`StreamRegistry::wait_all`].
    pub fn destroy(&self) {
        if self.shared.is_destroyed() {
            return;
        }
        self.shared.destroyed.trigger();
        self.shared.state.destroy();
        self.shared.notify();
        self.message.context().interrupt_waiters();

        if !self.shared.control().running {
            self.message.unregister();
        }
        debug!("player destroyed");
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PlayerState {
        self.shared.state.get()
    }

    /// Playback position in seconds. While a seek is pending, its target.
    pub fn time(&self) -> f64 {
        match self.shared.control().seek {
            Some(target) => target,
            None => self.shared.stats.time.load(),
        }
    }

    /// Source duration in seconds, zero if unknown.
    pub fn duration(&self) -> f64 {
        self.shared.stats.duration.load()
    }

    /// Sample time lost to falling behind real time, in output time-base units.
    pub fn dropped_samples(&self) -> u64 {
        Stats::get(&self.shared.stats.dropped_samples)
    }

    /// Output time-base units produced.
    pub fn total_samples(&self) -> u64 {
        Stats::get(&self.shared.stats.total_samples)
    }

    /// Packets produced.
    pub fn total_packets(&self) -> u64 {
        Stats::get(&self.shared.stats.total_packets)
    }

    /// Packets that could not be sealed.
    pub fn skipped_frames(&self) -> u64 {
        Stats::get(&self.shared.stats.skipped_frames)
    }

    /// Sealed frames the datagram socket refused.
    pub fn failed_transmits(&self) -> u64 {
        Stats::get(&self.shared.stats.failed_transmits)
    }

    /// Whether source packets are forwarded without transcoding.
    pub fn is_passthrough(&self) -> bool {
        self.shared.stats.passthrough.load(Ordering::Relaxed)
    }

    /// Seal every packet from now on, resetting all counters.
    pub fn set_secret_box(&self, key: &[u8], mode: NonceMode, ssrc: u32) -> FramerResult<()> {
        let mut secure = self.shared.secure.lock();
        match secure.framer.as_mut() {
            Some(framer) => framer.configure(key, mode, ssrc)?,
            None => {
                let capacity = self.shared.config.framer_capacity;
                secure.framer = Some(SecureFramer::with_capacity(key, mode, ssrc, capacity)?);
            }
        }
        debug!(?mode, ssrc, "secure framing configured");
        Ok(())
    }

    /// Overwrite the sequence, timestamp and nonce counters.
    ///
    /// Does nothing until [`set_secret_box`](Self::set_secret_box) was called.
    pub fn update_secret_box(&self, counters: FramerCounters) {
        if let Some(framer) = self.shared.secure.lock().framer.as_mut() {
            framer.update(counters);
        }
    }

    /// Current framing counters, if secure framing is configured.
    pub fn secret_box(&self) -> Option<FramerCounters> {
        self.shared
            .secure
            .lock()
            .framer
            .as_ref()
            .map(SecureFramer::counters)
    }

    /// Also send every packet as a datagram to `ip:port`.
    pub fn connect(&self, ip: &str, port: u16) -> FramerResult<()> {
        let transport = UdpTransport::connect(ip, port)?;
        self.shared.secure.lock().transport = Some(transport);
        Ok(())
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("state", &self.state())
            .field("time", &self.time())
            .field("duration", &self.duration())
            .finish()
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.destroy();
    }
}
