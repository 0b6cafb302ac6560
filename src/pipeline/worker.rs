//! The per-stream worker thread.

use super::error::{PlayerError, PlayerResult};
use super::events::{OutboundPacket, Signal};
use super::pacer::{Pace, Pacer};
use super::session::Session;
use super::shared::{Shared, Stats};
use super::state::PlayerState;
use crate::codec::{CodecError, MediaBackend, Packet, Rational};
use crate::mailbox::Message;
use crate::registry::{StreamRegistry, WorkerId};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, trace, warn};

pub(crate) struct Worker {
    pub shared: Arc<Shared>,
    pub message: Arc<Message>,
    pub backend: Arc<dyn MediaBackend>,
    pub registry: Arc<StreamRegistry>,
}

impl Worker {
    /// Thread body: run the source whenever started, until destroyed.
    pub(crate) fn main(self, id: WorkerId) {
        let span = info_span!("stream", id = id.get());
        let _entered = span.enter();
        info!("worker started");

        loop {
            {
                let mut control = self.shared.wait_while(|control| control.stop && !control.start);
                if self.shared.is_destroyed() {
                    break;
                }
                control.stop = false;
                control.start = false;
            }

            if let Err(err) = self.run() {
                self.report(err);
            }

            let mut control = self.shared.control();
            control.stop = !control.start;
            control.start = false;
            drop(control);
            self.shared.state.set(PlayerState::Idle);
        }

        self.message.unregister();
        self.shared.control().running = false;
        self.shared.state.destroy();
        info!("worker exited");
        self.registry.remove(id);
    }

    /// One pass over the source, from open until stop, restart, error or destroy.
    fn run(&self) -> PlayerResult<()> {
        let (source, output) = {
            let control = self.shared.control();
            (control.source.clone(), control.output)
        };
        let source = source.ok_or(PlayerError::NoSource)?;

        self.shared.state.set(PlayerState::Opening);
        let mut session = match Session::open(
            self.backend.clone(),
            self.shared.clone(),
            &source,
            output,
        ) {
            Ok(session) => session,
            Err(_) if self.shared.is_destroyed() => return Ok(()),
            Err(err) => return Err(err),
        };

        self.shared.state.set(PlayerState::Ready);
        if !self.emit(Signal::Ready) {
            return Ok(());
        }
        let mut pacer = Pacer::new(Instant::now());
        self.shared.state.set(PlayerState::Running);

        loop {
            let (seek, paused) = {
                let mut control = self.shared.control();
                if control.stop || self.shared.is_destroyed() {
                    return Ok(());
                }
                (control.seek.take(), control.paused)
            };

            if let Some(target) = seek {
                self.shared.state.set(PlayerState::Seeking);
                session.seek(target)?;
                self.shared.state.set(PlayerState::Running);
                if !self.emit(Signal::Seeked) {
                    return Ok(());
                }
                continue;
            }

            if paused {
                self.shared.state.set(PlayerState::Paused);
                drop(self.shared.wait_while(|control| {
                    control.paused && control.seek.is_none() && !control.stop
                }));
                pacer.reset(Instant::now());
                self.shared.state.set(PlayerState::Running);
                continue;
            }

            match session.next_packet() {
                Ok((packet, time_base)) => {
                    if !self.deliver(&mut pacer, packet, time_base) {
                        return Ok(());
                    }
                }
                Err(CodecError::Eof) => {
                    self.shared.state.set(PlayerState::Finished);
                    info!("end of stream");
                    if !self.emit(Signal::Finish) {
                        return Ok(());
                    }

                    let control = self.shared.wait_while(|control| {
                        control.seek.is_none() && !control.stop && !control.start
                    });
                    if self.shared.is_destroyed() || control.stop || control.start {
                        return Ok(());
                    }
                    drop(control);
                    pacer.reset(Instant::now());
                    self.shared.state.set(PlayerState::Running);
                }
                Err(CodecError::Exit) => return Ok(()),
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Pace, frame and hand one packet to the host.
    ///
    /// Returns `false` when the run should end.
    fn deliver(&self, pacer: &mut Pacer, packet: Packet, time_base: Rational) -> bool {
        let stats = &self.shared.stats;
        match pacer.schedule(packet.duration, time_base, Instant::now()) {
            Pace::Wait(deadline) => {
                if !self.shared.sleep_until(deadline) {
                    return false;
                }
            }
            Pace::Late {
                overrun,
                dropped_samples,
            } => {
                trace!(?overrun, dropped_samples, "behind real time");
                Stats::add(&stats.dropped_samples, dropped_samples);
            }
        }

        Stats::add(&stats.total_packets, 1);
        Stats::add(&stats.total_samples, packet.duration.max(0) as u64);

        match self.frame(packet) {
            Some(outbound) => self.emit(Signal::Packet(outbound)),
            None => true,
        }
    }

    /// Seal and transmit a packet if secure framing is configured.
    ///
    /// Returns `None` when the packet could not be sealed and is skipped.
    fn frame(&self, packet: Packet) -> Option<OutboundPacket> {
        let stats = &self.shared.stats;
        let mut secure = self.shared.secure.lock();
        let secure = &mut *secure;

        let outbound = match secure.framer.as_mut() {
            Some(framer) => {
                let duration = packet.duration.clamp(0, i64::from(u32::MAX)) as u32;
                match framer.seal(&packet.data, duration) {
                    Ok(frame) => OutboundPacket {
                        data: frame.to_vec(),
                        duration: packet.duration,
                        sealed: true,
                    },
                    Err(err) => {
                        warn!(error = %err, size = packet.data.len(), "frame skipped");
                        Stats::add(&stats.skipped_frames, 1);
                        return None;
                    }
                }
            }
            None => OutboundPacket {
                data: packet.data,
                duration: packet.duration,
                sealed: false,
            },
        };

        if let Some(transport) = secure.transport.as_ref() {
            if let Err(err) = transport.send(&outbound.data) {
                warn!(error = %err, peer = %transport.peer_addr(), "transmit failed");
                Stats::add(&stats.failed_transmits, 1);
            }
        }
        Some(outbound)
    }

    /// Hand `signal` to the host and block until it has been delivered.
    ///
    /// Returns `false` if the player was destroyed meanwhile.
    fn emit(&self, signal: Signal) -> bool {
        if self.shared.is_destroyed() {
            return false;
        }

        self.shared.put_signal(signal);
        if let Err(err) = self.message.send() {
            warn!(error = %err, "could not signal host");
            self.shared.take_signal();
            return false;
        }

        let shared = &self.shared;
        self.message.wait_while(|| shared.is_destroyed()) && !shared.is_destroyed()
    }

    /// Report a fatal run error exactly once.
    fn report(&self, err: PlayerError) {
        if self.shared.is_destroyed() {
            return;
        }
        error!(
            error = %err,
            code = err.code(),
            retryable = err.is_retryable(),
            "stream failed"
        );
        self.shared.state.set(PlayerState::Error);
        self.emit(Signal::Error(err));
    }
}
