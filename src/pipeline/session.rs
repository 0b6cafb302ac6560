//! One run over an opened source: demux, optional transcode, packet timing.

use super::config::OutputFormat;
use super::error::{PlayerError, PlayerResult};
use super::shared::Shared;
use super::state::PlayerState;
use crate::codec::{
    AudioFormat, CodecError, CodecResult, Decoder, Demuxer, Encoder, EncoderConfig, FilterGraph,
    FilterGraphDescription, Frame, MediaBackend, Packet, PacketFraming, Rational, SampleFormat,
    SourceLocator, TrackInfo, best_audio_track, packet_framing,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, info, trace, warn};

const ENCODER_COMPRESSION_LEVEL: u8 = 10;

/// Clamp a requested seek position into the playable range.
///
/// A duration of zero means unknown and only clamps from below.
pub(crate) fn clamp_seek(target: f64, duration: f64) -> f64 {
    if target.is_nan() || target < 0.0 {
        0.0
    } else if duration > 0.0 && target > duration {
        duration
    } else {
        target
    }
}

/// Decoder, filter graph and encoder used while transcoding.
struct Transcoder {
    decoder: Box<dyn Decoder>,
    encoder: Box<dyn Encoder>,
    graph: Option<Box<dyn FilterGraph>>,
    description: Option<FilterGraphDescription>,
    /// Shape the current graph source was built for.
    input: Option<AudioFormat>,
    decoder_has_data: bool,
    filter_has_data: bool,
    encoder_has_data: bool,
}

/// The codec state of one run.
pub(crate) struct Session {
    backend: Arc<dyn MediaBackend>,
    shared: Arc<Shared>,
    demuxer: Box<dyn Demuxer>,
    track: TrackInfo,
    output: OutputFormat,
    start_time: f64,
    duration: f64,
    transcoder: Option<Transcoder>,
    /// Timestamp one past the last decoded frame, for frames without one.
    last_pts: Option<(i64, Rational)>,
}

impl Session {
    /// Open `source` and prepare to relay its best audio track.
    pub(crate) fn open(
        backend: Arc<dyn MediaBackend>,
        shared: Arc<Shared>,
        source: &SourceLocator,
        output: OutputFormat,
    ) -> PlayerResult<Self> {
        let mut demuxer = backend
            .open_input(source, &shared.config.open, shared.destroyed.clone())
            .map_err(PlayerError::open)?;

        let track = best_audio_track(demuxer.tracks())
            .cloned()
            .ok_or(PlayerError::NoAudioTrack)?;
        demuxer.select_track(track.index)?;

        let container = demuxer.container();
        let duration = match track.duration {
            Some(duration) => track.time_base.seconds(duration),
            None => container.duration_us.map_or(0.0, |us| us as f64 / 1e6),
        };
        let start_time = container.start_time_us.map_or(0.0, |us| us as f64 / 1e6);
        shared.stats.duration.store(duration);

        info!(
            url = %source.url,
            codec = %track.codec,
            track = track.index,
            duration,
            "source opened"
        );

        let mut session = Self {
            backend,
            shared,
            demuxer,
            track,
            output,
            start_time,
            duration,
            transcoder: None,
            last_pts: None,
        };
        if session.track.codec != output.codec {
            session.init_transcoder()?;
        }
        session.set_passthrough(session.transcoder.is_none());
        Ok(session)
    }

    fn encoder_config(&self, bitrate: u32) -> EncoderConfig {
        EncoderConfig {
            codec: self.output.codec,
            format: self.output.encoder_format(),
            bitrate,
            compression_level: ENCODER_COMPRESSION_LEVEL,
        }
    }

    /// The bitrate to open an encoder with, consuming any pending change.
    fn take_bitrate(&self) -> u32 {
        let mut control = self.shared.control();
        control.bitrate_dirty = false;
        control.output.bitrate
    }

    fn init_transcoder(&mut self) -> CodecResult<()> {
        let decoder = self.backend.open_decoder(&self.track, SampleFormat::S16)?;
        let bitrate = self.take_bitrate();
        let encoder = self.backend.open_encoder(&self.encoder_config(bitrate))?;

        self.transcoder = Some(Transcoder {
            decoder,
            encoder,
            graph: None,
            description: None,
            input: None,
            decoder_has_data: false,
            filter_has_data: false,
            encoder_has_data: false,
        });
        self.last_pts = None;
        debug!(from = %self.track.codec, to = %self.output.codec, bitrate, "transcoding");
        Ok(())
    }

    fn set_passthrough(&self, passthrough: bool) {
        self.shared
            .stats
            .passthrough
            .store(passthrough, Ordering::Relaxed);
    }

    /// Seek to `target` seconds, clamped into the stream.
    ///
    /// A demuxer that cannot seek is logged and otherwise ignored; rebuilding
    /// the filter graph afterwards is fatal on failure.
    pub(crate) fn seek(&mut self, target: f64) -> CodecResult<()> {
        let target = clamp_seek(target, self.duration);
        let timestamp = self.track.time_base.units(target + self.start_time);
        self.shared.stats.time.store(target);

        if let Err(err) = self.demuxer.seek(timestamp) {
            warn!(target, error = %err, "seek failed");
            return Ok(());
        }
        debug!(target, timestamp, "seeked");

        let Some(transcoder) = self.transcoder.as_mut() else {
            return Ok(());
        };
        transcoder.decoder.flush();
        transcoder.decoder_has_data = false;
        if transcoder.graph.is_some() {
            self.configure_filters(true)?;
        }
        Ok(())
    }

    /// Produce the next output packet and the time base its duration is in.
    ///
    /// Fails with [`CodecError::Eof`] at the end of the source and with
    /// [`CodecError::Exit`] once the player is stopped or destroyed.
    pub(crate) fn next_packet(&mut self) -> CodecResult<(Packet, Rational)> {
        loop {
            if self.shared.is_destroyed() || self.shared.control().stop {
                return Err(CodecError::Exit);
            }

            if let Some(transcoder) = self.transcoder.as_mut() {
                if transcoder.encoder_has_data {
                    match transcoder.encoder.receive_packet() {
                        Ok(packet) => {
                            let time_base = transcoder.encoder.time_base();
                            return Ok((packet, time_base));
                        }
                        Err(CodecError::Again) => transcoder.encoder_has_data = false,
                        Err(err) => return Err(err),
                    }
                }

                if transcoder.filter_has_data {
                    if let Some(graph) = transcoder.graph.as_mut() {
                        match graph.receive_frame() {
                            Ok(frame) => {
                                self.submit(frame)?;
                                continue;
                            }
                            Err(CodecError::Again) => transcoder.filter_has_data = false,
                            Err(err) => return Err(err),
                        }
                    } else {
                        transcoder.filter_has_data = false;
                    }
                }

                if transcoder.decoder_has_data {
                    match transcoder.decoder.receive_frame() {
                        Ok(frame) => {
                            self.filter(frame)?;
                            continue;
                        }
                        Err(CodecError::Again) => transcoder.decoder_has_data = false,
                        Err(err) => return Err(err),
                    }
                }
            }

            let packet = self.demuxer.read_packet()?;
            if let Some(pts) = packet.pts {
                let time = self.track.time_base.seconds(pts) - self.start_time;
                self.shared.stats.time.store(time);
            }

            if let Some(passthrough) = self.route(packet)? {
                return Ok(passthrough);
            }
        }
    }

    /// Decide whether a demuxed packet is forwarded as is or decoded.
    ///
    /// Returns the packet when it is forwarded.
    fn route(&mut self, mut packet: Packet) -> CodecResult<Option<(Packet, Rational)>> {
        let effects_set = self.shared.control().effects.any_set();
        let mut teardown = false;

        if effects_set {
            if self.transcoder.is_none() {
                debug!("effects requested, leaving pass-through");
                self.init_transcoder()?;
                self.set_passthrough(false);
            }
        } else if self.transcoder.is_some() && self.track.codec == self.output.codec {
            teardown = true;
        }

        if self.transcoder.is_none() || teardown {
            match self.passthrough_duration(&packet) {
                Some(duration) => {
                    if teardown {
                        debug!("effects cleared, returning to pass-through");
                        self.transcoder = None;
                    }
                    self.set_passthrough(true);
                    packet.duration = duration;
                    return Ok(Some((packet, Rational::per(self.output.sample_rate))));
                }
                None if self.transcoder.is_none() => {
                    debug!("packet does not match the output format, transcoding");
                    self.init_transcoder()?;
                    self.set_passthrough(false);
                }
                None => {}
            }
        }

        if let Some(transcoder) = self.transcoder.as_mut() {
            transcoder.decoder.send_packet(&packet)?;
            transcoder.decoder_has_data = true;
        }
        Ok(None)
    }

    /// Duration of `packet` in output samples, if it can be forwarded unchanged.
    fn passthrough_duration(&self, packet: &Packet) -> Option<i64> {
        let output = &self.output;
        match packet_framing(self.track.codec, &packet.data) {
            PacketFraming::Parsed(shape) => (shape.channels == output.channels
                && shape.sample_rate == output.sample_rate)
                .then_some(i64::from(shape.samples)),
            PacketFraming::Invalid => {
                trace!(len = packet.data.len(), "malformed packet framing");
                None
            }
            PacketFraming::Unknown => {
                let format = &self.track.format;
                (format.channels == output.channels && format.sample_rate == output.sample_rate)
                    .then(|| {
                        self.track
                            .time_base
                            .rescale(packet.duration, Rational::per(output.sample_rate))
                    })
            }
        }
    }

    /// Time a decoded frame and push it into the graph, rebuilding the graph first if needed.
    fn filter(&mut self, mut frame: Frame) -> CodecResult<()> {
        let time_base = Rational::per(frame.format.sample_rate);
        frame.pts = match frame.pts {
            Some(pts) => Some(self.track.time_base.rescale(pts, time_base)),
            None => self.last_pts.map(|(pts, from)| from.rescale(pts, time_base)),
        };
        if let Some(pts) = frame.pts {
            self.last_pts = Some((pts + frame.nb_samples as i64, time_base));
        }

        let shape_changed = self
            .transcoder
            .as_ref()
            .and_then(|transcoder| transcoder.input)
            .is_none_or(|input| input.shape_differs(&frame.format));
        let effects_changed = self.shared.control().effects.any_changed();

        if shape_changed || effects_changed {
            if let Some(transcoder) = self.transcoder.as_mut() {
                transcoder.input = Some(frame.format);
            }
            self.configure_filters(false)?;
        }

        let Some(transcoder) = self.transcoder.as_mut() else {
            return Ok(());
        };
        match transcoder.graph.as_mut() {
            Some(graph) => {
                graph.send_frame(frame)?;
                transcoder.filter_has_data = true;
                Ok(())
            }
            None => self.submit(frame),
        }
    }

    /// Commit pending effects and make sure the graph matches them.
    ///
    /// The graph is only rebuilt when its description changes, unless `force` is set.
    fn configure_filters(&mut self, force: bool) -> CodecResult<()> {
        let Some(transcoder) = self.transcoder.as_mut() else {
            return Ok(());
        };
        let Some(input) = transcoder.input else {
            return Ok(());
        };

        let chain = {
            let mut control = self.shared.control();
            control.effects.commit();
            control.effects.chain(input.sample_rate)
        };
        let description = FilterGraphDescription {
            source: input,
            chain,
            sink: self.output.encoder_format(),
            frame_size: transcoder.encoder.frame_size(),
        };

        if !force && transcoder.graph.is_some() && transcoder.description.as_ref() == Some(&description) {
            trace!("filter graph unchanged");
            return Ok(());
        }

        self.shared.state.set(PlayerState::Reconfiguring);
        transcoder.graph = None;
        transcoder.description = None;
        transcoder.filter_has_data = false;

        let graph = self.backend.build_filter_graph(&description)?;
        debug!(
            chain = description.chain.as_deref().unwrap_or("none"),
            sample_rate = input.sample_rate,
            channels = input.channels,
            "filter graph rebuilt"
        );
        transcoder.graph = Some(graph);
        transcoder.description = Some(description);
        self.shared.state.set(PlayerState::Running);
        Ok(())
    }

    /// Hand a frame to the encoder, reopening it first if the bitrate changed.
    fn submit(&mut self, frame: Frame) -> CodecResult<()> {
        let bitrate = {
            let mut control = self.shared.control();
            std::mem::take(&mut control.bitrate_dirty).then_some(control.output.bitrate)
        };
        if let Some(bitrate) = bitrate {
            let config = self.encoder_config(bitrate);
            if let Some(transcoder) = self.transcoder.as_mut() {
                self.shared.state.set(PlayerState::Reconfiguring);
                transcoder.encoder = self.backend.open_encoder(&config)?;
                self.shared.state.set(PlayerState::Running);
                debug!(bitrate, "encoder reopened");
            }
            // The new encoder may want a different frame size from the graph sink.
            self.configure_filters(false)?;
        }

        let Some(transcoder) = self.transcoder.as_mut() else {
            return Ok(());
        };
        transcoder.encoder.send_frame(frame)?;
        transcoder.encoder_has_data = true;
        Ok(())
    }
}
