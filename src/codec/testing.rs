//! A scripted in-memory [`MediaBackend`] for driving the pipeline in tests.
//!
//! Sources are registered by URL with a fixed packet list. Decoders turn each
//! packet into one frame, filter graphs regroup frames into the sink's frame
//! size, and encoders emit one packet per frame. A shared [`Probe`] records
//! what the pipeline asked the backend to do.

use super::backend::{Decoder, Demuxer, Encoder, FilterGraph, MediaBackend};
use super::error::{CodecError, CodecResult};
use super::types::{
    AudioFormat, CodecId, ContainerInfo, EncoderConfig, FilterGraphDescription, Frame, Interrupt,
    MediaKind, OpenOptions, Packet, Rational, SampleFormat, SourceLocator, TrackInfo,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

const AVERROR_INVALIDDATA: i32 = -1_094_995_529;

/// A source the scripted backend can open.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    /// Tracks reported by the demuxer.
    pub tracks: Vec<TrackInfo>,
    /// Container timing.
    pub container: ContainerInfo,
    /// Packets of the audio track, in order.
    pub packets: Vec<Packet>,
    /// Returned by `open_input` instead of a demuxer.
    pub open_error: Option<CodecError>,
    /// Decoding the packet with this pts fails.
    pub decode_error_pts: Option<i64>,
    /// Frames decoded from packets at or after this pts use this shape.
    pub format_switch: Option<(i64, AudioFormat)>,
}

impl ScriptedSource {
    /// A stereo 48 kHz Opus stream of `packets` packets, all with TOC byte `toc`.
    pub fn opus(packets: usize, toc: u8) -> Self {
        let samples = i64::from(super::opus::samples_per_frame(toc, 48_000));
        let channels = if toc & 0x04 != 0 { 2 } else { 1 };
        let track = TrackInfo {
            index: 0,
            kind: MediaKind::Audio,
            codec: CodecId::Opus,
            time_base: Rational::per(48_000),
            format: AudioFormat::new(SampleFormat::F32, 48_000, channels),
            duration: Some(samples * packets as i64),
            is_default: true,
        };
        Self::from_track(track, packets, samples, vec![toc, 0xAA, 0x55, 0xAA])
    }

    /// A packed 16-bit stream in a codec other than Opus.
    pub fn aac(packets: usize, sample_rate: u32, channels: u16) -> Self {
        let track = TrackInfo {
            index: 0,
            kind: MediaKind::Audio,
            codec: CodecId::Aac,
            time_base: Rational::per(sample_rate),
            format: AudioFormat::new(SampleFormat::S16, sample_rate, channels),
            duration: Some(1024 * packets as i64),
            is_default: true,
        };
        Self::from_track(track, packets, 1024, vec![0x21, 0x10, 0x04])
    }

    fn from_track(track: TrackInfo, packets: usize, samples: i64, payload: Vec<u8>) -> Self {
        let packets = (0..packets as i64)
            .map(|index| Packet::new(payload.clone(), Some(index * samples), samples))
            .collect();
        Self {
            tracks: vec![track],
            container: ContainerInfo::default(),
            packets,
            open_error: None,
            decode_error_pts: None,
            format_switch: None,
        }
    }

    /// A source whose open fails with `error`.
    pub fn failing(error: CodecError) -> Self {
        Self {
            open_error: Some(error),
            ..Self::opus(0, 0xFC)
        }
    }

    /// Replace every packet's payload.
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        for packet in &mut self.packets {
            packet.data = payload.clone();
        }
        self
    }
}

/// Counters and recordings of backend calls.
#[derive(Debug, Default)]
pub struct Probe {
    opens: AtomicUsize,
    decoder_opens: AtomicUsize,
    encoder_opens: AtomicUsize,
    flushes: AtomicUsize,
    graph_inputs: Mutex<Vec<Option<i64>>>,
    open_options: Mutex<Vec<(SourceLocator, OpenOptions)>>,
    descriptions: Mutex<Vec<FilterGraphDescription>>,
    encoder_configs: Mutex<Vec<EncoderConfig>>,
    seek_targets: Mutex<Vec<i64>>,
}

impl Probe {
    /// Sources opened.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Decoders opened.
    pub fn decoder_opens(&self) -> usize {
        self.decoder_opens.load(Ordering::SeqCst)
    }

    /// Encoders opened, including reopens.
    pub fn encoder_opens(&self) -> usize {
        self.encoder_opens.load(Ordering::SeqCst)
    }

    /// Decoder flushes.
    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    /// Filter graphs built.
    pub fn graph_builds(&self) -> usize {
        self.descriptions.lock().len()
    }

    /// Timestamp of every frame fed to a filter graph, in the frame's sample rate.
    pub fn graph_input_pts(&self) -> Vec<Option<i64>> {
        self.graph_inputs.lock().clone()
    }

    /// Options each source was opened with.
    pub fn open_options(&self) -> Vec<(SourceLocator, OpenOptions)> {
        self.open_options.lock().clone()
    }

    /// Description of every graph built, in order.
    pub fn descriptions(&self) -> Vec<FilterGraphDescription> {
        self.descriptions.lock().clone()
    }

    /// Configuration of every encoder opened, in order.
    pub fn encoder_configs(&self) -> Vec<EncoderConfig> {
        self.encoder_configs.lock().clone()
    }

    /// Every seek target, in the selected track's time base.
    pub fn seek_targets(&self) -> Vec<i64> {
        self.seek_targets.lock().clone()
    }
}

/// The scripted backend.
pub struct ScriptedBackend {
    sources: Mutex<HashMap<String, ScriptedSource>>,
    probe: Arc<Probe>,
    frame_size: AtomicUsize,
    fail_graph_builds: AtomicBool,
}

impl ScriptedBackend {
    /// A backend with no sources and 20 ms encoder frames.
    pub fn new() -> Self {
        Self {
            sources: Mutex::new(HashMap::new()),
            probe: Arc::new(Probe::default()),
            frame_size: AtomicUsize::new(960),
            fail_graph_builds: AtomicBool::new(false),
        }
    }

    /// Register `source` under `url`.
    pub fn with_source(self, url: impl Into<String>, source: ScriptedSource) -> Self {
        self.insert(url, source);
        self
    }

    /// Register or replace `source` under `url`.
    pub fn insert(&self, url: impl Into<String>, source: ScriptedSource) {
        self.sources.lock().insert(url.into(), source);
    }

    /// The shared call recorder.
    pub fn probe(&self) -> Arc<Probe> {
        Arc::clone(&self.probe)
    }

    /// Frame size of encoders opened from now on.
    pub fn set_frame_size(&self, frame_size: usize) {
        self.frame_size.store(frame_size, Ordering::SeqCst);
    }

    /// Make every later graph build fail.
    pub fn fail_graph_builds(&self, fail: bool) {
        self.fail_graph_builds.store(fail, Ordering::SeqCst);
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaBackend for ScriptedBackend {
    fn open_input(
        &self,
        source: &SourceLocator,
        options: &OpenOptions,
        interrupt: Interrupt,
    ) -> CodecResult<Box<dyn Demuxer>> {
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        self.probe
            .open_options
            .lock()
            .push((source.clone(), options.clone()));

        if interrupt.is_triggered() {
            return Err(CodecError::Exit);
        }
        let script = self
            .sources
            .lock()
            .get(&source.url)
            .cloned()
            .ok_or_else(|| CodecError::io(format!("{}: No such file or directory", source.url)))?;
        if let Some(error) = script.open_error.clone() {
            return Err(error);
        }

        Ok(Box::new(ScriptedDemuxer {
            script,
            position: 0,
            selected: None,
            interrupt,
            probe: self.probe(),
        }))
    }

    fn open_decoder(&self, track: &TrackInfo, request: SampleFormat) -> CodecResult<Box<dyn Decoder>> {
        self.probe.decoder_opens.fetch_add(1, Ordering::SeqCst);
        let script = self
            .sources
            .lock()
            .values()
            .find(|source| source.tracks.iter().any(|t| t == track))
            .cloned();

        Ok(Box::new(ScriptedDecoder {
            format: AudioFormat {
                sample_format: request,
                ..track.format
            },
            time_base: track.time_base,
            error_pts: script.as_ref().and_then(|s| s.decode_error_pts),
            format_switch: script.as_ref().and_then(|s| s.format_switch),
            frames: VecDeque::new(),
            probe: self.probe(),
        }))
    }

    fn open_encoder(&self, config: &EncoderConfig) -> CodecResult<Box<dyn Encoder>> {
        self.probe.encoder_opens.fetch_add(1, Ordering::SeqCst);
        self.probe.encoder_configs.lock().push(config.clone());

        Ok(Box::new(ScriptedEncoder {
            config: config.clone(),
            frame_size: self.frame_size.load(Ordering::SeqCst),
            packets: VecDeque::new(),
        }))
    }

    fn build_filter_graph(&self, description: &FilterGraphDescription) -> CodecResult<Box<dyn FilterGraph>> {
        if self.fail_graph_builds.load(Ordering::SeqCst) {
            return Err(CodecError::invalid_input("No such filter"));
        }
        self.probe.descriptions.lock().push(description.clone());

        Ok(Box::new(ScriptedGraph {
            description: description.clone(),
            queued: 0,
            next_pts: None,
            frames: VecDeque::new(),
            probe: self.probe(),
        }))
    }
}

struct ScriptedDemuxer {
    script: ScriptedSource,
    position: usize,
    selected: Option<usize>,
    interrupt: Interrupt,
    probe: Arc<Probe>,
}

impl Demuxer for ScriptedDemuxer {
    fn tracks(&self) -> &[TrackInfo] {
        &self.script.tracks
    }

    fn container(&self) -> ContainerInfo {
        self.script.container
    }

    fn select_track(&mut self, index: usize) -> CodecResult<()> {
        if !self.script.tracks.iter().any(|track| track.index == index) {
            return Err(CodecError::invalid_input(format!("no track {index}")));
        }
        self.selected = Some(index);
        Ok(())
    }

    fn read_packet(&mut self) -> CodecResult<Packet> {
        if self.interrupt.is_triggered() {
            return Err(CodecError::Exit);
        }
        if self.selected.is_none() {
            return Err(CodecError::invalid_input("no track selected"));
        }
        let packet = self
            .script
            .packets
            .get(self.position)
            .cloned()
            .ok_or(CodecError::Eof)?;
        self.position += 1;
        Ok(packet)
    }

    fn seek(&mut self, timestamp: i64) -> CodecResult<()> {
        self.probe.seek_targets.lock().push(timestamp);
        self.position = self
            .script
            .packets
            .iter()
            .position(|packet| packet.pts.is_some_and(|pts| pts >= timestamp))
            .unwrap_or(self.script.packets.len());
        Ok(())
    }
}

struct ScriptedDecoder {
    format: AudioFormat,
    time_base: Rational,
    error_pts: Option<i64>,
    format_switch: Option<(i64, AudioFormat)>,
    frames: VecDeque<Frame>,
    probe: Arc<Probe>,
}

impl Decoder for ScriptedDecoder {
    fn send_packet(&mut self, packet: &Packet) -> CodecResult<()> {
        if packet.pts.is_some() && packet.pts == self.error_pts {
            return Err(CodecError::fatal(
                AVERROR_INVALIDDATA,
                "Invalid data found when processing input",
            ));
        }

        let format = match self.format_switch {
            Some((from, format)) if packet.pts.is_some_and(|pts| pts >= from) => format,
            _ => self.format,
        };
        let nb_samples = self
            .time_base
            .rescale(packet.duration, Rational::per(format.sample_rate))
            .max(0) as usize;

        self.frames.push_back(Frame {
            format,
            nb_samples,
            pts: packet.pts,
            data: Vec::new(),
        });
        Ok(())
    }

    fn receive_frame(&mut self) -> CodecResult<Frame> {
        self.frames.pop_front().ok_or(CodecError::Again)
    }

    fn flush(&mut self) {
        self.frames.clear();
        self.probe.flushes.fetch_add(1, Ordering::SeqCst);
    }
}

struct ScriptedGraph {
    description: FilterGraphDescription,
    queued: usize,
    next_pts: Option<i64>,
    frames: VecDeque<Frame>,
    probe: Arc<Probe>,
}

impl FilterGraph for ScriptedGraph {
    fn send_frame(&mut self, frame: Frame) -> CodecResult<()> {
        if frame.format.shape_differs(&self.description.source) {
            return Err(CodecError::invalid_input("frame does not match graph source"));
        }
        self.probe.graph_inputs.lock().push(frame.pts);

        let sink = self.description.sink;
        let frame_size = self.description.frame_size;
        if frame_size == 0 {
            self.frames.push_back(Frame {
                format: sink,
                ..frame
            });
            return Ok(());
        }

        if self.next_pts.is_none() {
            self.next_pts = frame.pts;
        }
        self.queued += frame.nb_samples;
        while self.queued >= frame_size {
            self.frames.push_back(Frame {
                format: sink,
                nb_samples: frame_size,
                pts: self.next_pts,
                data: Vec::new(),
            });
            self.next_pts = self.next_pts.map(|pts| pts + frame_size as i64);
            self.queued -= frame_size;
        }
        Ok(())
    }

    fn receive_frame(&mut self) -> CodecResult<Frame> {
        self.frames.pop_front().ok_or(CodecError::Again)
    }
}

struct ScriptedEncoder {
    config: EncoderConfig,
    frame_size: usize,
    packets: VecDeque<Packet>,
}

impl Encoder for ScriptedEncoder {
    fn send_frame(&mut self, frame: Frame) -> CodecResult<()> {
        if frame.format != self.config.format {
            return Err(CodecError::invalid_input("frame does not match encoder format"));
        }
        self.packets.push_back(Packet::new(
            vec![0xFC, 0x01, 0x02, 0x03],
            frame.pts,
            frame.nb_samples as i64,
        ));
        Ok(())
    }

    fn receive_packet(&mut self) -> CodecResult<Packet> {
        self.packets.pop_front().ok_or(CodecError::Again)
    }

    fn time_base(&self) -> Rational {
        Rational::per(self.config.format.sample_rate)
    }

    fn frame_size(&self) -> usize {
        self.frame_size
    }

    fn format(&self) -> AudioFormat {
        self.config.format
    }
}
