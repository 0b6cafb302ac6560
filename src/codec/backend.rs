//! Traits a media library implements to drive the relay.
//!
//! The relay never decodes or encodes audio itself. It opens sources, codecs
//! and filter graphs through a [`MediaBackend`] and moves packets and frames
//! between them. Every receiving call follows the same convention:
//! [`CodecError::Again`](super::CodecError::Again) means "feed more input first" and
//! [`CodecError::Eof`](super::CodecError::Eof) means the producer is drained.

use super::error::CodecResult;
use super::types::{
    AudioFormat, ContainerInfo, EncoderConfig, FilterGraphDescription, Frame, Interrupt,
    OpenOptions, Packet, Rational, SampleFormat, SourceLocator, TrackInfo,
};

/// Factory for demuxers, codecs and filter graphs.
pub trait MediaBackend: Send + Sync {
    /// Open `source` for demuxing.
    ///
    /// Blocking work must poll `interrupt` and fail with
    /// [`CodecError::Exit`](super::CodecError::Exit) once it is triggered.
    fn open_input(
        &self,
        source: &SourceLocator,
        options: &OpenOptions,
        interrupt: Interrupt,
    ) -> CodecResult<Box<dyn Demuxer>>;

    /// Open a decoder for `track`, asking for `request` output if possible.
    fn open_decoder(&self, track: &TrackInfo, request: SampleFormat) -> CodecResult<Box<dyn Decoder>>;

    /// Open an encoder.
    fn open_encoder(&self, config: &EncoderConfig) -> CodecResult<Box<dyn Encoder>>;

    /// Build and configure a filter graph.
    fn build_filter_graph(&self, description: &FilterGraphDescription) -> CodecResult<Box<dyn FilterGraph>>;
}

/// An opened source.
pub trait Demuxer: Send {
    /// Every track in the container.
    fn tracks(&self) -> &[TrackInfo];

    /// Container-wide timing.
    fn container(&self) -> ContainerInfo;

    /// Keep only packets of track `index`; all others are discarded.
    fn select_track(&mut self, index: usize) -> CodecResult<()>;

    /// Next packet of the selected track, timed in that track's time base.
    fn read_packet(&mut self) -> CodecResult<Packet>;

    /// Seek the selected track to `timestamp` in its time base.
    fn seek(&mut self, timestamp: i64) -> CodecResult<()>;
}

/// A packet-to-frame decoder.
pub trait Decoder: Send {
    /// Submit one packet.
    fn send_packet(&mut self, packet: &Packet) -> CodecResult<()>;

    /// Take one decoded frame.
    fn receive_frame(&mut self) -> CodecResult<Frame>;

    /// Drop all buffered state.
    fn flush(&mut self);
}

/// A configured chain of audio filters.
pub trait FilterGraph: Send {
    /// Feed one frame into the source node.
    fn send_frame(&mut self, frame: Frame) -> CodecResult<()>;

    /// Take one frame from the sink node.
    fn receive_frame(&mut self) -> CodecResult<Frame>;
}

/// A frame-to-packet encoder.
pub trait Encoder: Send {
    /// Submit one frame.
    fn send_frame(&mut self, frame: Frame) -> CodecResult<()>;

    /// Take one encoded packet, timed in [`time_base`](Self::time_base).
    fn receive_packet(&mut self) -> CodecResult<Packet>;

    /// Time base of output packets.
    fn time_base(&self) -> Rational;

    /// Samples per channel the encoder expects per frame, `0` for any.
    fn frame_size(&self) -> usize;

    /// The shape the encoder accepts.
    fn format(&self) -> AudioFormat;
}
