//! The seam between the relay and a demux/decode/filter/encode library.
//!
//! Everything the pipeline needs from a media library is expressed by the
//! traits in [`backend`]: open a source and read packets, decode packets into
//! frames, push frames through a filter graph, and encode frames back into
//! packets. Data crossing the seam is described by the plain types in
//! [`types`].
//!
//! Pass-through packets are timed from codec framing metadata where the codec
//! carries it in-band (see [`packet_framing`]); other codecs fall back to the
//! durations reported by the demuxer.

pub mod backend;
pub mod error;
pub mod opus;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backend::{Decoder, Demuxer, Encoder, FilterGraph, MediaBackend};
pub use error::{CodecError, CodecResult};
pub use opus::{OPUS_SAMPLE_RATE, OpusPacketInfo};
pub use types::{
    AudioFormat, CodecId, ContainerInfo, EncoderConfig, FilterGraphDescription, Frame, Interrupt,
    MediaKind, OpenOptions, Packet, Rational, SampleFormat, SourceLocator, TrackInfo,
    default_channel_layout,
};

/// Shape of a compressed packet as declared by its own framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketShape {
    /// Sampling rate the packet decodes at.
    pub sample_rate: u32,
    /// Decoded channel count.
    pub channels: u16,
    /// Samples per channel in the packet.
    pub samples: u32,
}

/// Result of reading a packet's in-band framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketFraming {
    /// The codec describes its packets and this one parsed.
    Parsed(PacketShape),
    /// The codec describes its packets but this one is malformed.
    Invalid,
    /// The codec carries no in-band framing the relay understands.
    Unknown,
}

/// Read the in-band framing of `data` for `codec`.
pub fn packet_framing(codec: CodecId, data: &[u8]) -> PacketFraming {
    match codec {
        CodecId::Opus => match OpusPacketInfo::parse(data) {
            Some(info) => PacketFraming::Parsed(PacketShape {
                sample_rate: OPUS_SAMPLE_RATE,
                channels: info.channels,
                samples: info.samples(),
            }),
            None => PacketFraming::Invalid,
        },
        _ => PacketFraming::Unknown,
    }
}

/// Pick the track to relay: the first default audio track, else the first audio track.
pub fn best_audio_track(tracks: &[TrackInfo]) -> Option<&TrackInfo> {
    let mut audio = tracks.iter().filter(|track| track.kind == MediaKind::Audio);
    let first = audio.clone().next();
    audio.find(|track| track.is_default).or(first)
}
