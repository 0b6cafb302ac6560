//! Plain data exchanged across the media backend seam.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Audio codec identifiers the relay distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CodecId {
    /// Opus.
    #[default]
    Opus,
    /// AAC.
    Aac,
    /// MPEG-1/2 Layer III.
    Mp3,
    /// Vorbis.
    Vorbis,
    /// FLAC.
    Flac,
    /// Uncompressed PCM.
    Pcm,
    /// Any other backend codec id.
    Other(u32),
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecId::Opus => f.write_str("opus"),
            CodecId::Aac => f.write_str("aac"),
            CodecId::Mp3 => f.write_str("mp3"),
            CodecId::Vorbis => f.write_str("vorbis"),
            CodecId::Flac => f.write_str("flac"),
            CodecId::Pcm => f.write_str("pcm"),
            CodecId::Other(id) => write!(f, "codec#{id}"),
        }
    }
}

/// Sample storage formats, packed (interleaved) and planar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleFormat {
    /// Unsigned 8-bit.
    U8,
    /// Signed 16-bit.
    S16,
    /// Signed 32-bit.
    S32,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// Unsigned 8-bit, planar.
    U8Planar,
    /// Signed 16-bit, planar.
    S16Planar,
    /// Signed 32-bit, planar.
    S32Planar,
    /// 32-bit float, planar.
    F32Planar,
    /// 64-bit float, planar.
    F64Planar,
}

impl SampleFormat {
    /// Whether channels are stored in separate planes.
    pub fn is_planar(self) -> bool {
        !matches!(
            self,
            SampleFormat::U8 | SampleFormat::S16 | SampleFormat::S32 | SampleFormat::F32 | SampleFormat::F64
        )
    }

    /// The interleaved variant of this format.
    pub fn packed(self) -> Self {
        match self {
            SampleFormat::U8Planar => SampleFormat::U8,
            SampleFormat::S16Planar => SampleFormat::S16,
            SampleFormat::S32Planar => SampleFormat::S32,
            SampleFormat::F32Planar => SampleFormat::F32,
            SampleFormat::F64Planar => SampleFormat::F64,
            packed => packed,
        }
    }
}

/// A rational number, used for time bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    /// Numerator.
    pub num: i64,
    /// Denominator.
    pub den: i64,
}

impl Rational {
    /// Create a rational `num / den`.
    pub const fn new(num: i64, den: i64) -> Self {
        Self { num, den }
    }

    /// `1 / den`, the usual sample-rate time base.
    pub const fn per(den: u32) -> Self {
        Self::new(1, den as i64)
    }

    /// Whether the denominator is usable.
    pub fn is_valid(self) -> bool {
        self.num != 0 && self.den != 0
    }

    /// Convert `value` from this time base into `to`, rounding to nearest.
    pub fn rescale(self, value: i64, to: Rational) -> i64 {
        if !self.is_valid() || !to.is_valid() {
            return value;
        }
        let num = i128::from(value) * i128::from(self.num) * i128::from(to.den);
        let den = i128::from(self.den) * i128::from(to.num);
        let half = den.abs() / 2;
        let rounded = if (num < 0) == (den < 0) {
            (num.abs() + half) / den.abs()
        } else {
            -((num.abs() + half) / den.abs())
        };
        rounded.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
    }

    /// `value` time-base units in seconds.
    pub fn seconds(self, value: i64) -> f64 {
        if self.den == 0 {
            return 0.0;
        }
        value as f64 * self.num as f64 / self.den as f64
    }

    /// Seconds expressed in time-base units, truncated.
    pub fn units(self, seconds: f64) -> i64 {
        if self.num == 0 {
            return 0;
        }
        (seconds * self.den as f64 / self.num as f64) as i64
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Shape of decoded audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Sample storage format.
    pub sample_format: SampleFormat,
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Channel layout mask, `0` when unknown.
    pub channel_layout: u64,
}

impl AudioFormat {
    /// Create a format with the default layout for `channels`.
    pub fn new(sample_format: SampleFormat, sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_format,
            sample_rate,
            channels,
            channel_layout: default_channel_layout(channels),
        }
    }

    /// Whether a frame of shape `other` needs a different filter source than `self`.
    ///
    /// Mono audio is the same shape in its packed and planar forms.
    pub fn shape_differs(&self, other: &AudioFormat) -> bool {
        let format_differs = if self.channels != other.channels {
            true
        } else if self.channels == 1 {
            self.sample_format.packed() != other.sample_format.packed()
        } else {
            self.sample_format != other.sample_format
        };

        format_differs
            || self.sample_rate != other.sample_rate
            || self.channel_layout != other.channel_layout
    }
}

/// Default channel layout mask for a channel count.
pub fn default_channel_layout(channels: u16) -> u64 {
    match channels {
        0 => 0,
        1 => 0x4,
        2 => 0x3,
        n if n >= 64 => u64::MAX,
        n => (1u64 << n) - 1,
    }
}

/// What a demuxed track carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    /// Audio.
    Audio,
    /// Video.
    Video,
    /// Subtitles.
    Subtitle,
    /// Anything else.
    Data,
}

/// Metadata for one demuxed track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    /// Index within the container.
    pub index: usize,
    /// Track kind.
    pub kind: MediaKind,
    /// Codec of the track's packets.
    pub codec: CodecId,
    /// Time base of packet timestamps and durations.
    pub time_base: Rational,
    /// Decoded shape as reported by the container.
    pub format: AudioFormat,
    /// Duration in `time_base` units, if known.
    pub duration: Option<i64>,
    /// Marked as the default track of its kind.
    pub is_default: bool,
}

/// Container-wide metadata, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContainerInfo {
    /// Total duration, if known.
    pub duration_us: Option<i64>,
    /// Timestamp of the first sample, if known.
    pub start_time_us: Option<i64>,
}

/// One compressed packet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Packet {
    /// Encoded payload.
    pub data: Vec<u8>,
    /// Presentation timestamp in the producer's time base.
    pub pts: Option<i64>,
    /// Duration in the producer's time base.
    pub duration: i64,
}

impl Packet {
    /// Create a packet.
    pub fn new(data: Vec<u8>, pts: Option<i64>, duration: i64) -> Self {
        Self {
            data,
            pts,
            duration,
        }
    }
}

/// One block of decoded or filtered audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Shape of the samples.
    pub format: AudioFormat,
    /// Samples per channel.
    pub nb_samples: usize,
    /// Presentation timestamp; `1 / sample_rate` once past the decoder.
    pub pts: Option<i64>,
    /// Raw sample bytes, opaque to the relay.
    pub data: Vec<u8>,
}

/// Parameters for opening an encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Target codec.
    pub codec: CodecId,
    /// Output shape.
    pub format: AudioFormat,
    /// Target bitrate in bits per second.
    pub bitrate: u32,
    /// Backend compression effort.
    pub compression_level: u8,
}

/// Everything a backend needs to build a filter graph.
///
/// Two equal descriptions produce equivalent graphs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterGraphDescription {
    /// Shape of frames fed into the graph.
    pub source: AudioFormat,
    /// Comma-separated filter chain, or `None` to link source to sink directly.
    pub chain: Option<String>,
    /// The single shape the sink accepts.
    pub sink: AudioFormat,
    /// Samples per output frame, `0` for unconstrained.
    pub frame_size: usize,
}

/// Where to read media from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocator {
    /// URL or path.
    pub url: String,
    /// Local file rather than a network resource.
    pub is_file: bool,
}

impl SourceLocator {
    /// A network source.
    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            is_file: false,
        }
    }

    /// A local file.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            url: path.into(),
            is_file: true,
        }
    }
}

/// Options passed to the demuxer when a source is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOptions {
    /// HTTP user agent.
    pub user_agent: String,
    /// Protocols the demuxer may use for remote sources.
    pub protocol_whitelist: Vec<String>,
    /// Reconnect dropped HTTP connections.
    pub reconnect: bool,
    /// Reconnect on network errors as well.
    pub reconnect_on_network_error: bool,
    /// Longest reconnect back-off, in seconds.
    pub reconnect_delay_max: u32,
    /// Request ICY metadata from streaming servers.
    pub icy: bool,
    /// Scan every program map table of transport streams.
    pub scan_all_pmts: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/89.0.4389.72 Safari/537.36"
                .to_string(),
            protocol_whitelist: ["http", "https", "tcp", "tls", "crypto"]
                .into_iter()
                .map(String::from)
                .collect(),
            reconnect: true,
            reconnect_on_network_error: true,
            reconnect_delay_max: 2,
            icy: false,
            scan_all_pmts: true,
        }
    }
}

impl OpenOptions {
    /// The protocol whitelist for `source`; local files also allow `file`.
    pub fn protocols_for(&self, source: &SourceLocator) -> String {
        let mut protocols = self.protocol_whitelist.clone();
        if source.is_file && !protocols.iter().any(|p| p == "file") {
            protocols.push("file".to_string());
        }
        protocols.join(",")
    }

    /// The options as demuxer key/value pairs.
    pub fn dictionary(&self) -> Vec<(&'static str, String)> {
        let flag = |value: bool| if value { "1" } else { "0" }.to_string();
        vec![
            ("user_agent", self.user_agent.clone()),
            ("scan_all_pmts", flag(self.scan_all_pmts)),
            ("reconnect", flag(self.reconnect)),
            (
                "reconnect_on_network_error",
                flag(self.reconnect_on_network_error),
            ),
            ("reconnect_delay_max", self.reconnect_delay_max.to_string()),
            ("icy", flag(self.icy)),
        ]
    }
}

/// Shared flag that aborts blocking backend calls.
///
/// Backends poll [`is_triggered`](Self::is_triggered) while opening or
/// reading a source and fail with [`CodecError::Exit`](super::CodecError::Exit)
/// once it is set.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    /// A flag that is not yet triggered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger the flag. It never resets.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether the flag has been triggered.
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;

    #[test]
    fn test_rescale_rounds_to_nearest() {
        let ms = Rational::new(1, 1000);
        let opus = Rational::per(48_000);
        assert_eq!(ms.rescale(20, opus), 960);
        assert_eq!(opus.rescale(960, ms), 20);
        assert_eq!(opus.rescale(25, ms), 1);
        assert_eq!(opus.rescale(-25, ms), -1);
    }

    #[test]
    fn test_seconds_and_units() {
        let tb = Rational::per(48_000);
        assert_approx_eq!(tb.seconds(24_000), 0.5, 1e-12);
        assert_eq!(tb.units(1.5), 72_000);
    }

    #[test]
    fn test_mono_planar_is_same_shape() {
        let packed = AudioFormat::new(SampleFormat::S16, 48_000, 1);
        let planar = AudioFormat::new(SampleFormat::S16Planar, 48_000, 1);
        assert!(!packed.shape_differs(&planar));

        let stereo = AudioFormat::new(SampleFormat::S16, 48_000, 2);
        let stereo_planar = AudioFormat::new(SampleFormat::S16Planar, 48_000, 2);
        assert!(stereo.shape_differs(&stereo_planar));
        assert!(stereo.shape_differs(&AudioFormat::new(SampleFormat::S16, 44_100, 2)));
    }

    #[test]
    fn test_file_sources_allow_file_protocol() {
        let options = OpenOptions::default();
        assert_eq!(
            options.protocols_for(&SourceLocator::remote("https://example.com/a.ogg")),
            "http,https,tcp,tls,crypto"
        );
        assert_eq!(
            options.protocols_for(&SourceLocator::file("/tmp/a.ogg")),
            "http,https,tcp,tls,crypto,file"
        );
    }

    #[test]
    fn test_default_dictionary() {
        let dictionary = OpenOptions::default().dictionary();
        let get = |key: &str| {
            dictionary
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("reconnect"), Some("1"));
        assert_eq!(get("reconnect_delay_max"), Some("2"));
        assert_eq!(get("icy"), Some("0"));
        assert_eq!(get("scan_all_pmts"), Some("1"));
    }

    #[test]
    fn test_interrupt_is_shared() {
        let interrupt = Interrupt::new();
        let observer = interrupt.clone();
        assert!(!observer.is_triggered());
        interrupt.trigger();
        assert!(observer.is_triggered());
    }
}
