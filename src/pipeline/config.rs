//! Player configuration.

use crate::codec::{AudioFormat, CodecId, OpenOptions, SampleFormat};
use crate::framing::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};

/// The encoded output a player produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFormat {
    /// Output codec.
    pub codec: CodecId,
    /// Output channel count.
    pub channels: u16,
    /// Output sample rate.
    pub sample_rate: u32,
    /// Target bitrate in bits per second.
    pub bitrate: u32,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            codec: CodecId::Opus,
            channels: 2,
            sample_rate: 48_000,
            bitrate: 64_000,
        }
    }
}

impl OutputFormat {
    /// Opus at 48 kHz with the given channels and bitrate.
    pub fn opus(channels: u16, bitrate: u32) -> Self {
        Self {
            channels,
            bitrate,
            ..Self::default()
        }
    }

    /// Mono voice-grade Opus.
    pub fn voice() -> Self {
        Self::opus(1, 32_000)
    }

    /// Stereo music-grade Opus.
    pub fn music() -> Self {
        Self::opus(2, 128_000)
    }

    /// The shape frames must have when they reach the encoder.
    pub fn encoder_format(&self) -> AudioFormat {
        AudioFormat::new(SampleFormat::F32, self.sample_rate, self.channels)
    }
}

/// Configuration for a [`Player`](super::Player).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Initial output format.
    pub output: OutputFormat,
    /// Options passed to the demuxer when opening a source.
    pub open: OpenOptions,
    /// Largest secure frame in bytes.
    pub framer_capacity: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            output: OutputFormat::default(),
            open: OpenOptions::default(),
            framer_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl PlayerConfig {
    /// Default configuration with a different output format.
    pub fn with_output(output: OutputFormat) -> Self {
        Self {
            output,
            ..Self::default()
        }
    }
}
