//! Opus packet framing metadata read straight from the TOC byte (RFC 6716 §3.1).

/// Opus always runs at 48 kHz.
pub const OPUS_SAMPLE_RATE: u32 = 48_000;

/// Framing information carried by one Opus packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpusPacketInfo {
    /// Coded channel count.
    pub channels: u16,
    /// Samples per frame at 48 kHz.
    pub samples_per_frame: u32,
    /// Frames in the packet.
    pub frame_count: u32,
}

impl OpusPacketInfo {
    /// Parse the TOC byte, and the frame-count byte for code 3 packets.
    ///
    /// Returns `None` for an empty packet, a code 3 packet without its count
    /// byte, or a frame count of zero.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let toc = *data.first()?;

        let channels = if toc & 0x04 != 0 { 2 } else { 1 };
        let frame_count = match toc & 0x03 {
            0 => 1,
            1 | 2 => 2,
            _ => u32::from(*data.get(1)? & 0x3F),
        };
        if frame_count == 0 {
            return None;
        }

        Some(Self {
            channels,
            samples_per_frame: samples_per_frame(toc, OPUS_SAMPLE_RATE),
            frame_count,
        })
    }

    /// Total samples per channel in the packet.
    pub fn samples(&self) -> u32 {
        self.samples_per_frame * self.frame_count
    }
}

/// Samples per frame encoded by `toc`, at sampling rate `fs`.
pub fn samples_per_frame(toc: u8, fs: u32) -> u32 {
    let size = u32::from((toc >> 3) & 0x03);
    if toc & 0x80 != 0 {
        // CELT-only: 2.5, 5, 10 or 20 ms.
        (fs << size) / 400
    } else if toc & 0x60 == 0x60 {
        // Hybrid: 10 or 20 ms.
        if toc & 0x08 != 0 { fs / 50 } else { fs / 100 }
    } else if size == 3 {
        // SILK-only 60 ms.
        fs * 60 / 1000
    } else {
        (fs << size) / 100
    }
}
