//! RTP-style header assembly, nonce selection and sealing.

use super::error::{FramerError, FramerResult};
use super::sealer::{NONCE_LEN, SecretBoxSealer, Sealer};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Length of the transport header.
pub const HEADER_LEN: usize = 12;
/// Default scratch buffer capacity.
pub const DEFAULT_CAPACITY: usize = 8192;

const VERSION_FLAGS: u8 = 0x80;
const PAYLOAD_TYPE: u8 = 0x78;

/// How the nonce for each frame is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum NonceMode {
    /// The header itself, zero-padded to 24 bytes. Nothing is appended.
    #[default]
    Implicit = 0,
    /// A 32-bit counter, zero-padded; appended as a 4-byte trailer.
    Counter = 1,
    /// 24 fresh random bytes; appended in full.
    RandomSuffix = 2,
}

impl NonceMode {
    /// Map a raw host value; unknown values select [`NonceMode::Implicit`].
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => NonceMode::Counter,
            2 => NonceMode::RandomSuffix,
            _ => NonceMode::Implicit,
        }
    }

    /// Bytes appended after the sealed payload.
    pub fn trailer_len(self) -> usize {
        match self {
            NonceMode::Implicit => 0,
            NonceMode::Counter => 4,
            NonceMode::RandomSuffix => NONCE_LEN,
        }
    }
}

/// The mutable counters of a [`SecureFramer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FramerCounters {
    /// Sequence number of the last frame.
    pub sequence: u16,
    /// Timestamp of the last frame.
    pub timestamp: u32,
    /// Nonce counter of the last frame in counter mode.
    pub nonce: u32,
}

/// A decoded transport header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Wrapping sequence number.
    pub sequence: u16,
    /// Wrapping timestamp in output samples.
    pub timestamp: u32,
    /// Stream identifier.
    pub ssrc: u32,
}

impl FrameHeader {
    /// Parse the first [`HEADER_LEN`] bytes of `frame`.
    pub fn parse(frame: &[u8]) -> Option<Self> {
        let header = frame.get(..HEADER_LEN)?;
        if header[0] != VERSION_FLAGS || header[1] != PAYLOAD_TYPE {
            return None;
        }
        Some(Self {
            sequence: u16::from_be_bytes([header[2], header[3]]),
            timestamp: u32::from_be_bytes([header[4], header[5], header[6], header[7]]),
            ssrc: u32::from_be_bytes([header[8], header[9], header[10], header[11]]),
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.push(VERSION_FLAGS);
        out.push(PAYLOAD_TYPE);
        out.extend_from_slice(&self.sequence.to_be_bytes());
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        out.extend_from_slice(&self.ssrc.to_be_bytes());
    }
}

/// Produces encrypted, header-framed datagrams from audio packets.
///
/// Each frame is `header || tag || ciphertext || trailer`, where the trailer
/// depends on the [`NonceMode`]. Counters advance only for frames that were
/// actually produced.
///
/// # Example
///
/// ```rust,ignore
/// let mut framer = SecureFramer::new(&key, NonceMode::Counter, 0x1234)?;
/// let datagram = framer.seal(&opus_packet, 960)?;
/// socket.send(datagram)?;
/// ```
pub struct SecureFramer {
    sealer: Box<dyn Sealer>,
    mode: NonceMode,
    ssrc: u32,
    counters: FramerCounters,
    capacity: usize,
    buffer: Vec<u8>,
}

impl SecureFramer {
    /// Create a framer with the default capacity.
    pub fn new(key: &[u8], mode: NonceMode, ssrc: u32) -> FramerResult<Self> {
        Self::with_capacity(key, mode, ssrc, DEFAULT_CAPACITY)
    }

    /// Create a framer whose frames may not exceed `capacity` bytes.
    pub fn with_capacity(key: &[u8], mode: NonceMode, ssrc: u32, capacity: usize) -> FramerResult<Self> {
        Ok(Self::with_sealer(
            Box::new(SecretBoxSealer::new(key)?),
            mode,
            ssrc,
            capacity,
        ))
    }

    /// Create a framer around any [`Sealer`].
    pub fn with_sealer(sealer: Box<dyn Sealer>, mode: NonceMode, ssrc: u32, capacity: usize) -> Self {
        Self {
            sealer,
            mode,
            ssrc,
            counters: FramerCounters::default(),
            capacity,
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Replace key, mode and stream id, and reset every counter.
    pub fn configure(&mut self, key: &[u8], mode: NonceMode, ssrc: u32) -> FramerResult<()> {
        self.sealer = Box::new(SecretBoxSealer::new(key)?);
        self.mode = mode;
        self.ssrc = ssrc;
        self.counters = FramerCounters::default();
        Ok(())
    }

    /// Overwrite the counters, e.g. to continue another sender's sequence.
    pub fn update(&mut self, counters: FramerCounters) {
        self.counters = counters;
    }

    /// Current counters.
    pub fn counters(&self) -> FramerCounters {
        self.counters
    }

    /// The nonce mode.
    pub fn mode(&self) -> NonceMode {
        self.mode
    }

    /// The stream id written into every header.
    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    /// Largest frame this framer produces.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Seal `payload`, advancing the timestamp by `duration` samples.
    ///
    /// Returns the frame, valid until the next call. A frame that would exceed
    /// the capacity fails with [`FramerError::BufferTooSmall`] and leaves the
    /// counters untouched.
    pub fn seal(&mut self, payload: &[u8], duration: u32) -> FramerResult<&[u8]> {
        let required = HEADER_LEN + payload.len() + self.sealer.overhead() + self.mode.trailer_len();
        if required > self.capacity {
            return Err(FramerError::BufferTooSmall {
                required,
                capacity: self.capacity,
            });
        }

        let header = FrameHeader {
            sequence: self.counters.sequence.wrapping_add(1),
            timestamp: self.counters.timestamp.wrapping_add(duration),
            ssrc: self.ssrc,
        };
        let nonce_counter = match self.mode {
            NonceMode::Counter => self.counters.nonce.wrapping_add(1),
            _ => self.counters.nonce,
        };

        self.buffer.clear();
        header.write(&mut self.buffer);

        let mut nonce = [0u8; NONCE_LEN];
        match self.mode {
            NonceMode::Implicit => nonce[..HEADER_LEN].copy_from_slice(&self.buffer[..HEADER_LEN]),
            NonceMode::Counter => nonce[..4].copy_from_slice(&nonce_counter.to_be_bytes()),
            NonceMode::RandomSuffix => OsRng.fill_bytes(&mut nonce),
        }

        self.sealer.seal(&nonce, payload, &mut self.buffer)?;
        match self.mode {
            NonceMode::Implicit => {}
            NonceMode::Counter => self.buffer.extend_from_slice(&nonce_counter.to_be_bytes()),
            NonceMode::RandomSuffix => self.buffer.extend_from_slice(&nonce),
        }

        self.counters = FramerCounters {
            sequence: header.sequence,
            timestamp: header.timestamp,
            nonce: nonce_counter,
        };
        trace!(
            sequence = header.sequence,
            timestamp = header.timestamp,
            len = self.buffer.len(),
            "frame sealed"
        );
        Ok(&self.buffer)
    }
}

impl std::fmt::Debug for SecureFramer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureFramer")
            .field("mode", &self.mode)
            .field("ssrc", &self.ssrc)
            .field("counters", &self.counters)
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::sealer::TAG_LEN;
    use super::*;
    use crypto_secretbox::{
        XSalsa20Poly1305,
        aead::{Aead, KeyInit, generic_array::GenericArray},
    };

    const KEY: [u8; 32] = [7u8; 32];

    fn open(frame_body: &[u8], nonce: &[u8; NONCE_LEN]) -> Vec<u8> {
        let cipher = XSalsa20Poly1305::new_from_slice(&KEY).unwrap();
        cipher
            .decrypt(GenericArray::from_slice(nonce), frame_body)
            .unwrap()
    }

    #[test]
    fn test_counter_mode_layout_and_decrypt() {
        let mut framer = SecureFramer::new(&KEY, NonceMode::Counter, 0xDEAD_BEEF).unwrap();
        let payload = [0xFC, 1, 2, 3, 4];

        let frame = framer.seal(&payload, 960).unwrap().to_vec();
        assert_eq!(frame.len(), HEADER_LEN + TAG_LEN + payload.len() + 4);

        let header = FrameHeader::parse(&frame).unwrap();
        assert_eq!(header.sequence, 1);
        assert_eq!(header.timestamp, 960);
        assert_eq!(header.ssrc, 0xDEAD_BEEF);
        assert_eq!(&frame[frame.len() - 4..], &1u32.to_be_bytes());

        let mut nonce = [0u8; NONCE_LEN];
        nonce[..4].copy_from_slice(&1u32.to_be_bytes());
        assert_eq!(open(&frame[HEADER_LEN..frame.len() - 4], &nonce), payload);
    }

    #[test]
    fn test_implicit_mode_uses_header_as_nonce() {
        let mut framer = SecureFramer::new(&KEY, NonceMode::Implicit, 42).unwrap();
        let frame = framer.seal(b"opus", 480).unwrap().to_vec();
        assert_eq!(frame.len(), HEADER_LEN + TAG_LEN + 4);

        let mut nonce = [0u8; NONCE_LEN];
        nonce[..HEADER_LEN].copy_from_slice(&frame[..HEADER_LEN]);
        assert_eq!(open(&frame[HEADER_LEN..], &nonce), b"opus");
    }

    #[test]
    fn test_random_suffix_appends_nonce() {
        let mut framer = SecureFramer::new(&KEY, NonceMode::RandomSuffix, 42).unwrap();
        let first = framer.seal(b"opus", 960).unwrap().to_vec();
        let second = framer.seal(b"opus", 960).unwrap().to_vec();

        let suffix = |frame: &[u8]| -> [u8; NONCE_LEN] {
            frame[frame.len() - NONCE_LEN..].try_into().unwrap()
        };
        assert_ne!(suffix(&first), suffix(&second));

        let nonce = suffix(&first);
        assert_eq!(open(&first[HEADER_LEN..first.len() - NONCE_LEN], &nonce), b"opus");
        assert_eq!(framer.counters().nonce, 0);
    }

    #[test]
    fn test_counters_wrap() {
        let mut framer = SecureFramer::new(&KEY, NonceMode::Counter, 1).unwrap();
        framer.update(FramerCounters {
            sequence: u16::MAX,
            timestamp: u32::MAX - 100,
            nonce: u32::MAX,
        });

        let frame = framer.seal(b"x", 960).unwrap().to_vec();
        let header = FrameHeader::parse(&frame).unwrap();
        assert_eq!(header.sequence, 0);
        assert_eq!(header.timestamp, 859);
        assert_eq!(framer.counters().nonce, 0);
    }

    #[test]
    fn test_oversized_frame_skipped_without_advancing() {
        let mut framer = SecureFramer::with_capacity(&KEY, NonceMode::Counter, 1, 64).unwrap();
        framer.seal(&[0u8; 8], 960).unwrap();
        let before = framer.counters();

        let err = framer.seal(&[0u8; 64], 960).unwrap_err();
        assert!(matches!(err, FramerError::BufferTooSmall { capacity: 64, .. }));
        assert!(err.is_recoverable());
        assert_eq!(framer.counters(), before);

        // The boundary case fits exactly.
        let fits = 64 - HEADER_LEN - TAG_LEN - 4;
        assert_eq!(framer.seal(&vec![0u8; fits], 960).unwrap().len(), 64);
    }

    #[test]
    fn test_configure_resets_counters() {
        let mut framer = SecureFramer::new(&KEY, NonceMode::Counter, 1).unwrap();
        framer.seal(b"x", 960).unwrap();
        framer.configure(&[1u8; 16], NonceMode::Implicit, 2).unwrap();

        assert_eq!(framer.counters(), FramerCounters::default());
        assert_eq!(framer.mode(), NonceMode::Implicit);
        assert_eq!(framer.ssrc(), 2);
    }

    #[test]
    fn test_unknown_mode_is_implicit() {
        assert_eq!(NonceMode::from_raw(7), NonceMode::Implicit);
        assert_eq!(NonceMode::from_raw(1), NonceMode::Counter);
        assert_eq!(NonceMode::from_raw(2), NonceMode::RandomSuffix);
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(
            SecureFramer::new(&[], NonceMode::Counter, 1),
            Err(FramerError::NoKey)
        ));
    }
}
