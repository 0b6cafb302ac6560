//! Encrypted datagram framing for direct network delivery.
//!
//! A [`SecureFramer`] wraps each outgoing audio packet in a 12-byte
//! RTP-style header and seals it with XSalsa20-Poly1305. The result can be
//! handed to the host or pushed straight to a peer over a [`UdpTransport`].
//!
//! # Frame layout
//!
//! | bytes | content |
//! |-------|---------|
//! | 0..2 | `0x80 0x78` |
//! | 2..4 | sequence, big-endian |
//! | 4..8 | timestamp, big-endian |
//! | 8..12 | stream id, big-endian |
//! | 12.. | tag, ciphertext, then the nonce-mode trailer |

pub mod error;
pub mod framer;
pub mod sealer;
pub mod transport;

pub use error::{FramerError, FramerResult};
pub use framer::{DEFAULT_CAPACITY, FrameHeader, FramerCounters, HEADER_LEN, NonceMode, SecureFramer};
pub use sealer::{SecretBoxSealer, Sealer};
pub use transport::UdpTransport;
