// Correctness and logic
#![warn(clippy::unit_cmp)] // Detects comparing unit types
#![warn(clippy::match_same_arms)]
// Duplicate match arms

// Performance-focused
#![warn(clippy::inefficient_to_string)] // `format!("{}", x)` vs `x.to_string()`
#![warn(clippy::map_clone)] // Cloning inside `map()` unnecessarily
#![warn(clippy::unnecessary_to_owned)] // Detects redundant `.to_owned()` or `.clone()`
#![warn(clippy::large_stack_arrays)] // Helps avoid stack overflows
#![warn(clippy::box_collection)] // Warns on boxed `Vec`, `String`, etc.
#![warn(clippy::needless_collect)] // Avoids `.collect().iter()` chains

// Style and idiomatic Rust
#![warn(clippy::redundant_clone)] // Detects unnecessary `.clone()`
#![warn(clippy::identity_op)] // e.g., `x + 0`, `x * 1`
#![warn(clippy::needless_return)] // Avoids `return` at the end of functions
#![warn(clippy::let_unit_value)] // Avoids binding `()` to variables
#![warn(clippy::manual_map)] // Use `.map()` instead of manual `match`
#![warn(clippy::unwrap_used)] // Avoids using `unwrap()`

// Maintainability
#![warn(clippy::missing_panics_doc)] // Docs for functions that might panic
#![warn(clippy::missing_safety_doc)] // Docs for `unsafe` functions
#![deny(missing_docs)] // Documentation is a must for release

//! # AudioRelay
//!
//! Real-time relay of audio sources as paced, optionally encrypted packets.
//!
//! A host application (a voice bot, a radio server) runs one event loop. For
//! every stream it creates a [`Player`], which opens a source on its own
//! worker thread and delivers the source's audio back to the host as encoded
//! packets at real-time speed.
//!
//! ## Overview
//!
//! - [`mailbox`]: cross-thread signaling from any number of worker threads to
//!   one host loop, with coalesced wake-ups and delivery waits
//! - [`pipeline`]: the per-stream engine: pass-through or transcode, live
//!   effects, drift-compensated pacing, seek, pause, bitrate changes
//! - [`registry`]: the set of live worker threads, joined on shutdown
//! - [`framing`]: RTP-style headers sealed with XSalsa20-Poly1305 and optional
//!   UDP delivery
//! - [`effects`]: typed effect values that assemble into a filter chain
//! - [`codec`]: the seam to the media library doing the actual demuxing,
//!   decoding, filtering and encoding
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use audio_relay::{EventLoop, HostContext, Signal};
//! use std::time::Duration;
//!
//! let events = EventLoop::new();
//! let host = HostContext::new(events.wake_source(), backend);
//! let (sender, signals) = crossbeam::channel::unbounded();
//!
//! let player = host.player(sender);
//! player.open("https://radio.example.com/live.ogg", false);
//! player.set_secret_box(&key, NonceMode::Counter, ssrc)?;
//! player.connect("203.0.113.7", 50004)?;
//! player.start()?;
//!
//! loop {
//!     events.run_once(Duration::from_millis(100));
//!     for signal in signals.try_iter() {
//!         match signal {
//!             Signal::Packet(packet) => send_to_peer(&packet.data),
//!             Signal::Error(error) if error.is_retryable() => schedule_retry(),
//!             Signal::Finish | Signal::Error(_) => return,
//!             _ => {}
//!         }
//!     }
//! }
//! ```
//!
//! ## Threading
//!
//! Signals are delivered on whichever thread drains the mailbox, normally
//! the event-loop thread. A worker waits until each of its signals has been
//! delivered before producing the next one, so a slow host slows its streams
//! down instead of queueing without bound. [`Player::destroy`] releases a
//! worker from any wait; [`HostContext::shutdown`] joins every worker.
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and installs no subscriber. Each worker
//! runs inside a `stream` span carrying its worker id.
//!
//! ## Testing
//!
//! The `testing` feature exposes [`codec::testing`], a scripted in-memory
//! media backend that drives players without a real media library.

pub mod codec;
pub mod effects;
mod error;
pub mod framing;
pub mod mailbox;
pub mod pipeline;
pub mod registry;

pub use crate::codec::{CodecError, CodecId, CodecResult, MediaBackend, OpenOptions};
pub use crate::effects::{Effect, EffectError, EffectKind, EffectResult, EffectSet, EqualizerBand};
pub use crate::error::{RelayError, RelayResult};
pub use crate::framing::{
    FrameHeader, FramerCounters, FramerError, FramerResult, NonceMode, SecureFramer, UdpTransport,
};
pub use crate::mailbox::{EventLoop, MailboxContext, MailboxError, MailboxResult, Message};
pub use crate::pipeline::{
    HostContext, OutboundPacket, OutputFormat, Player, PlayerConfig, PlayerError, PlayerEvents,
    PlayerResult, PlayerState, Signal,
};
pub use crate::registry::{StreamRegistry, WorkerId};
