//! The per-stream relay engine.
//!
//! A [`Player`] owns one worker thread that opens a source, forwards or
//! transcodes its audio track, paces the output to real time and hands every
//! packet to the host through the mailbox. The host steers the worker with
//! commands that are applied at the worker's next safe point.
//!
//! # Features
//!
//! - **Pass-through**: packets already in the output codec and shape are
//!   forwarded without decoding
//! - **Live effects**: rate, tempo, tremolo, volume and equalizer changes
//!   rebuild the filter graph only when its description changes
//! - **Drift-free pacing**: deadlines advance by packet duration, and lateness
//!   is counted instead of caught up
//! - **Secure framing**: packets can be sealed and sent as datagrams
//!
//! # Example
//!
//! ```rust,ignore
//! use audio_relay::pipeline::*;
//!
//! let events = EventLoop::new();
//! let host = HostContext::new(events.wake_source(), backend);
//! let (sender, signals) = crossbeam::channel::unbounded();
//!
//! let player = host.player(sender);
//! player.open("/music/track.opus", true);
//! player.start()?;
//!
//! events.run_until(Duration::from_secs(10), || {
//!     matches!(signals.try_recv(), Ok(Signal::Finish))
//! });
//! player.destroy();
//! host.shutdown();
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod pacer;
pub mod player;
mod session;
mod shared;
pub mod state;
mod worker;

pub use config::{OutputFormat, PlayerConfig};
pub use context::HostContext;
pub use error::{PlayerError, PlayerResult};
pub use events::{OutboundPacket, PlayerEvents, Signal};
pub use pacer::{Pace, Pacer};
pub use player::Player;
pub use state::PlayerState;

#[cfg(test)]
mod tests;
