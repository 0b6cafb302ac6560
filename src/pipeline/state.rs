//! Player lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Where a player is in its lifecycle.
///
/// `Idle -> Opening -> Ready -> Running <-> Paused`, with `Seeking` and
/// `Reconfiguring` as short sub-states of `Running`. `Finished`, `Error` and
/// `Destroyed` can follow any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PlayerState {
    /// No run in progress; waiting for `start`.
    Idle = 0,
    /// Opening the source and codecs.
    Opening = 1,
    /// Source opened; `ready` is being delivered.
    Ready = 2,
    /// Producing packets.
    Running = 3,
    /// Suspended by the host.
    Paused = 4,
    /// Applying a seek.
    Seeking = 5,
    /// Rebuilding the filter graph or reopening the encoder.
    Reconfiguring = 6,
    /// End of stream reached; waiting for seek, restart, stop or destroy.
    Finished = 7,
    /// A fatal error is being reported.
    Error = 8,
    /// Torn down; no further signals.
    Destroyed = 9,
}

impl PlayerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => PlayerState::Idle,
            1 => PlayerState::Opening,
            2 => PlayerState::Ready,
            3 => PlayerState::Running,
            4 => PlayerState::Paused,
            5 => PlayerState::Seeking,
            6 => PlayerState::Reconfiguring,
            7 => PlayerState::Finished,
            8 => PlayerState::Error,
            _ => PlayerState::Destroyed,
        }
    }

    /// Whether the worker is inside a run.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            PlayerState::Opening
                | PlayerState::Ready
                | PlayerState::Running
                | PlayerState::Paused
                | PlayerState::Seeking
                | PlayerState::Reconfiguring
                | PlayerState::Finished
        )
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerState::Idle => "idle",
            PlayerState::Opening => "opening",
            PlayerState::Ready => "ready",
            PlayerState::Running => "running",
            PlayerState::Paused => "paused",
            PlayerState::Seeking => "seeking",
            PlayerState::Reconfiguring => "reconfiguring",
            PlayerState::Finished => "finished",
            PlayerState::Error => "error",
            PlayerState::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// Lock-free cell holding a [`PlayerState`].
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new(state: PlayerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn get(&self) -> PlayerState {
        PlayerState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Store `state` unless the player is already destroyed.
    pub(crate) fn set(&self, state: PlayerState) {
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != PlayerState::Destroyed as u8).then_some(state as u8)
            });
    }

    pub(crate) fn destroy(&self) {
        self.0.store(PlayerState::Destroyed as u8, Ordering::Release);
    }
}
