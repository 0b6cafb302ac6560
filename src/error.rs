//! Crate-level error type.

use crate::codec::CodecError;
use crate::effects::EffectError;
use crate::framing::FramerError;
use crate::mailbox::MailboxError;
use crate::pipeline::PlayerError;
use thiserror::Error;

/// Convenience type alias for results that may contain a [`RelayError`].
pub type RelayResult<T> = Result<T, RelayError>;

/// Any error the relay can produce.
///
/// Each module has its own error type; this enum lets applications that use
/// several modules propagate all of them with `?`.
#[derive(Error, Debug, Clone)]
pub enum RelayError {
    /// A mailbox operation failed.
    #[error(transparent)]
    Mailbox(#[from] MailboxError),

    /// The media backend failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// An effect value was rejected.
    #[error(transparent)]
    Effect(#[from] EffectError),

    /// Secure framing or datagram delivery failed.
    #[error(transparent)]
    Framer(#[from] FramerError),

    /// A player command or run failed.
    #[error(transparent)]
    Player(#[from] PlayerError),
}

impl RelayError {
    /// Numeric code in the media library's error space.
    pub fn code(&self) -> i32 {
        match self {
            Self::Codec(err) => err.code(),
            Self::Framer(err) => err.code(),
            Self::Player(err) => err.code(),
            Self::Mailbox(err) => PlayerError::from(err.clone()).code(),
            Self::Effect(err) => PlayerError::from(err.clone()).code(),
        }
    }

    /// Whether retrying the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Codec(err) => err.is_retryable(),
            Self::Player(err) => err.is_retryable(),
            Self::Framer(err) => err.is_recoverable(),
            Self::Mailbox(_) | Self::Effect(_) => false,
        }
    }
}
