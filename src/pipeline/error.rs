//! Error types for player operations.

use crate::codec::CodecError;
use crate::codec::error::AVERROR_STREAM_NOT_FOUND;
use crate::effects::EffectError;
use crate::framing::FramerError;
use crate::mailbox::MailboxError;

const EINVAL: i32 = -22;
const EAGAIN: i32 = -11;
const EIO: i32 = -5;

/// Player-specific error types.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlayerError {
    /// The source could not be opened.
    #[error("{message}")]
    Open {
        /// Host-facing description.
        message: String,
        /// Backend failure behind it.
        #[source]
        cause: CodecError,
    },

    /// The source has no audio track.
    #[error("No audio stream found")]
    NoAudioTrack,

    /// `start` was called before a source was set.
    #[error("No source set")]
    NoSource,

    /// The player was destroyed.
    #[error("Player destroyed")]
    Destroyed,

    /// Decoding, filtering or encoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The host mailbox could not be used.
    #[error("Could not create thread communicator: {0}")]
    Mailbox(#[from] MailboxError),

    /// An effect value was rejected.
    #[error(transparent)]
    Effect(#[from] EffectError),

    /// Secure framing or transport failed.
    #[error(transparent)]
    Framer(#[from] FramerError),

    /// The worker thread could not be created.
    #[error("Could not create thread: {0}")]
    Spawn(String),
}

impl PlayerError {
    /// Wrap a failure to open the source, with a host-facing message.
    pub fn open(cause: CodecError) -> Self {
        let message = match &cause {
            CodecError::InvalidInput(_) => "Invalid input file".to_string(),
            CodecError::Io(_) => "Could not open input file".to_string(),
            other => other.to_string(),
        };
        Self::Open { message, cause }
    }

    /// Create a thread spawn error
    pub fn spawn(err: std::io::Error) -> Self {
        Self::Spawn(err.to_string())
    }

    /// Numeric code carried by the error signal.
    pub fn code(&self) -> i32 {
        match self {
            Self::Open { cause, .. } | Self::Codec(cause) => cause.code(),
            Self::NoAudioTrack => AVERROR_STREAM_NOT_FOUND,
            Self::NoSource | Self::Effect(_) => EINVAL,
            Self::Destroyed => CodecError::Exit.code(),
            Self::Mailbox(_) => EIO,
            Self::Framer(err) => err.code(),
            Self::Spawn(_) => EAGAIN,
        }
    }

    /// Whether the host may retry the same source later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Open { cause, .. } | Self::Codec(cause) => cause.is_retryable(),
            _ => false,
        }
    }

    /// Whether this is a state transition rather than a failure.
    pub fn is_control_flow(&self) -> bool {
        match self {
            Self::Codec(cause) => cause.is_control_flow(),
            Self::Destroyed => true,
            _ => false,
        }
    }
}

/// Result type for player operations
pub type PlayerResult<T> = Result<T, PlayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_messages() {
        let invalid = PlayerError::open(CodecError::invalid_input("moov atom not found"));
        assert_eq!(invalid.to_string(), "Invalid input file");
        assert_eq!(invalid.code(), -22);
        assert!(!invalid.is_retryable());

        let missing = PlayerError::open(CodecError::io("connection refused"));
        assert_eq!(missing.to_string(), "Could not open input file");

        let forbidden = PlayerError::open(CodecError::http(403));
        assert!(forbidden.is_retryable());
        assert_eq!(forbidden.code(), CodecError::http(403).code());
    }

    #[test]
    fn test_control_flow() {
        assert!(PlayerError::Codec(CodecError::Exit).is_control_flow());
        assert!(PlayerError::Destroyed.is_control_flow());
        assert!(!PlayerError::NoAudioTrack.is_control_flow());
        assert!(!PlayerError::Codec(CodecError::fatal(-1, "boom")).is_control_flow());
    }
}
