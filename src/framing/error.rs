//! Error types for secure framing and direct transport.

/// Framing-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum FramerError {
    /// The sealed frame would not fit the scratch buffer.
    #[error("Frame of {required} bytes exceeds buffer capacity of {capacity}")]
    BufferTooSmall {
        /// Bytes the sealed frame needs.
        required: usize,
        /// Bytes the buffer holds.
        capacity: usize,
    },

    /// No key has been configured.
    #[error("No secret key configured")]
    NoKey,

    /// The cipher rejected the input.
    #[error("Sealing failed")]
    Seal,

    /// Datagram socket failure
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The peer address could not be parsed.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

impl FramerError {
    /// Numeric error code in FFmpeg's convention.
    pub fn code(&self) -> i32 {
        match self {
            // AVERROR_BUFFER_TOO_SMALL
            Self::BufferTooSmall { .. } => -0x5346_5542,
            Self::NoKey | Self::Seal | Self::InvalidAddress(_) => -22,
            Self::Transport(err) => err.raw_os_error().map_or(-5, |code| -code),
        }
    }

    /// Check if this error only affects the current packet
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::BufferTooSmall { .. } | Self::Seal | Self::Transport(_)
        )
    }

    /// Check if this is a fatal error that should terminate the stream
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

impl Clone for FramerError {
    fn clone(&self) -> Self {
        match self {
            Self::BufferTooSmall { required, capacity } => Self::BufferTooSmall {
                required: *required,
                capacity: *capacity,
            },
            Self::NoKey => Self::NoKey,
            Self::Seal => Self::Seal,
            Self::Transport(err) => Self::Transport(std::io::Error::new(err.kind(), err.to_string())),
            Self::InvalidAddress(address) => Self::InvalidAddress(address.clone()),
        }
    }
}

/// Result type for framing operations
pub type FramerResult<T> = Result<T, FramerError>;
