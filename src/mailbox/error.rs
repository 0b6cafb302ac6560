//! Error types for mailbox operations.

/// Mailbox-specific error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailboxError {
    /// The message was sent before it was registered with its context, or after
    /// it was unregistered.
    #[error("Message is not registered with a mailbox context")]
    NotRegistered,

    /// The sender count would overflow.
    #[error("Too many registered senders ({0})")]
    TooManySenders(usize),

    /// The host loop could not create its wake primitive.
    #[error("Wake primitive unavailable: {0}")]
    WakeUnavailable(String),

    /// The host loop that owned the wake primitive has shut down.
    #[error("Host loop closed")]
    HostClosed,
}

impl MailboxError {
    /// Create a wake-unavailable error
    pub fn wake_unavailable(reason: impl Into<String>) -> Self {
        Self::WakeUnavailable(reason.into())
    }
}

/// Result type for mailbox operations
pub type MailboxResult<T> = Result<T, MailboxError>;
