//! Error types for the media backend seam.
//!
//! Numeric codes follow FFmpeg's `AVERROR` values, so hosts that already
//! interpret those codes can keep doing so.

/// Build an FFmpeg-style four-character error tag.
const fn fferrtag(a: u8, b: u8, c: u8, d: u8) -> i32 {
    -((a as i32) | ((b as i32) << 8) | ((c as i32) << 16) | ((d as i32) << 24))
}

const EAGAIN: i32 = -11;
const EIO: i32 = -5;
const EINVAL: i32 = -22;
const ENOSYS: i32 = -38;
const AVERROR_EOF: i32 = fferrtag(b'E', b'O', b'F', b' ');
const AVERROR_EXIT: i32 = fferrtag(b'E', b'X', b'I', b'T');
const AVERROR_HTTP_BAD_REQUEST: i32 = fferrtag(0xF8, b'4', b'0', b'0');
const AVERROR_HTTP_UNAUTHORIZED: i32 = fferrtag(0xF8, b'4', b'0', b'1');
const AVERROR_HTTP_FORBIDDEN: i32 = fferrtag(0xF8, b'4', b'0', b'3');
const AVERROR_HTTP_NOT_FOUND: i32 = fferrtag(0xF8, b'4', b'0', b'4');
const AVERROR_HTTP_OTHER_4XX: i32 = fferrtag(0xF8, b'4', b'X', b'X');
const AVERROR_HTTP_SERVER_ERROR: i32 = fferrtag(0xF8, b'5', b'X', b'X');
pub(crate) const AVERROR_STREAM_NOT_FOUND: i32 = fferrtag(0xF8, b'S', b'T', b'R');

/// Errors reported by demuxers, decoders, filter graphs and encoders.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Output is not available until more input is supplied.
    #[error("Resource temporarily unavailable")]
    Again,

    /// The source has no more packets.
    #[error("End of file")]
    Eof,

    /// A blocking operation was interrupted.
    #[error("Immediate exit requested")]
    Exit,

    /// The input could not be parsed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Reading from the source failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// The upstream server answered with an HTTP error status.
    #[error("Server returned HTTP {status}")]
    Http {
        /// Response status code.
        status: u16,
    },

    /// The backend cannot handle the requested codec or operation.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Any other backend failure, with the backend's own code.
    #[error("{message}")]
    Fatal {
        /// Backend error code.
        code: i32,
        /// Backend error text.
        message: String,
    },
}

impl CodecError {
    /// Create an invalid-input error
    pub fn invalid_input(details: impl Into<String>) -> Self {
        Self::InvalidInput(details.into())
    }

    /// Create an I/O error
    pub fn io(details: impl Into<String>) -> Self {
        Self::Io(details.into())
    }

    /// Create an HTTP status error
    pub fn http(status: u16) -> Self {
        Self::Http { status }
    }

    /// Create an unsupported-operation error
    pub fn unsupported(details: impl Into<String>) -> Self {
        Self::Unsupported(details.into())
    }

    /// Create a backend-specific error
    pub fn fatal(code: i32, message: impl Into<String>) -> Self {
        Self::Fatal {
            code,
            message: message.into(),
        }
    }

    /// Numeric error code in FFmpeg's convention.
    pub fn code(&self) -> i32 {
        match self {
            Self::Again => EAGAIN,
            Self::Eof => AVERROR_EOF,
            Self::Exit => AVERROR_EXIT,
            Self::InvalidInput(_) => EINVAL,
            Self::Io(_) => EIO,
            Self::Http { status } => match status {
                400 => AVERROR_HTTP_BAD_REQUEST,
                401 => AVERROR_HTTP_UNAUTHORIZED,
                403 => AVERROR_HTTP_FORBIDDEN,
                404 => AVERROR_HTTP_NOT_FOUND,
                402..=499 => AVERROR_HTTP_OTHER_4XX,
                500..=599 => AVERROR_HTTP_SERVER_ERROR,
                // Anything else is an unexpected reply, reported as plain I/O.
                _ => EIO,
            },
            Self::Unsupported(_) => ENOSYS,
            Self::Fatal { code, .. } => *code,
        }
    }

    /// Whether a host may reasonably retry opening the same source later.
    ///
    /// True for upstream HTTP client and server errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status } => (400..600).contains(status),
            Self::Fatal { code, .. } => matches!(
                *code,
                AVERROR_HTTP_BAD_REQUEST
                    | AVERROR_HTTP_UNAUTHORIZED
                    | AVERROR_HTTP_FORBIDDEN
                    | AVERROR_HTTP_NOT_FOUND
                    | AVERROR_HTTP_OTHER_4XX
                    | AVERROR_HTTP_SERVER_ERROR
            ),
            _ => false,
        }
    }

    /// Whether this is flow control rather than a failure.
    pub fn is_control_flow(&self) -> bool {
        matches!(self, Self::Again | Self::Eof | Self::Exit)
    }

    /// Check if this is a fatal error that should terminate the stream
    pub fn is_fatal(&self) -> bool {
        !self.is_control_flow()
    }
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_ffmpeg() {
        assert_eq!(CodecError::Eof.code(), -541_478_725);
        assert_eq!(CodecError::Exit.code(), -1_414_092_869);
        assert_eq!(CodecError::Again.code(), -11);
        assert_eq!(CodecError::http(404).code(), -875_574_520);
    }

    #[test]
    fn test_http_errors_are_retryable() {
        for status in [400, 401, 403, 404, 418, 500, 503] {
            assert!(CodecError::http(status).is_retryable(), "{status}");
        }
        assert!(CodecError::fatal(CodecError::http(403).code(), "forbidden").is_retryable());
        assert!(!CodecError::io("connection reset").is_retryable());
        assert!(!CodecError::invalid_input("garbage").is_retryable());
    }

    #[test]
    fn test_http_status_outside_error_range_maps_to_io() {
        assert_eq!(CodecError::http(302).code(), EIO);
        assert_eq!(CodecError::http(200).code(), EIO);
        assert!(!CodecError::http(302).is_retryable());
        assert_eq!(CodecError::http(418).code(), AVERROR_HTTP_OTHER_4XX);
        assert_eq!(CodecError::http(503).code(), AVERROR_HTTP_SERVER_ERROR);
    }

    #[test]
    fn test_control_flow_classification() {
        assert!(CodecError::Eof.is_control_flow());
        assert!(CodecError::Exit.is_control_flow());
        assert!(!CodecError::Eof.is_fatal());
        assert!(CodecError::unsupported("vp9").is_fatal());
    }
}
