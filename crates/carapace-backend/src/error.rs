//! Backend status codes and error types.

use thiserror::Error;

/// Status reported by a backend call.
///
/// Each variant maps to the NTSTATUS-style code a native provider would
/// return, so callers that log or compare raw codes keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Status {
    /// The requested algorithm is not provided by this backend
    #[error("algorithm not found")]
    NotFound,

    /// A parameter was rejected (key size, nonce size, property value)
    #[error("invalid parameter")]
    InvalidParameter,

    /// The handle is unknown, already closed or of the wrong kind
    #[error("invalid handle")]
    InvalidHandle,

    /// The property or mode is not supported
    #[error("not supported")]
    NotSupported,

    /// The output buffer cannot hold the result
    #[error("buffer too small")]
    BufferTooSmall,

    /// The input length is not acceptable for the operation
    #[error("invalid buffer size")]
    InvalidBufferSize,

    /// AEAD tag verification failed
    #[error("authentication tag mismatch")]
    AuthTagMismatch,
}

impl Status {
    /// Raw status code as a native provider would report it.
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::NotFound => 0xC000_0225,
            Self::InvalidParameter => 0xC000_000D,
            Self::InvalidHandle => 0xC000_0008,
            Self::NotSupported => 0xC000_00BB,
            Self::BufferTooSmall => 0xC000_0023,
            Self::InvalidBufferSize => 0xC000_0206,
            Self::AuthTagMismatch => 0xC000_A002,
        }
    }
}

/// A failed backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{operation} failed: {status} (0x{code:08X})", code = .status.code())]
pub struct BackendError {
    /// Backend operation that failed
    pub operation: &'static str,
    /// Status it returned
    pub status: Status,
}

impl BackendError {
    /// Create an error for `operation` with `status`.
    #[must_use]
    pub fn new(operation: &'static str, status: Status) -> Self {
        Self { operation, status }
    }
}

/// Errors raised while loading or validating a [`SoftConfig`](crate::SoftConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the configuration file failed
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML document could not be parsed
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be serialized
    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is outside the range the backend can honour
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_are_distinct() {
        let all = [
            Status::NotFound,
            Status::InvalidParameter,
            Status::InvalidHandle,
            Status::NotSupported,
            Status::BufferTooSmall,
            Status::InvalidBufferSize,
            Status::AuthTagMismatch,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.code(), b.code());
            }
        }
    }

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::new("OpenAlgorithmProvider", Status::NotFound);
        let msg = err.to_string();
        assert!(msg.contains("OpenAlgorithmProvider"));
        assert!(msg.contains("algorithm not found"));
        assert!(msg.contains("0xC0000225"));
    }
}
