//! Cipher error types.

use carapace_backend::BackendError;
use thiserror::Error;

/// Cipher errors
///
/// Precondition violations (wrong buffer lengths, nonce reuse in TLS mode,
/// oversized input) are not represented here: they panic.
#[derive(Debug, Error)]
pub enum CipherError {
    /// A backend call failed
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The provider reported a malformed key-length table
    #[error("invalid key length table: min {min}, max {max}, increment {increment}")]
    InvalidKeyLengths {
        /// Reported minimum
        min: u32,
        /// Reported maximum
        max: u32,
        /// Reported increment
        increment: u32,
    },

    /// The key size is not allowed by the provider
    #[error("invalid key size: {bits} bits")]
    InvalidKeySize {
        /// Key length in bits
        bits: u32,
    },

    /// The provider reported a block length the mode cannot use
    #[error("invalid block size: {0} bytes")]
    InvalidBlockSize(usize),

    /// A property value could not be interpreted
    #[error("malformed property: {0}")]
    MalformedProperty(&'static str),

    /// Nonce size and tag size are both non-standard
    #[error("GCM tag and nonce size can't be non-standard at the same time")]
    UnsupportedGcmParameters,

    /// Nonce size rejected at construction
    #[error("invalid GCM nonce size: {0}")]
    InvalidNonceSize(usize),

    /// Tag size rejected at construction
    #[error("invalid GCM tag size: {0}")]
    InvalidTagSize(usize),

    /// AEAD open failed; no plaintext was released
    #[error("message authentication failed")]
    Authentication,
}

#[cfg(test)]
mod tests {
    use super::*;
    use carapace_backend::Status;

    #[test]
    fn test_backend_error_is_transparent() {
        let err: CipherError = BackendError::new("ImportKey", Status::InvalidParameter).into();
        assert!(matches!(err, CipherError::Backend(_)));
        assert!(err.to_string().starts_with("ImportKey failed"));
    }

    #[test]
    fn test_authentication_message() {
        assert_eq!(
            CipherError::Authentication.to_string(),
            "message authentication failed"
        );
    }
}
