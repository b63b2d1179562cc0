//! Algorithm identifiers, property names and property marshaling.
//!
//! Properties travel as raw byte blobs. Integers are little-endian `u32`,
//! strings are NUL-terminated UTF-16LE, and the key-length table is three
//! consecutive `u32` values (`min`, `max`, `increment`), matching the layout
//! native providers use.

use crate::{Backend, BackendError, RawHandle, Status};
use serde::{Deserialize, Serialize};

/// AES algorithm identifier.
pub const AES_ALGORITHM: &str = "AES";

/// Chaining mode property (string).
pub const CHAINING_MODE: &str = "ChainingMode";

/// Allowed key lengths property ([`KeyLengths`]).
pub const KEY_LENGTHS: &str = "KeyLengths";

/// Key length in bits of a key object (`u32`).
pub const KEY_LENGTH: &str = "KeyLength";

/// Block length in bytes (`u32`).
pub const BLOCK_LENGTH: &str = "BlockLength";

/// Chaining mode of an algorithm provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChainingMode {
    /// Electronic codebook: raw single-block transform
    Ecb,
    /// Cipher block chaining
    Cbc,
    /// Galois/counter mode (AEAD)
    Gcm,
}

impl ChainingMode {
    /// Property value selecting this mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ecb => "ChainingModeECB",
            Self::Cbc => "ChainingModeCBC",
            Self::Gcm => "ChainingModeGCM",
        }
    }

    /// Parse a property value.
    #[must_use]
    pub fn from_property(value: &str) -> Option<Self> {
        match value {
            "ChainingModeECB" => Some(Self::Ecb),
            "ChainingModeCBC" => Some(Self::Cbc),
            "ChainingModeGCM" => Some(Self::Gcm),
            _ => None,
        }
    }
}

/// Key-length table reported by a provider, in bits.
///
/// Values are taken as reported; validation is the caller's concern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyLengths {
    /// Smallest supported key length
    pub min: u32,
    /// Largest supported key length
    pub max: u32,
    /// Step between supported lengths
    pub increment: u32,
}

impl KeyLengths {
    /// Encoded size in bytes.
    pub const SIZE: usize = 12;

    /// Encode as the property blob.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[..4].copy_from_slice(&self.min.to_le_bytes());
        out[4..8].copy_from_slice(&self.max.to_le_bytes());
        out[8..].copy_from_slice(&self.increment.to_le_bytes());
        out
    }

    /// Decode from a property blob.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        let word = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Self {
            min: word(0),
            max: word(4),
            increment: word(8),
        }
    }
}

/// Encode `s` as a NUL-terminated UTF-16LE blob.
#[must_use]
pub fn encode_wide(s: &str) -> Vec<u8> {
    s.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

/// Decode a UTF-16LE blob, stopping at the first NUL.
///
/// Returns `None` for odd-length blobs or invalid UTF-16.
#[must_use]
pub fn decode_wide(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();
    String::from_utf16(&units).ok()
}

/// Set a string property on `handle`.
///
/// # Errors
///
/// Propagates the backend status.
pub fn set_string(
    backend: &dyn Backend,
    handle: RawHandle,
    name: &str,
    value: &str,
) -> Result<(), BackendError> {
    backend.set_property(handle, name, &encode_wide(value))
}

/// Read a `u32` property from `handle`.
///
/// # Errors
///
/// Propagates the backend status, or `InvalidBufferSize` when the backend
/// wrote fewer than four bytes.
pub fn get_u32(backend: &dyn Backend, handle: RawHandle, name: &str) -> Result<u32, BackendError> {
    let mut buf = [0u8; 4];
    let written = backend.get_property(handle, name, &mut buf)?;
    if written != buf.len() {
        return Err(BackendError::new("GetProperty", Status::InvalidBufferSize));
    }
    Ok(u32::from_le_bytes(buf))
}

/// Read the key-length table from a provider handle.
///
/// # Errors
///
/// Propagates the backend status, or `InvalidBufferSize` on a short blob.
pub fn get_key_lengths(backend: &dyn Backend, handle: RawHandle) -> Result<KeyLengths, BackendError> {
    let mut buf = [0u8; KeyLengths::SIZE];
    let written = backend.get_property(handle, KEY_LENGTHS, &mut buf)?;
    if written != buf.len() {
        return Err(BackendError::new("GetProperty", Status::InvalidBufferSize));
    }
    Ok(KeyLengths::from_bytes(&buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wide_string_roundtrip() {
        let blob = encode_wide(ChainingMode::Gcm.as_str());
        assert_eq!(blob.len(), (ChainingMode::Gcm.as_str().len() + 1) * 2);
        assert_eq!(&blob[blob.len() - 2..], &[0, 0]);
        assert_eq!(decode_wide(&blob).as_deref(), Some("ChainingModeGCM"));
    }

    #[test]
    fn test_decode_wide_rejects_odd_length() {
        assert!(decode_wide(&[0x41]).is_none());
    }

    #[test]
    fn test_key_lengths_layout() {
        let lengths = KeyLengths {
            min: 128,
            max: 256,
            increment: 64,
        };
        let bytes = lengths.to_bytes();
        assert_eq!(&bytes[..4], &128u32.to_le_bytes());
        assert_eq!(&bytes[8..], &64u32.to_le_bytes());
        assert_eq!(KeyLengths::from_bytes(&bytes), lengths);
    }

    #[test]
    fn test_chaining_mode_property_values() {
        for mode in [ChainingMode::Ecb, ChainingMode::Cbc, ChainingMode::Gcm] {
            assert_eq!(ChainingMode::from_property(mode.as_str()), Some(mode));
        }
        assert_eq!(ChainingMode::from_property("ChainingModeCFB"), None);
    }
}
