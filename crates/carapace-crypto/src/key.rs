//! Imported keys and key-size policy.

use crate::CipherError;
use crate::cache::ProviderHandle;
use carapace_backend::{BackendError, KeyLengths, RawHandle};
use std::fmt;
use std::sync::Arc;

/// Clamp a buffer length to the 32-bit range native providers accept.
#[must_use]
pub fn len_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Validated key-length table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllowedKeyLengths(KeyLengths);

impl AllowedKeyLengths {
    /// Validate a table reported by a provider.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKeyLengths`] if `min > max`, or if the
    /// increment is zero while `min != max`.
    pub fn new(lengths: KeyLengths) -> Result<Self, CipherError> {
        let KeyLengths {
            min,
            max,
            increment,
        } = lengths;
        if min > max || (increment == 0 && min != max) {
            return Err(CipherError::InvalidKeyLengths {
                min,
                max,
                increment,
            });
        }
        Ok(Self(lengths))
    }

    /// Whether a key of `bits` bits may be imported.
    #[must_use]
    pub fn is_allowed(&self, bits: u32) -> bool {
        let KeyLengths {
            min,
            max,
            increment,
        } = self.0;
        if bits < min || bits > max {
            return false;
        }
        if increment == 0 {
            return bits == min;
        }
        (bits - min) % increment == 0
    }

    /// The underlying table.
    #[must_use]
    pub fn lengths(&self) -> KeyLengths {
        self.0
    }
}

/// A key imported into a provider.
///
/// Holds its provider alive; the key object is destroyed on drop, before the
/// provider reference is released.
pub struct KeyHandle {
    provider: Arc<ProviderHandle>,
    raw: RawHandle,
    bits: u32,
}

impl KeyHandle {
    /// Import `secret` into `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Backend`] if the provider rejects the key.
    pub fn new(provider: Arc<ProviderHandle>, secret: &[u8]) -> Result<Self, CipherError> {
        let raw = provider.backend().import_key(provider.raw(), secret)?;
        Ok(Self {
            provider,
            raw,
            bits: len_u32(secret.len()).saturating_mul(8),
        })
    }

    /// Key length in bits.
    #[must_use]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Provider the key was imported into.
    #[must_use]
    pub fn provider(&self) -> &ProviderHandle {
        &self.provider
    }

    pub(crate) fn encrypt(&self, input: &[u8], output: &mut [u8]) -> Result<usize, BackendError> {
        self.provider.backend().encrypt(self.raw, input, output)
    }

    pub(crate) fn decrypt(&self, input: &[u8], output: &mut [u8]) -> Result<usize, BackendError> {
        self.provider.backend().decrypt(self.raw, input, output)
    }

    pub(crate) fn aead_encrypt(
        &self,
        nonce: &[u8],
        aad: &[u8],
        buffer: &mut [u8],
        tag: &mut [u8],
    ) -> Result<(), BackendError> {
        self.provider
            .backend()
            .aead_encrypt(self.raw, nonce, aad, buffer, tag)
    }

    pub(crate) fn aead_decrypt(
        &self,
        nonce: &[u8],
        aad: &[u8],
        buffer: &mut [u8],
        tag: &[u8],
    ) -> Result<(), BackendError> {
        self.provider
            .backend()
            .aead_decrypt(self.raw, nonce, aad, buffer, tag)
    }
}

impl Drop for KeyHandle {
    fn drop(&mut self) {
        if let Err(e) = self.provider.backend().destroy_key(self.raw) {
            tracing::warn!("Failed to destroy key {:?}: {}", self.raw, e);
        }
    }
}

impl fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyHandle")
            .field("raw", &self.raw)
            .field("bits", &self.bits)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carapace_backend::property::{AES_ALGORITHM, CHAINING_MODE};
    use carapace_backend::{Backend, ChainingMode, ProviderFlags, SoftBackend, Status};

    fn table(min: u32, max: u32, increment: u32) -> KeyLengths {
        KeyLengths {
            min,
            max,
            increment,
        }
    }

    #[test]
    fn test_len_u32_clamps() {
        assert_eq!(len_u32(0), 0);
        assert_eq!(len_u32(32), 32);
        assert_eq!(len_u32(u32::MAX as usize), u32::MAX);
        #[cfg(target_pointer_width = "64")]
        assert_eq!(len_u32(usize::MAX), u32::MAX);
    }

    #[test]
    fn test_aes_table_allows_standard_sizes() {
        let allowed = AllowedKeyLengths::new(table(128, 256, 64)).unwrap();
        for bits in [128, 192, 256] {
            assert!(allowed.is_allowed(bits), "{bits}");
        }
        for bits in [0, 8, 64, 136, 160, 255, 320, u32::MAX] {
            assert!(!allowed.is_allowed(bits), "{bits}");
        }
    }

    #[test]
    fn test_single_size_table() {
        let allowed = AllowedKeyLengths::new(table(256, 256, 0)).unwrap();
        assert!(allowed.is_allowed(256));
        assert!(!allowed.is_allowed(128));
    }

    #[test]
    fn test_malformed_tables_rejected() {
        assert!(matches!(
            AllowedKeyLengths::new(table(256, 128, 64)),
            Err(CipherError::InvalidKeyLengths { min: 256, max: 128, increment: 64 })
        ));
        assert!(matches!(
            AllowedKeyLengths::new(table(128, 256, 0)),
            Err(CipherError::InvalidKeyLengths { .. })
        ));
    }

    #[test]
    fn test_key_destroyed_before_provider_closed() {
        let soft = Arc::new(SoftBackend::default());
        let provider =
            ProviderHandle::open(soft.clone(), AES_ALGORITHM, ProviderFlags::NONE).unwrap();
        provider
            .set_string(CHAINING_MODE, ChainingMode::Ecb.as_str())
            .unwrap();
        let provider = Arc::new(provider);

        let key = KeyHandle::new(Arc::clone(&provider), &[9u8; 24]).unwrap();
        assert_eq!(key.bits(), 192);
        assert_eq!(soft.open_keys(), 1);

        // The key keeps the provider alive past the last outside reference
        drop(provider);
        assert_eq!(soft.open_providers(), 1);

        drop(key);
        assert_eq!(soft.open_keys(), 0);
        assert_eq!(soft.open_providers(), 0);
    }

    #[test]
    fn test_import_failure_surfaces_status() {
        let soft = Arc::new(SoftBackend::default());
        // Fresh providers are in CBC mode, which the soft backend cannot import into
        let provider = Arc::new(
            ProviderHandle::open(soft.clone(), AES_ALGORITHM, ProviderFlags::NONE).unwrap(),
        );
        let err = KeyHandle::new(provider, &[0u8; 16]).unwrap_err();
        assert!(matches!(err, CipherError::Backend(e) if e.status == Status::NotSupported));
        assert_eq!(soft.open_keys(), 0);
        assert_eq!(soft.open_providers(), 0);
        assert!(!soft.fips_enabled().unwrap());
    }
}
