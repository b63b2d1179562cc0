//! AES block cipher over an imported ECB key.

use crate::CipherError;
use crate::cache::ProviderHandle;
use crate::cbc::Cbc;
use crate::engine::Engine;
use crate::gcm::{GCM_STANDARD_NONCE_SIZE, GCM_TAG_SIZE, Gcm, GcmTls, GenericGcm};
use crate::key::{AllowedKeyLengths, KeyHandle, len_u32};
use crate::traits::BlockCipher;
use carapace_backend::ChainingMode;
use carapace_backend::property::{BLOCK_LENGTH, CHAINING_MODE};
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Cached per-mode AES provider state.
pub(crate) struct AesAlgorithm {
    provider: Arc<ProviderHandle>,
    allowed: AllowedKeyLengths,
    block_size: usize,
}

impl AesAlgorithm {
    /// Put a fresh provider into `mode` and read its key and block limits.
    pub(crate) fn open(provider: ProviderHandle, mode: ChainingMode) -> Result<Self, CipherError> {
        provider.set_string(CHAINING_MODE, mode.as_str())?;
        let allowed = AllowedKeyLengths::new(provider.key_lengths()?)?;
        let block_size = usize::try_from(provider.get_u32(BLOCK_LENGTH)?)
            .map_err(|_| CipherError::MalformedProperty(BLOCK_LENGTH))?;
        if block_size == 0 {
            return Err(CipherError::InvalidBlockSize(block_size));
        }
        Ok(Self {
            provider: Arc::new(provider),
            allowed,
            block_size,
        })
    }

    fn import(&self, key: &[u8]) -> Result<KeyHandle, CipherError> {
        let bits = len_u32(key.len()).saturating_mul(8);
        if !self.allowed.is_allowed(bits) {
            return Err(CipherError::InvalidKeySize { bits });
        }
        KeyHandle::new(Arc::clone(&self.provider), key)
    }
}

/// AES keyed for single-block operation.
///
/// Also the factory for the chaining modes, which share this key.
pub struct AesCipher {
    engine: Engine,
    ecb: KeyHandle,
    key: Zeroizing<Vec<u8>>,
    block_size: usize,
}

impl AesCipher {
    /// Import `key` through `engine`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKeySize`] if the provider does not allow
    /// the key length, or any error from opening the provider or importing.
    pub fn new(engine: Engine, key: &[u8]) -> Result<Self, CipherError> {
        let algorithm = engine.aes(ChainingMode::Ecb)?;
        let ecb = algorithm.import(key)?;
        Ok(Self {
            block_size: algorithm.block_size,
            engine,
            ecb,
            key: Zeroizing::new(key.to_vec()),
        })
    }

    /// Key length in bits.
    #[must_use]
    pub fn key_bits(&self) -> u32 {
        self.ecb.bits()
    }

    /// Engine this cipher was created from.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// CBC encrypter chaining from `iv`.
    ///
    /// # Panics
    ///
    /// Panics if `iv` is not exactly one block long.
    #[must_use]
    pub fn new_cbc_encrypter(&self, iv: &[u8]) -> Cbc<'_, Self> {
        Cbc::encrypter(self, iv)
    }

    /// CBC decrypter chaining from `iv`.
    ///
    /// # Panics
    ///
    /// Panics if `iv` is not exactly one block long.
    #[must_use]
    pub fn new_cbc_decrypter(&self, iv: &[u8]) -> Cbc<'_, Self> {
        Cbc::decrypter(self, iv)
    }

    /// GCM with the given nonce and tag sizes.
    ///
    /// Standard sizes use the backend's AEAD key. If exactly one size is
    /// non-standard, GCM is computed over this block cipher instead.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::UnsupportedGcmParameters`] if both sizes are
    /// non-standard, [`CipherError::InvalidTagSize`] or
    /// [`CipherError::InvalidNonceSize`] if the non-standard one is out of
    /// range, or any backend error from importing the key.
    pub fn new_gcm(&self, nonce_size: usize, tag_size: usize) -> Result<Gcm, CipherError> {
        match (nonce_size == GCM_STANDARD_NONCE_SIZE, tag_size == GCM_TAG_SIZE) {
            (true, true) => {
                let algorithm = self.engine.aes(ChainingMode::Gcm)?;
                Ok(Gcm::native(algorithm.import(&self.key)?))
            }
            (false, false) => Err(CipherError::UnsupportedGcmParameters),
            _ => {
                tracing::debug!(
                    "Using block-cipher GCM for nonce size {} and tag size {}",
                    nonce_size,
                    tag_size
                );
                let cipher = Self::new(self.engine.clone(), &self.key)?;
                Ok(Gcm::generic(GenericGcm::new(cipher, nonce_size, tag_size)?))
            }
        }
    }

    /// GCM with a 12-byte nonce and 16-byte tag.
    ///
    /// # Errors
    ///
    /// See [`AesCipher::new_gcm`].
    pub fn new_gcm_standard(&self) -> Result<Gcm, CipherError> {
        self.new_gcm(GCM_STANDARD_NONCE_SIZE, GCM_TAG_SIZE)
    }

    /// GCM for TLS records, refusing to seal under a non-increasing nonce.
    ///
    /// # Errors
    ///
    /// See [`AesCipher::new_gcm`].
    pub fn new_gcm_tls(&self) -> Result<GcmTls, CipherError> {
        GcmTls::new(self.new_gcm_standard()?)
    }

    fn check_block(&self, dst: &[u8], src: &[u8]) {
        assert!(src.len() >= self.block_size, "input not full block");
        assert!(dst.len() >= self.block_size, "output not full block");
    }
}

impl BlockCipher for AesCipher {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn encrypt_block(&self, dst: &mut [u8], src: &[u8]) -> Result<(), CipherError> {
        self.check_block(dst, src);
        let n = self.block_size;
        self.ecb.encrypt(&src[..n], &mut dst[..n])?;
        Ok(())
    }

    fn decrypt_block(&self, dst: &mut [u8], src: &[u8]) -> Result<(), CipherError> {
        self.check_block(dst, src);
        let n = self.block_size;
        self.ecb.decrypt(&src[..n], &mut dst[..n])?;
        Ok(())
    }
}

impl fmt::Debug for AesCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesCipher")
            .field("key_bits", &self.key_bits())
            .field("block_size", &self.block_size)
            .finish_non_exhaustive()
    }
}
