//! Galois/Counter Mode.
//!
//! [`Gcm`] seals through the backend's AEAD key when the nonce and tag sizes
//! are standard, and through [`GenericGcm`] over the block cipher otherwise.
//! [`GcmTls`] adds the nonce ordering TLS 1.2 records require.
//!
//! ## Open failures
//!
//! Every open failure (short input, tag mismatch, backend status) surfaces
//! as [`CipherError::Authentication`]. Bytes appended to the destination are
//! wiped and truncated before the error returns.

mod generic;
mod tls;

pub use generic::GenericGcm;
pub use tls::GcmTls;

use crate::CipherError;
use crate::aes::AesCipher;
use crate::key::KeyHandle;
use crate::traits::Aead;
use std::fmt;
use zeroize::Zeroize;

/// Standard GCM nonce size in bytes.
pub const GCM_STANDARD_NONCE_SIZE: usize = 12;

/// Standard (and largest) GCM tag size in bytes.
pub const GCM_TAG_SIZE: usize = 16;

/// Smallest tag size accepted by the block-cipher path.
pub const GCM_MIN_TAG_SIZE: usize = 12;

/// GCM operates on 128-bit blocks.
pub const GCM_BLOCK_SIZE: usize = 16;

/// Largest plaintext GCM can encrypt: 2^32 - 2 counter blocks.
pub const GCM_MAX_PLAINTEXT: u64 = ((1 << 32) - 2) * GCM_BLOCK_SIZE as u64;

/// Largest plaintext the backend path accepts (its lengths are 32-bit).
const NATIVE_MAX_PLAINTEXT: u64 = if GCM_MAX_PLAINTEXT < u32::MAX as u64 {
    GCM_MAX_PLAINTEXT
} else {
    u32::MAX as u64
};

pub(crate) fn check_nonce_len(nonce: &[u8], expected: usize) {
    assert!(nonce.len() == expected, "incorrect nonce length given to GCM");
}

pub(crate) fn check_plaintext_len(len: usize, max: u64) {
    assert!(len as u64 <= max, "message too large for GCM");
}

/// Remove everything past `start`, wiping it first.
pub(crate) fn discard_tail(dst: &mut Vec<u8>, start: usize) {
    dst[start..].zeroize();
    dst.truncate(start);
}

enum GcmImpl {
    Native(KeyHandle),
    Block(GenericGcm<AesCipher>),
}

/// AES-GCM.
pub struct Gcm {
    nonce_size: usize,
    tag_size: usize,
    inner: GcmImpl,
}

impl Gcm {
    pub(crate) fn native(key: KeyHandle) -> Self {
        Self {
            nonce_size: GCM_STANDARD_NONCE_SIZE,
            tag_size: GCM_TAG_SIZE,
            inner: GcmImpl::Native(key),
        }
    }

    pub(crate) fn generic(gcm: GenericGcm<AesCipher>) -> Self {
        Self {
            nonce_size: gcm.nonce_size(),
            tag_size: gcm.tag_size(),
            inner: GcmImpl::Block(gcm),
        }
    }

    /// Nonce size in bytes.
    #[must_use]
    pub fn nonce_size(&self) -> usize {
        self.nonce_size
    }

    /// Tag size in bytes.
    #[must_use]
    pub fn tag_size(&self) -> usize {
        self.tag_size
    }

    /// True when sealing goes through the backend AEAD key.
    #[must_use]
    pub fn is_native(&self) -> bool {
        matches!(self.inner, GcmImpl::Native(_))
    }

    /// Largest plaintext [`Gcm::seal_into`] accepts.
    #[must_use]
    pub fn max_plaintext(&self) -> u64 {
        match self.inner {
            GcmImpl::Native(_) => NATIVE_MAX_PLAINTEXT,
            GcmImpl::Block(_) => GCM_MAX_PLAINTEXT,
        }
    }

    /// Seal `plaintext`, appending `ciphertext || tag` to `dst`.
    ///
    /// # Panics
    ///
    /// Panics if `nonce` has the wrong length or `plaintext` is larger than
    /// [`Gcm::max_plaintext`].
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Backend`] if the backend call fails; `dst` is
    /// restored to its original length.
    pub fn seal_into(
        &self,
        dst: &mut Vec<u8>,
        nonce: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<(), CipherError> {
        check_nonce_len(nonce, self.nonce_size);
        check_plaintext_len(plaintext.len(), self.max_plaintext());

        match &self.inner {
            GcmImpl::Native(key) => {
                let start = dst.len();
                dst.reserve(plaintext.len().saturating_add(GCM_TAG_SIZE));
                dst.extend_from_slice(plaintext);
                let mut tag = [0u8; GCM_TAG_SIZE];
                if let Err(e) = key.aead_encrypt(nonce, aad, &mut dst[start..], &mut tag) {
                    discard_tail(dst, start);
                    return Err(e.into());
                }
                dst.extend_from_slice(&tag);
                Ok(())
            }
            GcmImpl::Block(gcm) => gcm.seal_into(dst, nonce, plaintext, aad),
        }
    }

    /// Verify and decrypt `ciphertext || tag`, appending the plaintext to
    /// `dst`.
    ///
    /// # Panics
    ///
    /// Panics if `nonce` has the wrong length.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Authentication`] on any failure, with `dst`
    /// left at its original length.
    pub fn open_into(
        &self,
        dst: &mut Vec<u8>,
        nonce: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
    ) -> Result<(), CipherError> {
        check_nonce_len(nonce, self.nonce_size);

        match &self.inner {
            GcmImpl::Native(key) => {
                if ciphertext.len() < self.tag_size
                    || (ciphertext.len() - self.tag_size) as u64 > NATIVE_MAX_PLAINTEXT
                {
                    return Err(CipherError::Authentication);
                }
                let (body, tag) = ciphertext.split_at(ciphertext.len() - self.tag_size);

                let start = dst.len();
                dst.extend_from_slice(body);
                if let Err(e) = key.aead_decrypt(nonce, aad, &mut dst[start..], tag) {
                    tracing::debug!("GCM open rejected: {}", e);
                    discard_tail(dst, start);
                    return Err(CipherError::Authentication);
                }
                Ok(())
            }
            GcmImpl::Block(gcm) => gcm.open_into(dst, nonce, ciphertext, aad),
        }
    }
}

impl Aead for Gcm {
    fn nonce_size(&self) -> usize {
        self.nonce_size
    }

    fn overhead(&self) -> usize {
        self.tag_size
    }

    fn seal_append(
        &mut self,
        dst: &mut Vec<u8>,
        nonce: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<(), CipherError> {
        self.seal_into(dst, nonce, plaintext, aad)
    }

    fn open_append(
        &self,
        dst: &mut Vec<u8>,
        nonce: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
    ) -> Result<(), CipherError> {
        self.open_into(dst, nonce, ciphertext, aad)
    }
}

impl fmt::Debug for Gcm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gcm")
            .field("nonce_size", &self.nonce_size)
            .field("tag_size", &self.tag_size)
            .field("native", &self.is_native())
            .finish()
    }
}
