//! Cipher capability traits.
//!
//! Buffer-shape mistakes are programming errors and panic. Backend failures
//! and authentication failures are returned as [`CipherError`].

use crate::CipherError;

/// A keyed block cipher.
pub trait BlockCipher {
    /// Block size in bytes.
    fn block_size(&self) -> usize;

    /// Encrypt the first block of `src` into the first block of `dst`.
    ///
    /// # Panics
    ///
    /// Panics if either buffer is shorter than one block.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Backend`] if the backend call fails.
    fn encrypt_block(&self, dst: &mut [u8], src: &[u8]) -> Result<(), CipherError>;

    /// Decrypt the first block of `src` into the first block of `dst`.
    ///
    /// # Panics
    ///
    /// Panics if either buffer is shorter than one block.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Backend`] if the backend call fails.
    fn decrypt_block(&self, dst: &mut [u8], src: &[u8]) -> Result<(), CipherError>;
}

/// A stateful block mode processing whole blocks.
pub trait BlockMode {
    /// Block size in bytes.
    fn block_size(&self) -> usize;

    /// Process `src` into the front of `dst`, carrying chaining state into
    /// the next call.
    ///
    /// # Panics
    ///
    /// Panics if `src` is not a whole number of blocks or `dst` is shorter
    /// than `src`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Backend`] if the backend call fails.
    fn crypt_blocks(&mut self, dst: &mut [u8], src: &[u8]) -> Result<(), CipherError>;
}

/// Authenticated encryption with associated data.
///
/// Sealed output is `ciphertext || tag`.
pub trait Aead {
    /// Required nonce length in bytes.
    fn nonce_size(&self) -> usize;

    /// Bytes added by sealing (the tag length).
    fn overhead(&self) -> usize;

    /// Seal `plaintext` and append `ciphertext || tag` to `dst`.
    ///
    /// Takes `&mut self` because some modes track nonce state.
    ///
    /// # Panics
    ///
    /// Panics on a wrong nonce length, an oversized plaintext, or a nonce
    /// the mode refuses to reuse.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Backend`] if the backend call fails. `dst` is
    /// left at its original length.
    fn seal_append(
        &mut self,
        dst: &mut Vec<u8>,
        nonce: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<(), CipherError>;

    /// Authenticate and decrypt `ciphertext`, appending the plaintext to
    /// `dst`.
    ///
    /// # Panics
    ///
    /// Panics on a wrong nonce length.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Authentication`] on any failure. Nothing is
    /// appended to `dst` in that case.
    fn open_append(
        &self,
        dst: &mut Vec<u8>,
        nonce: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
    ) -> Result<(), CipherError>;

    /// Seal into a fresh buffer.
    ///
    /// # Errors
    ///
    /// See [`Aead::seal_append`].
    fn seal(&mut self, nonce: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CipherError> {
        let mut out = Vec::with_capacity(plaintext.len().saturating_add(self.overhead()));
        self.seal_append(&mut out, nonce, plaintext, aad)?;
        Ok(out)
    }

    /// Open into a fresh buffer.
    ///
    /// # Errors
    ///
    /// See [`Aead::open_append`].
    fn open(&self, nonce: &[u8], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CipherError> {
        let mut out = Vec::with_capacity(ciphertext.len().saturating_sub(self.overhead()));
        self.open_append(&mut out, nonce, ciphertext, aad)?;
        Ok(out)
    }
}
