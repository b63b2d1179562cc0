//! GCM for TLS 1.2 records.
//!
//! The 12-byte nonce is a 4-byte fixed prefix followed by a big-endian 64-bit
//! record sequence number. Sealing under a nonce that is not strictly greater
//! than every nonce sealed before is a programming error and panics.

use super::{GCM_STANDARD_NONCE_SIZE, GCM_TAG_SIZE, Gcm};
use crate::CipherError;
use crate::traits::Aead;

/// AES-GCM with enforced nonce ordering.
#[derive(Debug)]
pub struct GcmTls {
    gcm: Gcm,
    min_next_nonce: u128,
}

impl GcmTls {
    /// Wrap a standard-size [`Gcm`].
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidNonceSize`] or
    /// [`CipherError::InvalidTagSize`] unless `gcm` uses 12-byte nonces and
    /// 16-byte tags.
    pub fn new(gcm: Gcm) -> Result<Self, CipherError> {
        if gcm.nonce_size() != GCM_STANDARD_NONCE_SIZE {
            return Err(CipherError::InvalidNonceSize(gcm.nonce_size()));
        }
        if gcm.tag_size() != GCM_TAG_SIZE {
            return Err(CipherError::InvalidTagSize(gcm.tag_size()));
        }
        Ok(Self {
            gcm,
            min_next_nonce: 0,
        })
    }

    /// Smallest nonce the next seal accepts, as a 96-bit big-endian value.
    #[must_use]
    pub fn min_next_nonce(&self) -> u128 {
        self.min_next_nonce
    }

    fn check_nonce(&self, nonce: &[u8]) -> u128 {
        assert!(
            nonce.len() == GCM_STANDARD_NONCE_SIZE,
            "incorrect nonce length given to GCM"
        );
        let mut counter = [0u8; 8];
        counter.copy_from_slice(&nonce[4..]);
        assert!(
            u64::from_be_bytes(counter) != u64::MAX,
            "nonce counter must be less than 2^64 - 1"
        );

        let mut wide = [0u8; 16];
        wide[4..].copy_from_slice(nonce);
        let value = u128::from_be_bytes(wide);
        assert!(
            value >= self.min_next_nonce,
            "nonce counter must be strictly monotonically increasing"
        );
        value
    }
}

impl Aead for GcmTls {
    fn nonce_size(&self) -> usize {
        GCM_STANDARD_NONCE_SIZE
    }

    fn overhead(&self) -> usize {
        GCM_TAG_SIZE
    }

    fn seal_append(
        &mut self,
        dst: &mut Vec<u8>,
        nonce: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<(), CipherError> {
        let value = self.check_nonce(nonce);
        self.gcm.seal_into(dst, nonce, plaintext, aad)?;
        self.min_next_nonce = value + 1;
        Ok(())
    }

    fn open_append(
        &self,
        dst: &mut Vec<u8>,
        nonce: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
    ) -> Result<(), CipherError> {
        self.gcm.open_into(dst, nonce, ciphertext, aad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Engine;
    use carapace_backend::SoftBackend;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::Arc;

    fn tls() -> GcmTls {
        Engine::new(Arc::new(SoftBackend::default()))
            .new_aes_cipher(b"D249BF6DEC97B1EBD69BC4D6B3A3C49D")
            .unwrap()
            .new_gcm_tls()
            .unwrap()
    }

    fn nonce(counter: u64) -> [u8; 12] {
        let mut n = [0u8; 12];
        n[4..].copy_from_slice(&counter.to_be_bytes());
        n
    }

    fn seal_panics(tls: &mut GcmTls, nonce: &[u8]) -> bool {
        catch_unwind(AssertUnwindSafe(|| tls.seal(nonce, &[1, 2, 3], &[5, 5, 7]))).is_err()
    }

    #[test]
    fn test_seal_and_open_tls() {
        let mut tls = tls();
        let sealed = tls.seal(&nonce(0), &[1, 2, 3], &[5, 5, 7]).unwrap();
        assert!(seal_panics(&mut tls, &nonce(0)));

        let sealed1 = tls.seal(&nonce(1), &[1, 2, 3], &[5, 5, 7]).unwrap();
        tls.seal(&nonce(10), &[1, 2, 3], &[5, 5, 7]).unwrap();
        assert!(seal_panics(&mut tls, &nonce(9)));
        assert!(seal_panics(&mut tls, &nonce(u64::MAX)));
        assert_ne!(sealed, sealed1);

        // Opening tracks no sequence
        assert_eq!(tls.open(&nonce(0), &sealed, &[5, 5, 7]).unwrap(), [1, 2, 3]);
        assert_eq!(tls.open(&nonce(1), &sealed1, &[5, 5, 7]).unwrap(), [1, 2, 3]);
        assert_eq!(tls.min_next_nonce(), 11);
    }

    #[test]
    fn test_skipping_ahead_is_allowed() {
        let mut tls = tls();
        tls.seal(&nonce(5), b"", b"").unwrap();
        assert!(seal_panics(&mut tls, &nonce(3)));
        tls.seal(&nonce(6), b"", b"").unwrap();
        assert_eq!(tls.min_next_nonce(), 7);
    }

    #[test]
    fn test_prefix_takes_part_in_ordering() {
        let mut tls = tls();
        let mut high = nonce(0);
        high[0] = 1;
        tls.seal(&high, b"", b"").unwrap();
        assert!(seal_panics(&mut tls, &nonce(1_000)));
    }

    #[test]
    #[should_panic(expected = "strictly monotonically increasing")]
    fn test_reused_nonce_panics() {
        let mut tls = tls();
        tls.seal(&nonce(7), b"x", b"").unwrap();
        let _ = tls.seal(&nonce(7), b"x", b"");
    }

    #[test]
    #[should_panic(expected = "less than 2^64 - 1")]
    fn test_max_counter_panics() {
        let _ = tls().seal(&nonce(u64::MAX), b"x", b"");
    }

    #[test]
    fn test_rejects_non_standard_gcm() {
        let cipher = Engine::new(Arc::new(SoftBackend::default()))
            .new_aes_cipher(&[0u8; 16])
            .unwrap();
        let gcm = cipher.new_gcm(16, GCM_TAG_SIZE).unwrap();
        assert!(matches!(GcmTls::new(gcm), Err(CipherError::InvalidNonceSize(16))));
    }
}
