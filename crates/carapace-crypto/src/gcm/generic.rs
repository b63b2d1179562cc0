//! GCM computed over any 128-bit block cipher.
//!
//! Used when the nonce or tag size is one the backend's AEAD call does not
//! take. Follows NIST SP 800-38D: `H = E(0^128)`, `J0` from the nonce,
//! CTR keystream from `inc32(J0)`, tag `E(J0) xor GHASH(A, C)`.

use super::{
    GCM_BLOCK_SIZE, GCM_MAX_PLAINTEXT, GCM_MIN_TAG_SIZE, GCM_STANDARD_NONCE_SIZE, GCM_TAG_SIZE,
    check_nonce_len, check_plaintext_len, discard_tail,
};
use crate::CipherError;
use crate::traits::BlockCipher;
use ghash::GHash;
use ghash::universal_hash::{KeyInit, UniversalHash};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

type Block = [u8; GCM_BLOCK_SIZE];

/// GCM over a block cipher.
pub struct GenericGcm<C> {
    cipher: C,
    h: Zeroizing<Block>,
    nonce_size: usize,
    tag_size: usize,
}

impl<C: BlockCipher> GenericGcm<C> {
    /// Wrap `cipher`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidBlockSize`] unless the cipher has
    /// 16-byte blocks, [`CipherError::InvalidTagSize`] unless
    /// `12 <= tag_size <= 16`, [`CipherError::InvalidNonceSize`] for a zero
    /// nonce size, or the cipher's error while deriving the hash key.
    pub fn new(cipher: C, nonce_size: usize, tag_size: usize) -> Result<Self, CipherError> {
        if cipher.block_size() != GCM_BLOCK_SIZE {
            return Err(CipherError::InvalidBlockSize(cipher.block_size()));
        }
        if !(GCM_MIN_TAG_SIZE..=GCM_TAG_SIZE).contains(&tag_size) {
            return Err(CipherError::InvalidTagSize(tag_size));
        }
        if nonce_size == 0 {
            return Err(CipherError::InvalidNonceSize(nonce_size));
        }

        let mut h = Zeroizing::new([0u8; GCM_BLOCK_SIZE]);
        cipher.encrypt_block(&mut h[..], &[0u8; GCM_BLOCK_SIZE])?;
        Ok(Self {
            cipher,
            h,
            nonce_size,
            tag_size,
        })
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

    fn ghash(&self) -> GHash {
        GHash::new(ghash::Key::from_slice(&self.h[..]))
    }

    fn pre_counter(&self, nonce: &[u8]) -> Block {
        let mut j0 = [0u8; GCM_BLOCK_SIZE];
        if nonce.len() == GCM_STANDARD_NONCE_SIZE {
            j0[..GCM_STANDARD_NONCE_SIZE].copy_from_slice(nonce);
            j0[GCM_BLOCK_SIZE - 1] = 1;
        } else {
            let mut lengths = [0u8; GCM_BLOCK_SIZE];
            lengths[8..].copy_from_slice(&bit_len(nonce.len()).to_be_bytes());
            let mut mac = self.ghash();
            mac.update_padded(nonce);
            mac.update_padded(&lengths);
            j0.copy_from_slice(&mac.finalize());
        }
        j0
    }

    fn ctr(&self, j0: &Block, data: &mut [u8]) -> Result<(), CipherError> {
        let mut counter = *j0;
        let mut keystream = Zeroizing::new([0u8; GCM_BLOCK_SIZE]);
        for chunk in data.chunks_mut(GCM_BLOCK_SIZE) {
            inc32(&mut counter);
            self.cipher.encrypt_block(&mut keystream[..], &counter)?;
            for (b, k) in chunk.iter_mut().zip(keystream.iter()) {
                *b ^= k;
            }
        }
        Ok(())
    }

    fn tag(&self, j0: &Block, aad: &[u8], ciphertext: &[u8]) -> Result<Block, CipherError> {
        let mut lengths = [0u8; GCM_BLOCK_SIZE];
        lengths[..8].copy_from_slice(&bit_len(aad.len()).to_be_bytes());
        lengths[8..].copy_from_slice(&bit_len(ciphertext.len()).to_be_bytes());

        let mut mac = self.ghash();
        mac.update_padded(aad);
        mac.update_padded(ciphertext);
        mac.update_padded(&lengths);
        let s = mac.finalize();

        let mut tag = [0u8; GCM_BLOCK_SIZE];
        self.cipher.encrypt_block(&mut tag, j0)?;
        for (t, s) in tag.iter_mut().zip(s.iter()) {
            *t ^= s;
        }
        Ok(tag)
    }

    /// Seal `plaintext`, appending `ciphertext || tag` to `dst`.
    ///
    /// # Panics
    ///
    /// Panics if `nonce` has the wrong length or `plaintext` exceeds
    /// 2^32 - 2 blocks.
    ///
    /// # Errors
    ///
    /// Returns the cipher's error; `dst` is restored to its original length.
    pub fn seal_into(
        &self,
        dst: &mut Vec<u8>,
        nonce: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<(), CipherError> {
        check_nonce_len(nonce, self.nonce_size);
        check_plaintext_len(plaintext.len(), GCM_MAX_PLAINTEXT);

        let j0 = self.pre_counter(nonce);
        let start = dst.len();
        dst.reserve(plaintext.len().saturating_add(self.tag_size));
        dst.extend_from_slice(plaintext);

        let sealed = self
            .ctr(&j0, &mut dst[start..])
            .and_then(|()| self.tag(&j0, aad, &dst[start..]));
        match sealed {
            Ok(tag) => {
                dst.extend_from_slice(&tag[..self.tag_size]);
                Ok(())
            }
            Err(e) => {
                discard_tail(dst, start);
                Err(e)
            }
        }
    }

    /// Verify and decrypt `ciphertext || tag`, appending the plaintext to
    /// `dst`. The tag is checked before anything is decrypted.
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

        if ciphertext.len() < self.tag_size
            || (ciphertext.len() - self.tag_size) as u64 > GCM_MAX_PLAINTEXT
        {
            return Err(CipherError::Authentication);
        }
        let (body, tag) = ciphertext.split_at(ciphertext.len() - self.tag_size);

        let j0 = self.pre_counter(nonce);
        let Ok(mut expected) = self.tag(&j0, aad, body) else {
            return Err(CipherError::Authentication);
        };
        let matches: bool = expected[..self.tag_size].ct_eq(tag).into();
        expected.zeroize();
        if !matches {
            tracing::debug!("GCM tag mismatch");
            return Err(CipherError::Authentication);
        }

        let start = dst.len();
        dst.extend_from_slice(body);
        if self.ctr(&j0, &mut dst[start..]).is_err() {
            discard_tail(dst, start);
            return Err(CipherError::Authentication);
        }
        Ok(())
    }
}

/// Increment the low 32 bits of a counter block, wrapping.
fn inc32(block: &mut Block) {
    let mut low = [0u8; 4];
    low.copy_from_slice(&block[12..]);
    let next = u32::from_be_bytes(low).wrapping_add(1);
    block[12..].copy_from_slice(&next.to_be_bytes());
}

fn bit_len(len: usize) -> u64 {
    (len as u64).wrapping_mul(8)
}
