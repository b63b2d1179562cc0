//! Cipher block chaining.

use crate::CipherError;
use crate::traits::{BlockCipher, BlockMode};
use std::fmt;
use zeroize::Zeroizing;

/// Which way a [`Cbc`] instance runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// `C_i = E(P_i xor C_{i-1})`
    Encrypt,
    /// `P_i = D(C_i) xor C_{i-1}`
    Decrypt,
}

/// CBC over a borrowed block cipher.
///
/// The chaining block carries over between calls, so a message may be
/// processed in several pieces.
pub struct Cbc<'a, C: BlockCipher + ?Sized> {
    cipher: &'a C,
    direction: Direction,
    iv: Zeroizing<Vec<u8>>,
    scratch: Zeroizing<Vec<u8>>,
}

impl<'a, C: BlockCipher + ?Sized> Cbc<'a, C> {
    /// Start a CBC stream from `iv`.
    ///
    /// # Panics
    ///
    /// Panics if `iv` is not exactly one block long.
    pub fn new(cipher: &'a C, iv: &[u8], direction: Direction) -> Self {
        let block_size = cipher.block_size();
        assert_eq!(iv.len(), block_size, "IV length must equal block size");
        Self {
            cipher,
            direction,
            iv: Zeroizing::new(iv.to_vec()),
            scratch: Zeroizing::new(vec![0u8; block_size]),
        }
    }

    /// CBC encrypter.
    ///
    /// # Panics
    ///
    /// Panics if `iv` is not exactly one block long.
    pub fn encrypter(cipher: &'a C, iv: &[u8]) -> Self {
        Self::new(cipher, iv, Direction::Encrypt)
    }

    /// CBC decrypter.
    ///
    /// # Panics
    ///
    /// Panics if `iv` is not exactly one block long.
    pub fn decrypter(cipher: &'a C, iv: &[u8]) -> Self {
        Self::new(cipher, iv, Direction::Decrypt)
    }

    /// Direction of this stream.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Current chaining block.
    #[must_use]
    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    /// Restart chaining from `iv`.
    ///
    /// # Panics
    ///
    /// Panics if `iv` is not exactly one block long.
    pub fn set_iv(&mut self, iv: &[u8]) {
        assert_eq!(iv.len(), self.iv.len(), "IV length must equal block size");
        self.iv.copy_from_slice(iv);
    }

    /// Process `buf` in place.
    ///
    /// If the cipher fails partway, blocks before the failing one have been
    /// processed and the chaining block reflects them.
    ///
    /// # Panics
    ///
    /// Panics if `buf` is not a whole number of blocks.
    ///
    /// # Errors
    ///
    /// Returns the cipher's error.
    pub fn crypt_blocks_in_place(&mut self, buf: &mut [u8]) -> Result<(), CipherError> {
        let block_size = self.iv.len();
        assert!(buf.len() % block_size == 0, "input not full blocks");

        for block in buf.chunks_exact_mut(block_size) {
            match self.direction {
                Direction::Encrypt => {
                    self.scratch.copy_from_slice(block);
                    xor_in_place(&mut self.scratch, &self.iv);
                    self.cipher.encrypt_block(block, &self.scratch)?;
                    self.iv.copy_from_slice(block);
                }
                Direction::Decrypt => {
                    self.scratch.copy_from_slice(block);
                    self.cipher.decrypt_block(block, &self.scratch)?;
                    xor_in_place(block, &self.iv);
                    self.iv.copy_from_slice(&self.scratch);
                }
            }
        }
        Ok(())
    }
}

impl<C: BlockCipher + ?Sized> BlockMode for Cbc<'_, C> {
    fn block_size(&self) -> usize {
        self.iv.len()
    }

    fn crypt_blocks(&mut self, dst: &mut [u8], src: &[u8]) -> Result<(), CipherError> {
        assert!(src.len() % self.iv.len() == 0, "input not full blocks");
        assert!(dst.len() >= src.len(), "output smaller than input");
        let out = &mut dst[..src.len()];
        out.copy_from_slice(src);
        self.crypt_blocks_in_place(out)
    }
}

impl<C: BlockCipher + ?Sized> fmt::Debug for Cbc<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cbc")
            .field("direction", &self.direction)
            .field("block_size", &self.iv.len())
            .finish_non_exhaustive()
    }
}

fn xor_in_place(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// XOR with a fixed byte: enough to check chaining without a backend.
    struct XorCipher(u8);

    impl BlockCipher for XorCipher {
        fn block_size(&self) -> usize {
            4
        }

        fn encrypt_block(&self, dst: &mut [u8], src: &[u8]) -> Result<(), CipherError> {
            for (d, s) in dst[..4].iter_mut().zip(&src[..4]) {
                *d = s ^ self.0;
            }
            Ok(())
        }

        fn decrypt_block(&self, dst: &mut [u8], src: &[u8]) -> Result<(), CipherError> {
            self.encrypt_block(dst, src)
        }
    }

    #[test]
    fn test_chaining_feeds_previous_block() {
        let cipher = XorCipher(0xff);
        let mut cbc = Cbc::encrypter(&cipher, &[1, 2, 3, 4]);
        let mut out = [0u8; 8];
        cbc.crypt_blocks(&mut out, &[0u8; 8]).unwrap();

        // C1 = (P1 ^ IV) ^ ff, C2 = (P2 ^ C1) ^ ff
        assert_eq!(&out[..4], &[0xfe, 0xfd, 0xfc, 0xfb]);
        assert_eq!(&out[4..], &[1, 2, 3, 4]);
        assert_eq!(cbc.iv(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_split_calls_match_single_call() {
        let cipher = XorCipher(0x5a);
        let iv = [9u8, 8, 7, 6];
        let plaintext: Vec<u8> = (0u8..24).collect();

        let mut whole = vec![0u8; 24];
        Cbc::encrypter(&cipher, &iv)
            .crypt_blocks(&mut whole, &plaintext)
            .unwrap();

        let mut pieces = vec![0u8; 24];
        let mut cbc = Cbc::encrypter(&cipher, &iv);
        cbc.crypt_blocks(&mut pieces[..8], &plaintext[..8]).unwrap();
        cbc.crypt_blocks(&mut pieces[8..], &plaintext[8..]).unwrap();
        assert_eq!(whole, pieces);

        let mut dec = Cbc::decrypter(&cipher, &iv);
        dec.crypt_blocks_in_place(&mut pieces).unwrap();
        assert_eq!(pieces, plaintext);
    }

    #[test]
    fn test_set_iv_restarts_chain() {
        let cipher = XorCipher(0x11);
        let mut cbc = Cbc::encrypter(&cipher, &[0u8; 4]);
        let mut first = [0u8; 4];
        cbc.crypt_blocks(&mut first, &[7u8; 4]).unwrap();

        cbc.set_iv(&[0u8; 4]);
        let mut second = [0u8; 4];
        cbc.crypt_blocks(&mut second, &[7u8; 4]).unwrap();
        assert_eq!(first, second);
        assert_eq!(cbc.direction(), Direction::Encrypt);
    }

    #[test]
    fn test_empty_input_is_noop() {
        let cipher = XorCipher(0x11);
        let mut cbc = Cbc::decrypter(&cipher, &[3u8; 4]);
        cbc.crypt_blocks(&mut [], &[]).unwrap();
        assert_eq!(cbc.iv(), &[3u8; 4]);
    }

    #[test]
    #[should_panic(expected = "IV length must equal block size")]
    fn test_wrong_iv_length_panics() {
        let _ = Cbc::encrypter(&XorCipher(0), &[0u8; 5]);
    }

    #[test]
    #[should_panic(expected = "input not full blocks")]
    fn test_partial_block_panics() {
        let cipher = XorCipher(0);
        let mut cbc = Cbc::encrypter(&cipher, &[0u8; 4]);
        let _ = cbc.crypt_blocks(&mut [0u8; 8], &[0u8; 6]);
    }

    #[test]
    #[should_panic(expected = "output smaller than input")]
    fn test_short_output_panics() {
        let cipher = XorCipher(0);
        let mut cbc = Cbc::encrypter(&cipher, &[0u8; 4]);
        let _ = cbc.crypt_blocks(&mut [0u8; 4], &[0u8; 8]);
    }
}
