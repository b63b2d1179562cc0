//! # Carapace Crypto
//!
//! Cipher modes over a pluggable block-cipher backend.
//!
//! This crate provides:
//! - A provider-handle cache that opens each algorithm configuration once
//!   and shares it between all callers
//! - RAII key handles with key-size policy read from the provider
//! - AES single-block encryption
//! - CBC with chaining state carried between calls
//! - AES-GCM through the backend AEAD call, or over the block cipher for
//!   non-standard nonce and tag sizes
//! - AES-GCM for TLS 1.2 records with strictly increasing nonces
//!
//! ## Modes
//!
//! | Mode | Type | Nonce | Tag |
//! |------|------|-------|-----|
//! | ECB (single block) | [`AesCipher`] | - | - |
//! | CBC | [`Cbc`] | IV, 16 bytes | - |
//! | GCM | [`Gcm`] | 12 bytes (or any, with a 16-byte tag) | 16 bytes (12-16 with a 12-byte nonce) |
//! | GCM for TLS | [`GcmTls`] | 12 bytes, increasing | 16 bytes |
//!
//! ## Usage
//!
//! ```ignore
//! use carapace_crypto::{Aead, new_aes_cipher};
//!
//! let cipher = new_aes_cipher(&key)?;
//! let mut gcm = cipher.new_gcm_standard()?;
//! let sealed = gcm.seal(&nonce, b"secret", b"aad")?;
//! let opened = gcm.open(&nonce, &sealed, b"aad")?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aes;
pub mod cache;
pub mod cbc;
pub mod engine;
pub mod error;
pub mod gcm;
pub mod key;
pub mod traits;

pub use aes::AesCipher;
pub use cache::{AlgorithmKey, ProviderCache, ProviderHandle};
pub use cbc::{Cbc, Direction};
pub use engine::Engine;
pub use error::CipherError;
pub use gcm::{GCM_STANDARD_NONCE_SIZE, GCM_TAG_SIZE, Gcm, GcmTls, GenericGcm};
pub use key::{AllowedKeyLengths, KeyHandle};
pub use traits::{Aead, BlockCipher, BlockMode};

/// AES block size
pub const AES_BLOCK_SIZE: usize = 16;

/// Create an AES cipher on the process-wide engine.
///
/// # Errors
///
/// See [`Engine::new_aes_cipher`].
pub fn new_aes_cipher(key: &[u8]) -> Result<AesCipher, CipherError> {
    Engine::global().new_aes_cipher(key)
}

/// Whether the process-wide engine's backend runs in FIPS mode.
///
/// # Errors
///
/// Returns [`CipherError::Backend`] if the query fails.
pub fn fips() -> Result<bool, CipherError> {
    Engine::global().fips()
}
