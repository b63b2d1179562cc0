//! Software backend.
//!
//! Implements [`Backend`] in-process with the RustCrypto `aes` and `aes-gcm`
//! crates. Providers and keys live in handle tables, so the same discipline a
//! native provider demands applies here: every handle is closed exactly once,
//! closed handles are rejected, and the live-handle counters make leaks
//! observable.

use crate::property::{self, AES_ALGORITHM, BLOCK_LENGTH, CHAINING_MODE, KEY_LENGTH, KEY_LENGTHS};
use crate::{
    Backend, BackendError, ChainingMode, ConfigError, ProviderFlags, RawHandle, SoftConfig, Status,
};
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256, Block};
use aes_gcm::aead::AeadInPlace;
use aes_gcm::aead::consts::U12;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm};
use dashmap::DashMap;
use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

type Aes192Gcm = AesGcm<Aes192, U12>;

/// AES block length in bytes.
const AES_BLOCK_LEN: usize = 16;

/// Only 96-bit nonces are accepted by the AEAD path.
const GCM_NONCE_LEN: usize = 12;

/// Only full 128-bit tags are produced by the AEAD path.
const GCM_TAG_LEN: usize = 16;

struct Provider {
    mode: ChainingMode,
}

enum BlockKey {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl BlockKey {
    fn new(secret: &[u8]) -> Result<Self, BackendError> {
        let invalid = |_| BackendError::new("ImportKey", Status::InvalidParameter);
        match secret.len() {
            16 => Aes128::new_from_slice(secret).map(Self::Aes128).map_err(invalid),
            24 => Aes192::new_from_slice(secret).map(Self::Aes192).map_err(invalid),
            32 => Aes256::new_from_slice(secret).map(Self::Aes256).map_err(invalid),
            _ => Err(BackendError::new("ImportKey", Status::InvalidParameter)),
        }
    }

    fn encrypt(&self, block: &mut Block) {
        match self {
            Self::Aes128(k) => k.encrypt_block(block),
            Self::Aes192(k) => k.encrypt_block(block),
            Self::Aes256(k) => k.encrypt_block(block),
        }
    }

    fn decrypt(&self, block: &mut Block) {
        match self {
            Self::Aes128(k) => k.decrypt_block(block),
            Self::Aes192(k) => k.decrypt_block(block),
            Self::Aes256(k) => k.decrypt_block(block),
        }
    }
}

enum GcmKey {
    Aes128(Box<Aes128Gcm>),
    Aes192(Box<Aes192Gcm>),
    Aes256(Box<Aes256Gcm>),
}

impl GcmKey {
    fn new(secret: &[u8]) -> Result<Self, BackendError> {
        let invalid = |_| BackendError::new("ImportKey", Status::InvalidParameter);
        match secret.len() {
            16 => Aes128Gcm::new_from_slice(secret)
                .map(|k| Self::Aes128(Box::new(k)))
                .map_err(invalid),
            24 => Aes192Gcm::new_from_slice(secret)
                .map(|k| Self::Aes192(Box::new(k)))
                .map_err(invalid),
            32 => Aes256Gcm::new_from_slice(secret)
                .map(|k| Self::Aes256(Box::new(k)))
                .map_err(invalid),
            _ => Err(BackendError::new("ImportKey", Status::InvalidParameter)),
        }
    }

    fn seal(&self, nonce: &[u8], aad: &[u8], buffer: &mut [u8]) -> Result<aes_gcm::Tag, aes_gcm::Error> {
        let nonce: &aes_gcm::Nonce<U12> = aes_gcm::Nonce::from_slice(nonce);
        match self {
            Self::Aes128(k) => k.encrypt_in_place_detached(nonce, aad, buffer),
            Self::Aes192(k) => k.encrypt_in_place_detached(nonce, aad, buffer),
            Self::Aes256(k) => k.encrypt_in_place_detached(nonce, aad, buffer),
        }
    }

    fn open(&self, nonce: &[u8], aad: &[u8], buffer: &mut [u8], tag: &[u8]) -> Result<(), aes_gcm::Error> {
        let nonce: &aes_gcm::Nonce<U12> = aes_gcm::Nonce::from_slice(nonce);
        let tag: &aes_gcm::Tag = aes_gcm::Tag::from_slice(tag);
        match self {
            Self::Aes128(k) => k.decrypt_in_place_detached(nonce, aad, buffer, tag),
            Self::Aes192(k) => k.decrypt_in_place_detached(nonce, aad, buffer, tag),
            Self::Aes256(k) => k.decrypt_in_place_detached(nonce, aad, buffer, tag),
        }
    }
}

enum KeyMaterial {
    Ecb(BlockKey),
    Gcm(GcmKey),
}

struct KeyObject {
    provider: RawHandle,
    bits: u32,
    material: KeyMaterial,
}

/// In-process AES backend with native-style handle tables.
pub struct SoftBackend {
    config: SoftConfig,
    next_handle: AtomicU64,
    providers: DashMap<RawHandle, Provider>,
    keys: DashMap<RawHandle, KeyObject>,
    providers_opened: AtomicUsize,
    keys_imported: AtomicUsize,
}

impl SoftBackend {
    /// Create a backend after checking `config` with [`SoftConfig::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the configuration is out of range.
    pub fn try_new(config: SoftConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        tracing::debug!(
            "soft backend configured: block_length={} fips_mode={}",
            config.aes.block_length,
            config.fips_mode
        );
        Ok(Self::new(config))
    }

    /// Create a backend with the given configuration.
    ///
    /// The configuration is taken as is. Out-of-range values such as a zero
    /// block length are reported by the backend's properties and only fail
    /// once a caller reads them. Use [`SoftBackend::try_new`] to reject them
    /// up front.
    #[must_use]
    pub fn new(config: SoftConfig) -> Self {
        Self {
            config,
            next_handle: AtomicU64::new(0),
            providers: DashMap::new(),
            keys: DashMap::new(),
            providers_opened: AtomicUsize::new(0),
            keys_imported: AtomicUsize::new(0),
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SoftConfig {
        &self.config
    }

    /// Number of provider handles currently open.
    #[must_use]
    pub fn open_providers(&self) -> usize {
        self.providers.len()
    }

    /// Number of key handles currently live.
    #[must_use]
    pub fn open_keys(&self) -> usize {
        self.keys.len()
    }

    /// Total provider opens since creation, including ones since closed.
    #[must_use]
    pub fn providers_opened(&self) -> usize {
        self.providers_opened.load(Ordering::Relaxed)
    }

    /// Total key imports since creation, including ones since destroyed.
    #[must_use]
    pub fn keys_imported(&self) -> usize {
        self.keys_imported.load(Ordering::Relaxed)
    }

    fn issue_handle(&self) -> RawHandle {
        let n = self.next_handle.fetch_add(1, Ordering::Relaxed);
        RawHandle::from(NonZeroU64::MIN.saturating_add(n))
    }

    fn provider_property(&self, provider: &Provider, name: &str) -> Result<Vec<u8>, BackendError> {
        match name {
            KEY_LENGTHS => Ok(self.config.aes.key_lengths.to_bytes().to_vec()),
            BLOCK_LENGTH => Ok(self.config.aes.block_length.to_le_bytes().to_vec()),
            CHAINING_MODE => Ok(property::encode_wide(provider.mode.as_str())),
            _ => Err(BackendError::new("GetProperty", Status::NotSupported)),
        }
    }

    fn key_property(key: &KeyObject, name: &str) -> Result<Vec<u8>, BackendError> {
        match name {
            KEY_LENGTH => Ok(key.bits.to_le_bytes().to_vec()),
            BLOCK_LENGTH => Ok((AES_BLOCK_LEN as u32).to_le_bytes().to_vec()),
            _ => Err(BackendError::new("GetProperty", Status::NotSupported)),
        }
    }

    fn with_block_key<T>(
        &self,
        operation: &'static str,
        key: RawHandle,
        f: impl FnOnce(&BlockKey) -> T,
    ) -> Result<T, BackendError> {
        let entry = self
            .keys
            .get(&key)
            .ok_or(BackendError::new(operation, Status::InvalidHandle))?;
        match &entry.material {
            KeyMaterial::Ecb(k) => Ok(f(k)),
            KeyMaterial::Gcm(_) => Err(BackendError::new(operation, Status::InvalidParameter)),
        }
    }

    fn with_gcm_key<T>(
        &self,
        operation: &'static str,
        key: RawHandle,
        f: impl FnOnce(&GcmKey) -> T,
    ) -> Result<T, BackendError> {
        let entry = self
            .keys
            .get(&key)
            .ok_or(BackendError::new(operation, Status::InvalidHandle))?;
        match &entry.material {
            KeyMaterial::Gcm(k) => Ok(f(k)),
            KeyMaterial::Ecb(_) => Err(BackendError::new(operation, Status::InvalidParameter)),
        }
    }
}

impl Default for SoftBackend {
    fn default() -> Self {
        Self::new(SoftConfig::default())
    }
}

impl fmt::Debug for SoftBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftBackend")
            .field("open_providers", &self.open_providers())
            .field("open_keys", &self.open_keys())
            .field("fips_mode", &self.config.fips_mode)
            .finish()
    }
}

/// Lengths are reported to native providers as 32-bit values.
fn check_ulong(operation: &'static str, len: usize) -> Result<(), BackendError> {
    if u32::try_from(len).is_err() {
        return Err(BackendError::new(operation, Status::InvalidBufferSize));
    }
    Ok(())
}

fn check_blocks(operation: &'static str, input: &[u8], output: &[u8]) -> Result<(), BackendError> {
    check_ulong(operation, input.len())?;
    if input.len() % AES_BLOCK_LEN != 0 {
        return Err(BackendError::new(operation, Status::InvalidBufferSize));
    }
    if output.len() < input.len() {
        return Err(BackendError::new(operation, Status::BufferTooSmall));
    }
    Ok(())
}

fn write_property(value: &[u8], out: &mut [u8]) -> Result<usize, BackendError> {
    if out.len() < value.len() {
        return Err(BackendError::new("GetProperty", Status::BufferTooSmall));
    }
    out[..value.len()].copy_from_slice(value);
    Ok(value.len())
}

impl Backend for SoftBackend {
    fn open_algorithm_provider(
        &self,
        algorithm: &str,
        flags: ProviderFlags,
    ) -> Result<RawHandle, BackendError> {
        if self.config.open_latency_us > 0 {
            std::thread::sleep(Duration::from_micros(self.config.open_latency_us));
        }

        if algorithm != AES_ALGORITHM || self.config.is_disabled(algorithm) {
            return Err(BackendError::new("OpenAlgorithmProvider", Status::NotFound));
        }
        if flags.contains(ProviderFlags::HMAC) {
            return Err(BackendError::new("OpenAlgorithmProvider", Status::NotSupported));
        }

        let handle = self.issue_handle();
        // Native AES providers start out in CBC mode
        self.providers.insert(
            handle,
            Provider {
                mode: ChainingMode::Cbc,
            },
        );
        self.providers_opened.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("Opened provider {:?} for {} (flags {:#x})", handle, algorithm, flags.bits());
        Ok(handle)
    }

    fn close_algorithm_provider(&self, provider: RawHandle) -> Result<(), BackendError> {
        if self.keys.iter().any(|k| k.provider == provider) {
            return Err(BackendError::new("CloseAlgorithmProvider", Status::InvalidParameter));
        }
        self.providers
            .remove(&provider)
            .ok_or(BackendError::new("CloseAlgorithmProvider", Status::InvalidHandle))?;
        tracing::trace!("Closed provider {:?}", provider);
        Ok(())
    }

    fn import_key(&self, provider: RawHandle, secret: &[u8]) -> Result<RawHandle, BackendError> {
        let mode = self
            .providers
            .get(&provider)
            .map(|p| p.mode)
            .ok_or(BackendError::new("ImportKey", Status::InvalidHandle))?;

        check_ulong("ImportKey", secret.len())?;
        let material = match mode {
            ChainingMode::Ecb => KeyMaterial::Ecb(BlockKey::new(secret)?),
            ChainingMode::Gcm => KeyMaterial::Gcm(GcmKey::new(secret)?),
            ChainingMode::Cbc => return Err(BackendError::new("ImportKey", Status::NotSupported)),
        };

        let handle = self.issue_handle();
        self.keys.insert(
            handle,
            KeyObject {
                provider,
                bits: (secret.len() * 8) as u32,
                material,
            },
        );
        self.keys_imported.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("Imported {}-bit {:?} key {:?}", secret.len() * 8, mode, handle);
        Ok(handle)
    }

    fn destroy_key(&self, key: RawHandle) -> Result<(), BackendError> {
        self.keys
            .remove(&key)
            .ok_or(BackendError::new("DestroyKey", Status::InvalidHandle))?;
        tracing::trace!("Destroyed key {:?}", key);
        Ok(())
    }

    fn get_property(&self, handle: RawHandle, name: &str, out: &mut [u8]) -> Result<usize, BackendError> {
        let value = if let Some(provider) = self.providers.get(&handle) {
            self.provider_property(&provider, name)?
        } else if let Some(key) = self.keys.get(&handle) {
            Self::key_property(&key, name)?
        } else {
            return Err(BackendError::new("GetProperty", Status::InvalidHandle));
        };
        write_property(&value, out)
    }

    fn set_property(&self, handle: RawHandle, name: &str, value: &[u8]) -> Result<(), BackendError> {
        let Some(mut provider) = self.providers.get_mut(&handle) else {
            let status = if self.keys.contains_key(&handle) {
                Status::NotSupported
            } else {
                Status::InvalidHandle
            };
            return Err(BackendError::new("SetProperty", status));
        };

        if name != CHAINING_MODE {
            return Err(BackendError::new("SetProperty", Status::NotSupported));
        }
        let mode = property::decode_wide(value)
            .as_deref()
            .and_then(ChainingMode::from_property)
            .ok_or(BackendError::new("SetProperty", Status::NotSupported))?;
        provider.mode = mode;
        Ok(())
    }

    fn encrypt(&self, key: RawHandle, input: &[u8], output: &mut [u8]) -> Result<usize, BackendError> {
        check_blocks("Encrypt", input, output)?;
        self.with_block_key("Encrypt", key, |k| {
            for (src, dst) in input
                .chunks_exact(AES_BLOCK_LEN)
                .zip(output.chunks_exact_mut(AES_BLOCK_LEN))
            {
                let mut block = Block::clone_from_slice(src);
                k.encrypt(&mut block);
                dst.copy_from_slice(&block);
            }
            input.len()
        })
    }

    fn decrypt(&self, key: RawHandle, input: &[u8], output: &mut [u8]) -> Result<usize, BackendError> {
        check_blocks("Decrypt", input, output)?;
        self.with_block_key("Decrypt", key, |k| {
            for (src, dst) in input
                .chunks_exact(AES_BLOCK_LEN)
                .zip(output.chunks_exact_mut(AES_BLOCK_LEN))
            {
                let mut block = Block::clone_from_slice(src);
                k.decrypt(&mut block);
                dst.copy_from_slice(&block);
            }
            input.len()
        })
    }

    fn aead_encrypt(
        &self,
        key: RawHandle,
        nonce: &[u8],
        aad: &[u8],
        buffer: &mut [u8],
        tag: &mut [u8],
    ) -> Result<(), BackendError> {
        if nonce.len() != GCM_NONCE_LEN || tag.len() != GCM_TAG_LEN {
            return Err(BackendError::new("AeadEncrypt", Status::InvalidParameter));
        }
        check_ulong("AeadEncrypt", buffer.len())?;
        check_ulong("AeadEncrypt", aad.len())?;

        let computed = self
            .with_gcm_key("AeadEncrypt", key, |k| k.seal(nonce, aad, buffer))?
            .map_err(|_| BackendError::new("AeadEncrypt", Status::InvalidParameter))?;
        tag.copy_from_slice(&computed);
        Ok(())
    }

    fn aead_decrypt(
        &self,
        key: RawHandle,
        nonce: &[u8],
        aad: &[u8],
        buffer: &mut [u8],
        tag: &[u8],
    ) -> Result<(), BackendError> {
        if nonce.len() != GCM_NONCE_LEN || tag.len() != GCM_TAG_LEN {
            return Err(BackendError::new("AeadDecrypt", Status::InvalidParameter));
        }
        check_ulong("AeadDecrypt", buffer.len())?;
        check_ulong("AeadDecrypt", aad.len())?;

        self.with_gcm_key("AeadDecrypt", key, |k| k.open(nonce, aad, buffer, tag))?
            .map_err(|_| BackendError::new("AeadDecrypt", Status::AuthTagMismatch))
    }

    fn fips_enabled(&self) -> Result<bool, BackendError> {
        Ok(self.config.fips_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{get_key_lengths, get_u32, set_string};

    fn decode_hex(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    fn open_with_mode(backend: &SoftBackend, mode: ChainingMode) -> RawHandle {
        let provider = backend
            .open_algorithm_provider(AES_ALGORITHM, ProviderFlags::NONE)
            .unwrap();
        set_string(backend, provider, CHAINING_MODE, mode.as_str()).unwrap();
        provider
    }

    #[test]
    fn test_open_close_counts() {
        let backend = SoftBackend::default();
        let a = backend
            .open_algorithm_provider(AES_ALGORITHM, ProviderFlags::NONE)
            .unwrap();
        let b = backend
            .open_algorithm_provider(AES_ALGORITHM, ProviderFlags::NONE)
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(backend.open_providers(), 2);

        backend.close_algorithm_provider(a).unwrap();
        backend.close_algorithm_provider(b).unwrap();
        assert_eq!(backend.open_providers(), 0);
        assert_eq!(backend.providers_opened(), 2);
    }

    #[test]
    fn test_double_close_rejected() {
        let backend = SoftBackend::default();
        let h = backend
            .open_algorithm_provider(AES_ALGORITHM, ProviderFlags::NONE)
            .unwrap();
        backend.close_algorithm_provider(h).unwrap();
        let err = backend.close_algorithm_provider(h).unwrap_err();
        assert_eq!(err.status, Status::InvalidHandle);
    }

    #[test]
    fn test_unknown_and_disabled_algorithms() {
        let backend = SoftBackend::default();
        let err = backend
            .open_algorithm_provider("DES", ProviderFlags::NONE)
            .unwrap_err();
        assert_eq!(err.status, Status::NotFound);

        let mut config = SoftConfig::default();
        config.disabled_algorithms.push(AES_ALGORITHM.to_string());
        let backend = SoftBackend::new(config);
        let err = backend
            .open_algorithm_provider(AES_ALGORITHM, ProviderFlags::NONE)
            .unwrap_err();
        assert_eq!(err.status, Status::NotFound);
        assert_eq!(backend.providers_opened(), 0);
    }

    #[test]
    fn test_hmac_flag_not_supported_for_aes() {
        let backend = SoftBackend::default();
        let err = backend
            .open_algorithm_provider(AES_ALGORITHM, ProviderFlags::HMAC)
            .unwrap_err();
        assert_eq!(err.status, Status::NotSupported);
    }

    #[test]
    fn test_provider_properties() {
        let backend = SoftBackend::default();
        let h = open_with_mode(&backend, ChainingMode::Gcm);

        let lengths = get_key_lengths(&backend, h).unwrap();
        assert_eq!((lengths.min, lengths.max, lengths.increment), (128, 256, 64));
        assert_eq!(get_u32(&backend, h, BLOCK_LENGTH).unwrap(), 16);

        let mut buf = [0u8; 64];
        let n = backend.get_property(h, CHAINING_MODE, &mut buf).unwrap();
        assert_eq!(property::decode_wide(&buf[..n]).as_deref(), Some("ChainingModeGCM"));

        let mut small = [0u8; 2];
        let err = backend.get_property(h, KEY_LENGTHS, &mut small).unwrap_err();
        assert_eq!(err.status, Status::BufferTooSmall);

        let err = backend.get_property(h, "ObjectLength", &mut buf).unwrap_err();
        assert_eq!(err.status, Status::NotSupported);

        backend.close_algorithm_provider(h).unwrap();
    }

    #[test]
    fn test_set_unknown_chaining_mode() {
        let backend = SoftBackend::default();
        let h = backend
            .open_algorithm_provider(AES_ALGORITHM, ProviderFlags::NONE)
            .unwrap();
        let err = set_string(&backend, h, CHAINING_MODE, "ChainingModeCFB").unwrap_err();
        assert_eq!(err.status, Status::NotSupported);
        backend.close_algorithm_provider(h).unwrap();
    }

    #[test]
    fn test_import_key_sizes() {
        let backend = SoftBackend::default();
        let h = open_with_mode(&backend, ChainingMode::Ecb);
        for len in [16, 24, 32] {
            let key = backend.import_key(h, &vec![7u8; len]).unwrap();
            assert_eq!(get_u32(&backend, key, KEY_LENGTH).unwrap(), (len * 8) as u32);
            backend.destroy_key(key).unwrap();
        }
        let err = backend.import_key(h, &[1u8]).unwrap_err();
        assert_eq!(err.status, Status::InvalidParameter);
        assert_eq!(backend.open_keys(), 0);
        assert_eq!(backend.keys_imported(), 3);
        backend.close_algorithm_provider(h).unwrap();
    }

    #[test]
    fn test_close_with_live_key_rejected() {
        let backend = SoftBackend::default();
        let h = open_with_mode(&backend, ChainingMode::Ecb);
        let key = backend.import_key(h, &[0u8; 16]).unwrap();

        assert!(backend.close_algorithm_provider(h).is_err());
        backend.destroy_key(key).unwrap();
        assert_eq!(backend.destroy_key(key).unwrap_err().status, Status::InvalidHandle);
        backend.close_algorithm_provider(h).unwrap();
    }

    #[test]
    fn test_ecb_fips197_vector() {
        // FIPS-197 Appendix C.1
        let backend = SoftBackend::default();
        let h = open_with_mode(&backend, ChainingMode::Ecb);
        let key = backend
            .import_key(h, &decode_hex("000102030405060708090a0b0c0d0e0f"))
            .unwrap();

        let plaintext = decode_hex("00112233445566778899aabbccddeeff");
        let mut ciphertext = [0u8; 16];
        backend.encrypt(key, &plaintext, &mut ciphertext).unwrap();
        assert_eq!(ciphertext.to_vec(), decode_hex("69c4e0d86a7b0430d8cdb78070b4c55a"));

        let mut decrypted = [0u8; 16];
        backend.decrypt(key, &ciphertext, &mut decrypted).unwrap();
        assert_eq!(decrypted.to_vec(), plaintext);

        let err = backend.encrypt(key, &plaintext[..15], &mut ciphertext).unwrap_err();
        assert_eq!(err.status, Status::InvalidBufferSize);

        backend.destroy_key(key).unwrap();
        backend.close_algorithm_provider(h).unwrap();
    }

    #[test]
    fn test_aead_roundtrip_and_mismatch() {
        let backend = SoftBackend::default();
        let h = open_with_mode(&backend, ChainingMode::Gcm);
        let key = backend.import_key(h, &[0x42u8; 32]).unwrap();
        let nonce = [0u8; 12];

        let mut buffer = b"attack at dawn".to_vec();
        let mut tag = [0u8; 16];
        backend
            .aead_encrypt(key, &nonce, b"hdr", &mut buffer, &mut tag)
            .unwrap();
        assert_ne!(&buffer[..], b"attack at dawn");

        let mut copy = buffer.clone();
        backend.aead_decrypt(key, &nonce, b"hdr", &mut copy, &tag).unwrap();
        assert_eq!(&copy[..], b"attack at dawn");

        tag[0] ^= 1;
        let err = backend
            .aead_decrypt(key, &nonce, b"hdr", &mut buffer, &tag)
            .unwrap_err();
        assert_eq!(err.status, Status::AuthTagMismatch);

        // ECB operations are not valid on a GCM key
        let mut out = [0u8; 16];
        assert_eq!(
            backend.encrypt(key, &[0u8; 16], &mut out).unwrap_err().status,
            Status::InvalidParameter
        );

        backend.destroy_key(key).unwrap();
        backend.close_algorithm_provider(h).unwrap();
    }

    #[test]
    fn test_aead_rejects_short_nonce() {
        let backend = SoftBackend::default();
        let h = open_with_mode(&backend, ChainingMode::Gcm);
        let key = backend.import_key(h, &[0u8; 16]).unwrap();
        let mut tag = [0u8; 16];
        let err = backend
            .aead_encrypt(key, &[0u8; 8], b"", &mut [], &mut tag)
            .unwrap_err();
        assert_eq!(err.status, Status::InvalidParameter);
        backend.destroy_key(key).unwrap();
        backend.close_algorithm_provider(h).unwrap();
    }

    #[test]
    fn test_cbc_import_not_supported() {
        let backend = SoftBackend::default();
        let h = backend
            .open_algorithm_provider(AES_ALGORITHM, ProviderFlags::NONE)
            .unwrap();
        let err = backend.import_key(h, &[0u8; 16]).unwrap_err();
        assert_eq!(err.status, Status::NotSupported);
        backend.close_algorithm_provider(h).unwrap();
    }

    #[test]
    fn test_fips_mode_reported() {
        let mut config = SoftConfig::default();
        config.fips_mode = true;
        assert!(SoftBackend::new(config).fips_enabled().unwrap());
        assert!(!SoftBackend::default().fips_enabled().unwrap());
    }

    #[test]
    fn test_try_new_validates_config() {
        let mut config = SoftConfig::default();
        config.aes.block_length = 0;
        assert!(matches!(
            SoftBackend::try_new(config.clone()),
            Err(ConfigError::Invalid(_))
        ));

        // Unchecked construction defers the failure to the property read
        let backend = SoftBackend::new(config);
        let h = backend
            .open_algorithm_provider(AES_ALGORITHM, ProviderFlags::NONE)
            .unwrap();
        assert_eq!(get_u32(&backend, h, BLOCK_LENGTH).unwrap(), 0);
        backend.close_algorithm_provider(h).unwrap();

        let backend = SoftBackend::try_new(SoftConfig::default()).unwrap();
        assert_eq!(backend.config(), &SoftConfig::default());
    }
}
