//! The backend trait.

use crate::{BackendError, ProviderFlags, RawHandle};
use std::fmt;

/// Opaque block-cipher backend.
///
/// Mirrors the call surface of a native cryptographic provider: handles are
/// opened and closed explicitly, and every call reports a status. The backend
/// must tolerate concurrent calls on distinct handles; calls on the same key
/// handle may be issued from any thread but never concurrently.
///
/// Closing a handle twice, or using a closed handle, must fail with
/// [`Status::InvalidHandle`](crate::Status::InvalidHandle) rather than
/// touching freed state.
pub trait Backend: Send + Sync + fmt::Debug {
    /// Open an algorithm provider.
    ///
    /// # Errors
    ///
    /// `NotFound` when the algorithm is unavailable.
    fn open_algorithm_provider(
        &self,
        algorithm: &str,
        flags: ProviderFlags,
    ) -> Result<RawHandle, BackendError>;

    /// Close an algorithm provider.
    ///
    /// # Errors
    ///
    /// `InvalidHandle` when `provider` is not an open provider.
    fn close_algorithm_provider(&self, provider: RawHandle) -> Result<(), BackendError>;

    /// Import raw key bytes as a key object bound to `provider`.
    ///
    /// The key takes the chaining mode the provider had when it was imported.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for unsupported key sizes.
    fn import_key(&self, provider: RawHandle, secret: &[u8]) -> Result<RawHandle, BackendError>;

    /// Destroy a key object.
    ///
    /// # Errors
    ///
    /// `InvalidHandle` when `key` is not a live key.
    fn destroy_key(&self, key: RawHandle) -> Result<(), BackendError>;

    /// Read a property into `out`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// `NotSupported` for unknown properties, `BufferTooSmall` when `out`
    /// cannot hold the value.
    fn get_property(&self, handle: RawHandle, name: &str, out: &mut [u8]) -> Result<usize, BackendError>;

    /// Set a property.
    ///
    /// # Errors
    ///
    /// `NotSupported` for unknown properties or values.
    fn set_property(&self, handle: RawHandle, name: &str, value: &[u8]) -> Result<(), BackendError>;

    /// Encrypt whole blocks with an ECB key, returning bytes written.
    ///
    /// # Errors
    ///
    /// `InvalidBufferSize` unless `input` is a multiple of the block length,
    /// `BufferTooSmall` when `output` is shorter than `input`.
    fn encrypt(&self, key: RawHandle, input: &[u8], output: &mut [u8]) -> Result<usize, BackendError>;

    /// Decrypt whole blocks with an ECB key, returning bytes written.
    ///
    /// # Errors
    ///
    /// As for [`Backend::encrypt`].
    fn decrypt(&self, key: RawHandle, input: &[u8], output: &mut [u8]) -> Result<usize, BackendError>;

    /// AEAD-encrypt `buffer` in place with a GCM key, writing the tag.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for unsupported nonce or tag lengths.
    fn aead_encrypt(
        &self,
        key: RawHandle,
        nonce: &[u8],
        aad: &[u8],
        buffer: &mut [u8],
        tag: &mut [u8],
    ) -> Result<(), BackendError>;

    /// AEAD-decrypt `buffer` in place with a GCM key, verifying `tag`.
    ///
    /// # Errors
    ///
    /// `AuthTagMismatch` when verification fails.
    fn aead_decrypt(
        &self,
        key: RawHandle,
        nonce: &[u8],
        aad: &[u8],
        buffer: &mut [u8],
        tag: &[u8],
    ) -> Result<(), BackendError>;

    /// Whether the backend runs in FIPS-approved mode.
    ///
    /// # Errors
    ///
    /// Propagates the backend status.
    fn fips_enabled(&self) -> Result<bool, BackendError>;
}
