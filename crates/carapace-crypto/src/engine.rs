//! Engine: a backend plus its provider cache.

use crate::CipherError;
use crate::aes::{AesAlgorithm, AesCipher};
use crate::cache::ProviderCache;
use carapace_backend::property::AES_ALGORITHM;
use carapace_backend::{Backend, ChainingMode, ProviderFlags, SoftBackend};
use std::fmt;
use std::sync::{Arc, LazyLock};

static GLOBAL: LazyLock<Engine> = LazyLock::new(|| {
    tracing::debug!("Initializing global engine over the software backend");
    Engine::new(Arc::new(SoftBackend::default()))
});

/// Entry point for creating ciphers.
///
/// Cheap to clone; clones share one provider cache. Every cipher created
/// through an engine keeps the engine alive.
#[derive(Clone)]
pub struct Engine {
    providers: Arc<ProviderCache<AesAlgorithm>>,
}

impl Engine {
    /// Create an engine over `backend` with an empty provider cache.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            providers: Arc::new(ProviderCache::new(backend)),
        }
    }

    /// Process-wide engine over a default [`SoftBackend`].
    #[must_use]
    pub fn global() -> &'static Engine {
        &GLOBAL
    }

    /// The backend this engine drives.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn Backend> {
        self.providers.backend()
    }

    /// Whether the backend enforces FIPS mode.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Backend`] if the query fails.
    pub fn fips(&self) -> Result<bool, CipherError> {
        Ok(self.backend().fips_enabled()?)
    }

    /// Create an AES block cipher from `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKeySize`] for a key length the provider
    /// does not allow, or the error from opening or importing.
    pub fn new_aes_cipher(&self, key: &[u8]) -> Result<AesCipher, CipherError> {
        AesCipher::new(self.clone(), key)
    }

    /// Number of providers held in the cache.
    #[must_use]
    pub fn cached_providers(&self) -> usize {
        self.providers.len()
    }

    pub(crate) fn aes(&self, mode: ChainingMode) -> Result<Arc<AesAlgorithm>, CipherError> {
        self.providers.acquire(
            AES_ALGORITHM,
            ProviderFlags::NONE,
            mode.as_str(),
            |provider| AesAlgorithm::open(provider, mode),
        )
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("providers", &self.providers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carapace_backend::{SoftConfig, Status};

    #[test]
    fn test_providers_opened_lazily_per_mode() {
        let soft = Arc::new(SoftBackend::default());
        let engine = Engine::new(soft.clone());
        assert_eq!(engine.cached_providers(), 0);

        let a = engine.new_aes_cipher(&[1u8; 16]).unwrap();
        let b = engine.new_aes_cipher(&[2u8; 32]).unwrap();
        assert_eq!(engine.cached_providers(), 1);
        assert_eq!(soft.providers_opened(), 1);

        let _gcm = a.new_gcm_standard().unwrap();
        assert_eq!(engine.cached_providers(), 2);
        assert_eq!(soft.open_keys(), 3);

        drop((a, b));
    }

    #[test]
    fn test_fips_reflects_backend() {
        let mut config = SoftConfig::default();
        config.fips_mode = true;
        let engine = Engine::new(Arc::new(SoftBackend::new(config)));
        assert!(engine.fips().unwrap());
        assert!(!Engine::new(Arc::new(SoftBackend::default())).fips().unwrap());
    }

    #[test]
    fn test_disabled_algorithm_surfaces_backend_error() {
        let mut config = SoftConfig::default();
        config.disabled_algorithms = vec![AES_ALGORITHM.to_string()];
        let engine = Engine::new(Arc::new(SoftBackend::new(config)));

        let err = engine.new_aes_cipher(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, CipherError::Backend(e) if e.status == Status::NotFound));
        assert_eq!(engine.cached_providers(), 0);
    }

    #[test]
    fn test_global_engine_is_shared() {
        let a = Engine::global();
        let b = Engine::global();
        assert!(std::ptr::eq(a, b));
        assert!(a.new_aes_cipher(&[0u8; 24]).is_ok());
    }
}
