//! Provider handle cache.
//!
//! Opening an algorithm provider is expensive and the handle is safe to share,
//! so each distinct `(algorithm, flags, chaining mode)` combination is opened
//! once and reused for the lifetime of the cache.
//!
//! ## Concurrency
//!
//! Lookups are lock-free on a hit. On a miss the caller opens the provider
//! and runs its init function with no lock held, then inserts through the map
//! entry API. When two callers race on the same key both open, one insert
//! wins, and the loser drops its value (closing its provider) and returns the
//! winner's. Nobody waits on somebody else's backend call.

use crate::CipherError;
use carapace_backend::{Backend, KeyLengths, ProviderFlags, RawHandle, property};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::fmt;
use std::sync::Arc;

/// An open algorithm provider.
///
/// The provider is closed when the handle is dropped.
pub struct ProviderHandle {
    backend: Arc<dyn Backend>,
    raw: RawHandle,
    algorithm: String,
}

impl ProviderHandle {
    /// Open `algorithm` on `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Backend`] if the backend cannot open it.
    pub fn open(
        backend: Arc<dyn Backend>,
        algorithm: &str,
        flags: ProviderFlags,
    ) -> Result<Self, CipherError> {
        let raw = backend.open_algorithm_provider(algorithm, flags)?;
        tracing::debug!("Opened {} provider {:?}", algorithm, raw);
        Ok(Self {
            backend,
            raw,
            algorithm: algorithm.to_string(),
        })
    }

    /// Algorithm identifier this provider was opened for.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Set a string property.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Backend`] on backend failure.
    pub fn set_string(&self, name: &str, value: &str) -> Result<(), CipherError> {
        Ok(property::set_string(self.backend.as_ref(), self.raw, name, value)?)
    }

    /// Read a `u32` property.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Backend`] on backend failure.
    pub fn get_u32(&self, name: &str) -> Result<u32, CipherError> {
        Ok(property::get_u32(self.backend.as_ref(), self.raw, name)?)
    }

    /// Read the raw key-length table.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Backend`] on backend failure.
    pub fn key_lengths(&self) -> Result<KeyLengths, CipherError> {
        Ok(property::get_key_lengths(self.backend.as_ref(), self.raw)?)
    }

    pub(crate) fn raw(&self) -> RawHandle {
        self.raw
    }

    pub(crate) fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }
}

impl Drop for ProviderHandle {
    fn drop(&mut self) {
        if let Err(e) = self.backend.close_algorithm_provider(self.raw) {
            tracing::warn!("Failed to close {} provider {:?}: {}", self.algorithm, self.raw, e);
        }
    }
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("algorithm", &self.algorithm)
            .field("raw", &self.raw)
            .finish_non_exhaustive()
    }
}

/// Cache key: one provider per distinct combination.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AlgorithmKey {
    /// Algorithm identifier
    pub id: String,
    /// Flags the provider was opened with
    pub flags: ProviderFlags,
    /// Chaining mode property value
    pub mode: String,
}

/// Cache of opened providers and the state derived from them.
///
/// `V` is whatever the init function builds from a fresh [`ProviderHandle`],
/// typically the handle itself plus validated properties.
pub struct ProviderCache<V> {
    backend: Arc<dyn Backend>,
    entries: DashMap<AlgorithmKey, Arc<V>>,
}

impl<V> ProviderCache<V> {
    /// Create an empty cache over `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            entries: DashMap::new(),
        }
    }

    /// Backend providers are opened on.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Get the cached value for the key, opening a provider on a miss.
    ///
    /// `init` runs only on a miss and owns the provider it is given: if it
    /// fails, dropping the handle closes the provider before the error
    /// reaches the caller.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the provider cannot be opened, or
    /// whatever `init` returns. Nothing is cached on error.
    pub fn acquire<F>(
        &self,
        id: &str,
        flags: ProviderFlags,
        mode: &str,
        init: F,
    ) -> Result<Arc<V>, CipherError>
    where
        F: FnOnce(ProviderHandle) -> Result<V, CipherError>,
    {
        let key = AlgorithmKey {
            id: id.to_string(),
            flags,
            mode: mode.to_string(),
        };

        if let Some(entry) = self.entries.get(&key) {
            tracing::trace!("Provider cache hit for {} {}", id, mode);
            return Ok(Arc::clone(entry.value()));
        }

        let provider = ProviderHandle::open(Arc::clone(&self.backend), id, flags)?;
        let candidate = Arc::new(init(provider)?);

        let winner = match self.entries.entry(key) {
            Entry::Occupied(existing) => Arc::clone(existing.get()),
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&candidate));
                return Ok(candidate);
            }
        };

        // Shard lock is released; dropping the loser closes its provider
        tracing::debug!("Lost provider open race for {} {}, closing duplicate", id, mode);
        drop(candidate);
        Ok(winner)
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> fmt::Debug for ProviderCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCache")
            .field("backend", &self.backend)
            .field("entries", &self.entries.len())
            .finish()
    }
}
