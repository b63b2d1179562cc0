//! Opaque handle and flag types shared by every backend.

use std::fmt;
use std::num::NonZeroU64;
use std::ops::{BitOr, BitOrAssign};

/// Opaque reference to a backend object (algorithm provider or key).
///
/// The value carries no meaning outside the backend that issued it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(NonZeroU64);

impl RawHandle {
    /// Wrap a backend-issued identifier. Returns `None` for zero.
    #[must_use]
    pub fn new(id: u64) -> Option<Self> {
        NonZeroU64::new(id).map(Self)
    }

    /// Backend-issued identifier.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl From<NonZeroU64> for RawHandle {
    fn from(id: NonZeroU64) -> Self {
        Self(id)
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawHandle({:#x})", self.0.get())
    }
}

/// Flags passed when opening an algorithm provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ProviderFlags(u32);

impl ProviderFlags {
    /// No flags.
    pub const NONE: Self = Self(0);

    /// Load the provider in the caller's process (dispatch table).
    pub const PROV_DISPATCH: Self = Self(0x0000_0001);

    /// Open the provider for HMAC use.
    pub const HMAC: Self = Self(0x0000_0008);

    /// Create flags from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ProviderFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ProviderFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}
