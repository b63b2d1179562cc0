//! # Carapace Backend
//!
//! The seam between the Carapace cipher-mode engine and the block-cipher
//! implementation underneath it.
//!
//! This crate provides:
//! - The [`Backend`] trait: provider and key handles, properties, raw block
//!   and AEAD calls, FIPS-mode query
//! - Opaque [`RawHandle`]s and [`ProviderFlags`]
//! - Property names and marshaling helpers ([`property`])
//! - [`SoftBackend`], an in-process AES backend with native-style handle
//!   tables and leak counters
//! - [`SoftConfig`], its TOML-loadable configuration
//!
//! ## Property Formats
//!
//! | Property | Layout |
//! |----------|--------|
//! | `ChainingMode` | NUL-terminated UTF-16LE |
//! | `KeyLengths` | `u32` min, max, increment (LE) |
//! | `KeyLength` | `u32` bits (LE) |
//! | `BlockLength` | `u32` bytes (LE) |

#![warn(missing_docs)]
#![warn(clippy::all)]

mod backend;
pub mod config;
pub mod error;
pub mod handle;
pub mod property;
pub mod soft;

pub use backend::Backend;
pub use config::{AesConfig, SoftConfig};
pub use error::{BackendError, ConfigError, Status};
pub use handle::{ProviderFlags, RawHandle};
pub use property::{ChainingMode, KeyLengths};
pub use soft::SoftBackend;
