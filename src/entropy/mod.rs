//! Entropy sources and their registry.
//!
//! This module defines the interface every entropy tier implements, the
//! concrete OS-backed sources, and the timing-jitter plugin that feeds the
//! fallback generator.
//!
//! # Design
//! - **Capability, not object**: a source only knows how to fill a buffer and
//!   whether the bytes it produced are fit for cryptography.
//! - **Probed per call**: `is_available` is asked on every request, so a
//!   source that disappears at runtime is simply skipped.
//! - **Shared**: sources take `&self` and are `Send + Sync` so a single
//!   provider can serve concurrent callers.

pub mod custom;
pub mod jitter;
pub mod os;
pub mod sources;
pub mod urandom;

use core::fmt;
use std::sync::Arc;

/// Error types for entropy collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntropyError {
    /// Failed to collect sufficient entropy bytes.
    CollectionFailed,
    /// Source is exhausted (e.g., fixed buffer).
    Exhausted,
    /// Platform not supported.
    NotSupported,
}

impl fmt::Display for EntropyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntropyError::CollectionFailed => write!(f, "Failed to collect entropy"),
            EntropyError::Exhausted => write!(f, "Entropy source exhausted"),
            EntropyError::NotSupported => write!(f, "Entropy source not supported on this platform"),
        }
    }
}

impl std::error::Error for EntropyError {}

/// Whether bytes returned by a source may be used for cryptography.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usability {
    /// The platform confirmed the bytes come from a CSPRNG.
    Cryptographic,
    /// Statistically random only.
    Unverified,
}

/// A trait for entropy sources.
pub trait EntropySource: Send + Sync {
    /// Returns a unique identifier for the source.
    fn name(&self) -> &'static str;

    /// Probes whether the source can currently be used.
    fn is_available(&self) -> bool {
        true
    }

    /// Fills all of `dest` with random bytes from the source.
    ///
    /// # Returns
    /// * `Ok(Usability)` when every byte of `dest` was written.
    /// * `Err(EntropyError)` if the source fails; `dest` contents are then unspecified.
    fn fill(&self, dest: &mut [u8]) -> Result<Usability, EntropyError>;

    /// Returns the estimated entropy per byte (in bits, 0.0-8.0).
    ///
    /// A plugin estimating 0.0 contributes nothing and is left out of the
    /// fallback generator.
    fn entropy_estimate(&self) -> f64;
}

impl<S: EntropySource + ?Sized> EntropySource for Arc<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn fill(&self, dest: &mut [u8]) -> Result<Usability, EntropyError> {
        (**self).fill(dest)
    }

    fn entropy_estimate(&self) -> f64 {
        (**self).entropy_estimate()
    }
}
