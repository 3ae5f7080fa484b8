//! Operating System CSPRNG Source.
//!
//! Primary tier: asks the kernel CSPRNG (`getrandom(2)`, `BCryptGenRandom`,
//! `getentropy`, ... via `rand_core::OsRng`) for bytes. Output is reported as
//! cryptographic only when the OS call itself succeeds.

use rand_core::{OsRng, RngCore};

use super::{EntropyError, EntropySource, Usability};

/// OS-backed cryptographic entropy source.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSource {
    _private: (),
}

impl OsSource {
    /// Creates a new OS source handle.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl EntropySource for OsSource {
    fn name(&self) -> &'static str {
        "OsRng"
    }

    fn fill(&self, dest: &mut [u8]) -> Result<Usability, EntropyError> {
        match OsRng.try_fill_bytes(dest) {
            Ok(()) => Ok(Usability::Cryptographic),
            Err(e) => {
                log::debug!("OS CSPRNG refused {} bytes: {}", dest.len(), e);
                Err(EntropyError::CollectionFailed)
            }
        }
    }

    fn entropy_estimate(&self) -> f64 {
        8.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_source_fill() {
        let source = OsSource::new();
        let mut buf = [0u8; 64];
        assert_eq!(source.fill(&mut buf), Ok(Usability::Cryptographic));
        assert!(buf.iter().any(|&x| x != 0), "OsRng produced all zeros");
    }

    #[test]
    fn test_os_source_distinct_outputs() {
        let source = OsSource::new();
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        source.fill(&mut a).unwrap();
        source.fill(&mut b).unwrap();
        assert_ne!(a, b);
    }
}
