//! Kernel urandom device source.
//!
//! Secondary tier: reads from `/dev/urandom` (or another device path) when the
//! primary OS call is unavailable. The device is opened per request, so a
//! chroot or sandbox that hides it is noticed immediately.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::{EntropyError, EntropySource, Usability};

/// Default location of the kernel urandom device.
pub const DEFAULT_URANDOM_PATH: &str = "/dev/urandom";

/// Entropy source backed by a urandom-style character device.
#[derive(Debug, Clone)]
pub struct UrandomSource {
    path: PathBuf,
}

impl UrandomSource {
    /// Creates a source reading from [`DEFAULT_URANDOM_PATH`].
    pub fn new() -> Self {
        Self::with_path(DEFAULT_URANDOM_PATH)
    }

    /// Creates a source reading from the given device path.
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Device path this source reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for UrandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropySource for UrandomSource {
    fn name(&self) -> &'static str {
        "Urandom"
    }

    fn is_available(&self) -> bool {
        File::open(&self.path).is_ok()
    }

    fn fill(&self, dest: &mut [u8]) -> Result<Usability, EntropyError> {
        let mut device = File::open(&self.path).map_err(|e| {
            log::debug!("cannot open {}: {}", self.path.display(), e);
            EntropyError::NotSupported
        })?;

        // A short read means the device is not what we expect; reject it.
        device.read_exact(dest).map_err(|e| {
            log::debug!("short read from {}: {}", self.path.display(), e);
            EntropyError::CollectionFailed
        })?;

        Ok(Usability::Cryptographic)
    }

    fn entropy_estimate(&self) -> f64 {
        8.0
    }
}
