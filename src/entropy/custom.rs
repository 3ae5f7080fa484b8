//! Custom User-Provided Entropy Source.
//!
//! Replays injected bytes in order. Useful for feeding externally gathered
//! entropy into a provider, and for driving generators with a known byte
//! sequence.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{EntropyError, EntropySource, Usability};

/// Source that buffers user-injected entropy.
pub struct CustomSource {
    buffer: Mutex<VecDeque<u8>>,
    usability: Usability,
    available: AtomicBool,
    calls: AtomicUsize,
}

impl CustomSource {
    /// Creates a new empty source whose output is reported as `Unverified`.
    pub fn new() -> Self {
        Self::with_usability(Usability::Unverified)
    }

    /// Creates a new empty source reporting the given usability.
    pub fn with_usability(usability: Usability) -> Self {
        Self {
            buffer: Mutex::new(VecDeque::new()),
            usability,
            available: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    /// Add entropy bytes to the pool.
    pub fn add_bytes(&self, bytes: &[u8]) {
        self.lock().extend(bytes.iter().copied());
    }

    /// Marks the source as present or absent for availability probes.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// Number of `fill` calls served so far, successful or not.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Acquire)
    }

    /// Bytes still buffered.
    pub fn remaining(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<u8>> {
        // The queue stays consistent even if a holder panicked.
        self.buffer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for CustomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropySource for CustomSource {
    fn name(&self) -> &'static str {
        "CustomInput"
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    fn fill(&self, dest: &mut [u8]) -> Result<Usability, EntropyError> {
        self.calls.fetch_add(1, Ordering::AcqRel);

        let mut buffer = self.lock();
        if buffer.len() < dest.len() {
            return Err(EntropyError::Exhausted);
        }
        let wanted = dest.len();
        for (d, s) in dest.iter_mut().zip(buffer.drain(..wanted)) {
            *d = s;
        }
        Ok(self.usability)
    }

    fn entropy_estimate(&self) -> f64 {
        // User input entropy quality is unknown.
        2.0
    }
}
