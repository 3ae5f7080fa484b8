//! Hash-Timing Entropy Source.
//!
//! Harvests entropy from CPU execution timing variations (jitter) and
//! condenses it with BLAKE3. Sources of jitter include:
//! - Cache misses (L1/L2/L3)
//! - Pipeline stalls
//! - Branch prediction misses
//! - OS interrupts/scheduler behavior
//!
//! This is the plugin the fallback generator is built from when no OS source
//! is usable. It is statistically random, not a cryptographic source.
//!
//! # Design
//! - **Timestamp Source**: `rdtsc` (x86) or `cntvct_el0` (ARM), falling back to
//!   a monotonic clock elsewhere.
//! - **Oscillator**: Executes a short CPU loop and measures execution time.
//! - **Condensing**: Every 32-byte output block hashes `rounds` timing deltas,
//!   chained to the previous block's digest.

use zeroize::Zeroizing;

use super::{EntropyError, EntropySource, Usability};

/// Default number of timing samples hashed per output block.
pub const DEFAULT_ROUNDS: u32 = 64;

const BLOCK_LEN: usize = blake3::OUT_LEN;

/// Timing-jitter source condensed through BLAKE3.
#[derive(Debug, Clone, Copy)]
pub struct HashTimingSource {
    rounds: u32,
}

impl HashTimingSource {
    /// Creates a source hashing [`DEFAULT_ROUNDS`] samples per block.
    pub fn new() -> Self {
        Self::with_rounds(DEFAULT_ROUNDS)
    }

    /// Creates a source hashing `rounds` samples per block (at least 1).
    pub fn with_rounds(rounds: u32) -> Self {
        Self {
            rounds: rounds.max(1),
        }
    }

    /// Reads a high-resolution timestamp.
    #[inline(always)]
    fn get_timestamp() -> u64 {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            #[cfg(target_arch = "x86")]
            use core::arch::x86::_rdtsc;
            #[cfg(target_arch = "x86_64")]
            use core::arch::x86_64::_rdtsc;

            // Safety: _rdtsc is available on all modern x86/x64 CPUs (Pentium+).
            unsafe { _rdtsc() }
        }

        #[cfg(target_arch = "aarch64")]
        {
            // Use CNTVCT_EL0 (Virtual Count Register)
            let mut cnt: u64;
            unsafe {
                core::arch::asm!("mrs {}, cntvct_el0", out(reg) cnt);
            }
            cnt
        }

        #[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
        {
            use std::sync::OnceLock;
            use std::time::Instant;

            static EPOCH: OnceLock<Instant> = OnceLock::new();
            EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as u64
        }
    }

    /// Performs a tiny amount of CPU-intensive work to induce jitter.
    #[inline(always)]
    fn jitter_loop() {
        let mut x = 0u64;
        for i in 0..10 {
            x = x.wrapping_add(i);
            core::hint::black_box(x);
        }
    }

    fn timer_works() -> bool {
        let t1 = Self::get_timestamp();
        Self::jitter_loop();
        let t2 = Self::get_timestamp();
        !(t1 == t2 && t1 == 0)
    }
}

impl Default for HashTimingSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropySource for HashTimingSource {
    fn name(&self) -> &'static str {
        "HashTiming"
    }

    fn is_available(&self) -> bool {
        Self::timer_works()
    }

    fn fill(&self, dest: &mut [u8]) -> Result<Usability, EntropyError> {
        if !Self::timer_works() {
            return Err(EntropyError::NotSupported);
        }

        let mut chain = Zeroizing::new([0u8; BLOCK_LEN]);
        for block in dest.chunks_mut(BLOCK_LEN) {
            let mut hasher = blake3::Hasher::new();
            hasher.update(&chain[..]);
            for _ in 0..self.rounds {
                let start = Self::get_timestamp();
                Self::jitter_loop();
                let end = Self::get_timestamp();
                hasher.update(&end.wrapping_sub(start).to_le_bytes());
                hasher.update(&end.to_le_bytes());
            }
            chain.copy_from_slice(hasher.finalize().as_bytes());
            block.copy_from_slice(&chain[..block.len()]);
        }

        Ok(Usability::Unverified)
    }

    fn entropy_estimate(&self) -> f64 {
        // CPU jitter quality varies wildly; stay conservative.
        2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_timing_fill() {
        let source = HashTimingSource::new();
        let mut buf = [0u8; 100];
        match source.fill(&mut buf) {
            Ok(usability) => {
                assert_eq!(usability, Usability::Unverified);
                assert!(buf.iter().any(|&x| x != 0), "HashTiming produced all zeros");
            }
            Err(EntropyError::NotSupported) => {
                #[cfg(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64"))]
                panic!("HashTiming should be supported on this architecture");
            }
            Err(e) => panic!("HashTiming failed: {:?}", e),
        }
    }

    #[test]
    fn test_hash_timing_blocks_differ() {
        let source = HashTimingSource::with_rounds(4);
        let mut a = [0u8; 64];
        let mut b = [0u8; 64];
        if source.fill(&mut a).is_err() || source.fill(&mut b).is_err() {
            return;
        }
        assert_ne!(&a[..32], &a[32..]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_zero_rounds_clamped() {
        let source = HashTimingSource::with_rounds(0);
        assert_eq!(source.rounds, 1);
    }
}
