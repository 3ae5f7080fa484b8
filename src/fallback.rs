//! Fallback Generator.
//!
//! Combines every registered plugin source into one statistical byte stream.
//! Used only for requests that did not ask for cryptographic strength, once
//! both OS tiers have been ruled out.
//!
//! # Design
//! - **Mixing**: each plugin's output is absorbed into a BLAKE3 derive-key
//!   hasher together with the plugin name and a per-call counter; the XOF
//!   output fills the caller's buffer. One good plugin is enough for a good
//!   stream.
//! - **Partial failure**: a plugin that errors is skipped; the call only fails
//!   when every plugin does.
//! - **Lifecycle**: [`FallbackCell`] builds the generator at most once and
//!   then hands out shared references for the rest of the process.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

use zeroize::Zeroizing;

use crate::config::RandConfig;
use crate::entropy::sources::SourceRegistry;
use crate::entropy::{EntropyError, EntropySource, Usability};
use crate::error::RandError;

const MIX_CONTEXT: &str = "strongrand 2024 fallback generator mix";

/// Statistical generator built from registered plugin sources.
pub struct FallbackGenerator {
    sources: Vec<Box<dyn EntropySource>>,
    counter: AtomicU64,
}

impl FallbackGenerator {
    /// Instantiates every plugin in `registry`, dropping plugins that claim no entropy.
    ///
    /// Fails with [`RandError::MissingFallback`] when no usable plugin remains.
    pub fn from_registry(registry: &SourceRegistry, config: &RandConfig) -> Result<Self, RandError> {
        let sources: Vec<Box<dyn EntropySource>> = registry
            .instantiate(config)
            .into_iter()
            .filter(|source| {
                let keep = source.entropy_estimate() > 0.0;
                if !keep {
                    log::debug!("fallback plugin {} estimates no entropy; skipped", source.name());
                }
                keep
            })
            .collect();

        if sources.is_empty() {
            return Err(RandError::MissingFallback);
        }
        Ok(Self::from_sources(sources))
    }

    fn from_sources(sources: Vec<Box<dyn EntropySource>>) -> Self {
        Self {
            sources,
            counter: AtomicU64::new(0),
        }
    }

    /// Names of the plugins feeding this generator.
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Returns `length` fresh bytes.
    pub fn generate(&self, length: usize) -> Result<Vec<u8>, EntropyError> {
        let mut out = vec![0u8; length];
        self.fill_mixed(&mut out)?;
        Ok(out)
    }

    fn fill_mixed(&self, dest: &mut [u8]) -> Result<(), EntropyError> {
        let mut hasher = blake3::Hasher::new_derive_key(MIX_CONTEXT);
        hasher.update(&self.counter.fetch_add(1, Ordering::Relaxed).to_le_bytes());
        hasher.update(&(dest.len() as u64).to_le_bytes());

        let mut temp_buf = Zeroizing::new(vec![0u8; dest.len()]);
        let mut success_count = 0;

        for source in &self.sources {
            if !source.is_available() {
                continue;
            }
            match source.fill(&mut temp_buf) {
                Ok(_) => {
                    hasher.update(source.name().as_bytes());
                    hasher.update(&temp_buf);
                    success_count += 1;
                }
                Err(e) => log::debug!("fallback plugin {} failed: {}", source.name(), e),
            }
        }

        if success_count == 0 {
            return Err(EntropyError::CollectionFailed);
        }

        hasher.finalize_xof().fill(dest);
        Ok(())
    }
}

impl EntropySource for FallbackGenerator {
    fn name(&self) -> &'static str {
        "Fallback"
    }

    fn is_available(&self) -> bool {
        self.sources.iter().any(|s| s.is_available())
    }

    fn fill(&self, dest: &mut [u8]) -> Result<Usability, EntropyError> {
        self.fill_mixed(dest)?;
        Ok(Usability::Unverified)
    }

    fn entropy_estimate(&self) -> f64 {
        // Sources may not be independent; trust the best one only.
        self.sources
            .iter()
            .map(|s| s.entropy_estimate())
            .fold(0.0, f64::max)
    }
}

impl fmt::Debug for FallbackGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackGenerator")
            .field("sources", &self.source_names())
            .finish_non_exhaustive()
    }
}

/// Lazily-initialized slot holding at most one [`FallbackGenerator`].
pub struct FallbackCell {
    generator: OnceLock<FallbackGenerator>,
    init: Mutex<()>,
}

impl FallbackCell {
    pub const fn new() -> Self {
        Self {
            generator: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// The generator, if it has been built.
    pub fn get(&self) -> Option<&FallbackGenerator> {
        self.generator.get()
    }

    /// Returns the generator, building it from `registry` on first use.
    ///
    /// Concurrent first callers are serialized; exactly one instance is ever
    /// constructed. A failed construction leaves the cell empty so a later call
    /// with a populated registry can succeed.
    pub fn get_or_try_init(
        &self,
        registry: &SourceRegistry,
        config: &RandConfig,
    ) -> Result<&FallbackGenerator, RandError> {
        if let Some(generator) = self.generator.get() {
            return Ok(generator);
        }

        let _guard = self.init.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(generator) = self.generator.get() {
            return Ok(generator);
        }

        let generator = FallbackGenerator::from_registry(registry, config)?;
        log::info!(
            "Fallback generator initialized with sources {:?} (~{:.1} bits/byte)",
            generator.source_names(),
            generator.entropy_estimate()
        );
        Ok(self.generator.get_or_init(move || generator))
    }
}

impl Default for FallbackCell {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FallbackCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackCell")
            .field("generator", &self.generator.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::custom::CustomSource;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn scripted_registry(bytes: &'static [u8]) -> SourceRegistry {
        let mut registry = SourceRegistry::new();
        registry.register("Scripted", move |_: &RandConfig| {
            let source = CustomSource::new();
            source.add_bytes(bytes);
            Box::new(source) as Box<dyn EntropySource>
        });
        registry
    }

    struct SilentSource;

    impl EntropySource for SilentSource {
        fn name(&self) -> &'static str {
            "Silent"
        }

        fn fill(&self, dest: &mut [u8]) -> Result<Usability, EntropyError> {
            dest.fill(0);
            Ok(Usability::Unverified)
        }

        fn entropy_estimate(&self) -> f64 {
            0.0
        }
    }

    #[test]
    fn test_zero_estimate_plugins_are_skipped() {
        let mut registry = SourceRegistry::with_defaults();
        registry.register("Silent", |_: &RandConfig| Box::new(SilentSource) as Box<dyn EntropySource>);

        let generator = FallbackGenerator::from_registry(&registry, &RandConfig::default()).unwrap();
        assert_eq!(generator.source_names(), vec!["HashTiming"]);
        assert_eq!(generator.entropy_estimate(), 2.0);
    }

    #[test]
    fn test_only_zero_estimate_plugins_is_missing_fallback() {
        let mut registry = SourceRegistry::new();
        registry.register("Silent", |_: &RandConfig| Box::new(SilentSource) as Box<dyn EntropySource>);

        let err = FallbackGenerator::from_registry(&registry, &RandConfig::default()).unwrap_err();
        assert_eq!(err, RandError::MissingFallback);
    }

    #[test]
    fn test_empty_registry_is_missing_fallback() {
        let cell = FallbackCell::new();
        let err = cell
            .get_or_try_init(&SourceRegistry::new(), &RandConfig::default())
            .unwrap_err();
        assert_eq!(err, RandError::MissingFallback);
        assert!(cell.get().is_none());
    }

    #[test]
    fn test_generate_exact_length() {
        let generator =
            FallbackGenerator::from_registry(&SourceRegistry::with_defaults(), &RandConfig::default()).unwrap();
        for len in [0usize, 1, 31, 32, 33, 1000] {
            assert_eq!(generator.generate(len).unwrap().len(), len);
        }
    }

    #[test]
    fn test_counter_separates_identical_inputs() {
        // Two sources with identical scripted bytes still give distinct outputs per call.
        let mut registry = SourceRegistry::new();
        registry.register("Constant", |_: &RandConfig| {
            let source = CustomSource::new();
            source.add_bytes(&[7u8; 64]);
            Box::new(source) as Box<dyn EntropySource>
        });
        let generator = FallbackGenerator::from_registry(&registry, &RandConfig::default()).unwrap();

        let a = generator.generate(16).unwrap();
        let b = generator.generate(16).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_all_sources_failing() {
        let generator = FallbackGenerator::from_registry(&scripted_registry(&[]), &RandConfig::default()).unwrap();
        assert_eq!(generator.generate(4), Err(EntropyError::CollectionFailed));
    }

    #[test]
    fn test_partial_failure_still_produces() {
        let mut registry = scripted_registry(&[]);
        registry.register("Timing", |config: &RandConfig| {
            Box::new(crate::entropy::jitter::HashTimingSource::with_rounds(config.hash_timing_rounds))
                as Box<dyn EntropySource>
        });
        let generator = FallbackGenerator::from_registry(&registry, &RandConfig::default()).unwrap();
        assert_eq!(generator.fill(&mut [0u8; 8]), Ok(Usability::Unverified));
    }

    #[test]
    fn test_concurrent_first_use_builds_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let mut registry = SourceRegistry::new();
        let counter = Arc::clone(&built);
        registry.register("Counted", move |_: &RandConfig| {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::new(crate::entropy::jitter::HashTimingSource::with_rounds(1)) as Box<dyn EntropySource>
        });

        let cell = Arc::new(FallbackCell::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = Arc::clone(&cell);
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let generator = cell.get_or_try_init(&registry, &RandConfig::default()).unwrap();
                    generator as *const FallbackGenerator as usize
                })
            })
            .collect();

        let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(addresses.windows(2).all(|w| w[0] == w[1]));
    }
}
