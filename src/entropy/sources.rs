//! Entropy Source Registry.
//!
//! Named factories for the plugins the fallback generator is assembled from.
//! The default registry carries a single entry, `HashTiming`.

use std::fmt;
use std::sync::Arc;

use super::EntropySource;
use crate::config::RandConfig;

pub use super::custom::CustomSource;
pub use super::jitter::HashTimingSource;
pub use super::os::OsSource;
pub use super::urandom::UrandomSource;

/// Builds a fresh source instance from the active configuration.
pub type SourceFactory = Arc<dyn Fn(&RandConfig) -> Box<dyn EntropySource> + Send + Sync>;

/// Ordered set of named source factories.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    entries: Vec<(&'static str, SourceFactory)>,
}

impl SourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Creates a registry with the built-in `HashTiming` plugin.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("HashTiming", |config: &RandConfig| {
            Box::new(HashTimingSource::with_rounds(config.hash_timing_rounds)) as Box<dyn EntropySource>
        });
        registry
    }

    /// Registers `factory` under `name`, replacing any previous entry of that name.
    pub fn register<F>(&mut self, name: &'static str, factory: F)
    where
        F: Fn(&RandConfig) -> Box<dyn EntropySource> + Send + Sync + 'static,
    {
        let factory: SourceFactory = Arc::new(factory);
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = factory,
            None => self.entries.push((name, factory)),
        }
    }

    /// Removes the entry registered under `name`. Returns whether one existed.
    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| *n != name);
        self.entries.len() != before
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(n, _)| *n)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Instantiates every registered source.
    pub fn instantiate(&self, config: &RandConfig) -> Vec<Box<dyn EntropySource>> {
        self.entries.iter().map(|(_, factory)| factory(config)).collect()
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_has_hash_timing() {
        let registry = SourceRegistry::with_defaults();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["HashTiming"]);

        let sources = registry.instantiate(&RandConfig::default());
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name(), "HashTiming");
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = SourceRegistry::new();
        assert!(registry.is_empty());

        registry.register("Injected", |_: &RandConfig| Box::new(CustomSource::new()) as Box<dyn EntropySource>);
        registry.register("Injected", |_: &RandConfig| Box::new(OsSource::new()) as Box<dyn EntropySource>);
        assert_eq!(registry.len(), 1);

        let sources = registry.instantiate(&RandConfig::default());
        assert_eq!(sources[0].name(), "OsRng");
    }

    #[test]
    fn test_unregister() {
        let mut registry = SourceRegistry::with_defaults();
        assert!(registry.unregister("HashTiming"));
        assert!(!registry.unregister("HashTiming"));
        assert!(registry.is_empty());
    }
}
