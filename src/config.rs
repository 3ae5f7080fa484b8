//! Configuration management for strongrand.
//!
//! Defines the tunables for the entropy chain. Nothing here is read from the
//! environment; the host application builds a [`RandConfig`] and hands it to
//! [`crate::Rand::new`].

use std::path::PathBuf;

use crate::entropy::jitter::DEFAULT_ROUNDS;
use crate::entropy::urandom::DEFAULT_URANDOM_PATH;

/// Main configuration structure for a random provider.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RandConfig {
    /// Timing samples hashed into each 32-byte block by the `HashTiming` plugin.
    pub hash_timing_rounds: u32,

    /// Device read by the secondary OS source.
    pub urandom_path: PathBuf,

    /// Rejection-sampling redraws tolerated in one `get_integer` call before a
    /// warning is logged.
    pub redraw_warn_threshold: u32,
}

impl Default for RandConfig {
    fn default() -> Self {
        Self {
            hash_timing_rounds: DEFAULT_ROUNDS,
            urandom_path: PathBuf::from(DEFAULT_URANDOM_PATH),
            redraw_warn_threshold: 64,
        }
    }
}

#[cfg(feature = "serde")]
impl RandConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RandConfig::default();
        assert_eq!(config.hash_timing_rounds, 64);
        assert_eq!(config.urandom_path, PathBuf::from("/dev/urandom"));
        assert_eq!(config.redraw_warn_threshold, 64);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_json_partial() {
        let config = RandConfig::from_json(r#"{ "urandom_path": "/dev/random" }"#).unwrap();
        assert_eq!(config.urandom_path, PathBuf::from("/dev/random"));
        assert_eq!(config.hash_timing_rounds, 64);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(RandConfig::from_json("{ not json").is_err());
    }
}
