//! Random Provider.
//!
//! [`Rand`] owns the entropy chain and builds every higher-level generator on
//! a single byte primitive.
//!
//! # Source selection
//! Performed on every byte request, in order:
//! 1. Primary OS CSPRNG, accepted only when it reports cryptographic output.
//! 2. Secondary urandom device, accepted when it fills the whole buffer.
//! 3. Strong requests stop here with [`RandError::EnvironmentUnsupported`].
//! 4. The lazily-built [`FallbackGenerator`].
//!
//! A tier that fails is skipped, never retried.

use std::sync::{Arc, OnceLock};

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use rand_core::{impls, RngCore};
use zeroize::Zeroizing;

use crate::config::RandConfig;
use crate::entropy::jitter::DEFAULT_ROUNDS;
use crate::entropy::os::OsSource;
use crate::entropy::sources::SourceRegistry;
use crate::entropy::urandom::UrandomSource;
use crate::entropy::{EntropySource, Usability};
use crate::error::{DomainError, RandError};
use crate::fallback::{FallbackCell, FallbackGenerator};

static GLOBAL_FALLBACK: FallbackCell = FallbackCell::new();
static GLOBAL_RAND: OnceLock<Rand> = OnceLock::new();

/// Exponent byte of an IEEE-754 double in [1, 2): sign 0, top exponent bits of 1023.
const FLOAT_EXPONENT_HIGH: u8 = 0x3F;
/// Low exponent nibble of 1023, merged into the seventh byte.
const FLOAT_EXPONENT_LOW: u8 = 0xF0;

// Debug builds treat this many redraws as a broken source.
#[cfg(debug_assertions)]
const REDRAW_SANITY_LIMIT: u32 = 1 << 20;

enum FallbackSlot {
    Global,
    Local(Arc<FallbackCell>),
}

impl FallbackSlot {
    fn cell(&self) -> &FallbackCell {
        match self {
            FallbackSlot::Global => &GLOBAL_FALLBACK,
            FallbackSlot::Local(cell) => cell,
        }
    }
}

/// Pseudorandom data provider with an explicit strong/weak quality contract.
pub struct Rand {
    primary: Option<Box<dyn EntropySource>>,
    secondary: Option<Box<dyn EntropySource>>,
    registry: SourceRegistry,
    fallback: FallbackSlot,
    config: RandConfig,
}

impl Rand {
    /// Provider over the platform sources.
    ///
    /// With the default `hash_timing_rounds` the provider shares the
    /// process-wide fallback generator. Any other value gets a private
    /// fallback generator, so the setting is never masked by an instance built
    /// earlier by another provider.
    pub fn new(config: RandConfig) -> Self {
        let fallback = if config.hash_timing_rounds == DEFAULT_ROUNDS {
            FallbackSlot::Global
        } else {
            FallbackSlot::Local(Arc::new(FallbackCell::new()))
        };
        Self {
            primary: Some(Box::new(OsSource::new())),
            secondary: Some(Box::new(UrandomSource::with_path(&config.urandom_path))),
            registry: SourceRegistry::with_defaults(),
            fallback,
            config,
        }
    }

    /// Process-wide provider with default configuration.
    pub fn global() -> &'static Rand {
        GLOBAL_RAND.get_or_init(|| Rand::new(RandConfig::default()))
    }

    /// Provider over caller-supplied tiers.
    ///
    /// The fallback generator is private to this provider and built from
    /// `registry` on first need.
    pub fn with_sources(
        primary: Option<Box<dyn EntropySource>>,
        secondary: Option<Box<dyn EntropySource>>,
        registry: SourceRegistry,
        config: RandConfig,
    ) -> Self {
        Self {
            primary,
            secondary,
            registry,
            fallback: FallbackSlot::Local(Arc::new(FallbackCell::new())),
            config,
        }
    }

    /// Configuration this provider was built with.
    pub fn config(&self) -> &RandConfig {
        &self.config
    }

    /// Returns the fallback generator, building it on first use.
    pub fn alternative_generator(&self) -> Result<&FallbackGenerator, RandError> {
        self.fallback.cell().get_or_try_init(&self.registry, &self.config)
    }

    /// Whether a cryptographic tier is currently reachable.
    pub fn has_strong_source(&self) -> bool {
        [&self.primary, &self.secondary]
            .into_iter()
            .flatten()
            .any(|s| s.is_available())
    }

    /// Generates `length` random bytes.
    ///
    /// Returns `Ok(None)`, the "no data" result, when `length <= 0`. That case
    /// is not an error.
    ///
    /// # Errors
    /// * [`RandError::EnvironmentUnsupported`] if `strong` and no OS source is usable.
    /// * [`RandError::MissingFallback`] if the fallback is needed and has no plugins.
    pub fn get_bytes(&self, length: i64, strong: bool) -> Result<Option<Vec<u8>>, RandError> {
        if length <= 0 {
            return Ok(None);
        }
        let length = usize::try_from(length).map_err(|_| DomainError::LengthTooLarge)?;
        let mut bytes = vec![0u8; length];
        self.fill_bytes_checked(&mut bytes, strong)?;
        Ok(Some(bytes))
    }

    /// Fills `dest` through the source chain. The single point of contact with entropy sources.
    pub fn fill_bytes_checked(&self, dest: &mut [u8], strong: bool) -> Result<(), RandError> {
        if let Some(primary) = self.primary.as_deref().filter(|s| s.is_available()) {
            match primary.fill(dest) {
                Ok(Usability::Cryptographic) => return Ok(()),
                Ok(Usability::Unverified) => {
                    log::debug!("{} output not confirmed cryptographic; skipping", primary.name())
                }
                Err(e) => log::debug!("{} failed: {}", primary.name(), e),
            }
        }

        if let Some(secondary) = self.secondary.as_deref().filter(|s| s.is_available()) {
            match secondary.fill(dest) {
                Ok(_) => return Ok(()),
                Err(e) => log::debug!("{} failed: {}", secondary.name(), e),
            }
        }

        if strong {
            return Err(RandError::EnvironmentUnsupported);
        }

        log::warn!("No OS entropy source usable; serving {} bytes from fallback generator", dest.len());
        let generator = self.alternative_generator()?;
        generator.fill(dest)?;
        Ok(())
    }

    /// Generates a random boolean from the parity of one byte.
    pub fn get_boolean(&self, strong: bool) -> Result<bool, RandError> {
        let mut byte = [0u8; 1];
        self.fill_bytes_checked(&mut byte, strong)?;
        Ok(byte[0] % 2 == 1)
    }

    /// Generates a uniform integer in `[min, max]` by rejection sampling.
    ///
    /// `min == max` returns immediately without drawing entropy.
    ///
    /// The redraw loop has no cap. A source that keeps returning out-of-range
    /// values will spin; debug builds panic after an absurd number of redraws.
    pub fn get_integer(&self, min: i64, max: i64, strong: bool) -> Result<i64, RandError> {
        if min > max {
            return Err(DomainError::MinExceedsMax.into());
        }
        if min == max {
            return Ok(max);
        }
        let range = max.checked_sub(min).ok_or(DomainError::RangeTooLarge)? as u64;

        // bits = floor(log2(range)) + 1; bytes = floor(log2(range) / 8) + 1
        // i.e. ceil(bits / 8): a range of 255 draws one byte, not two.
        let bits = u64::BITS - range.leading_zeros();
        let bytes = ((bits - 1) / 8 + 1) as usize;
        let mask = (1u64 << bits) - 1;

        let mut buf = Zeroizing::new([0u8; 8]);
        let mut redraws = 0u32;
        let value = loop {
            self.fill_bytes_checked(&mut buf[8 - bytes..], strong)?;
            let candidate = u64::from_be_bytes(*buf) & mask;
            if candidate <= range {
                break candidate;
            }

            redraws = redraws.saturating_add(1);
            log::trace!("rejection sampling redraw {} for range {}", redraws, range);
            if redraws == self.config.redraw_warn_threshold {
                log::warn!(
                    "get_integer({}, {}) needed {} redraws; the entropy source may be degenerate",
                    min,
                    max,
                    redraws
                );
            }
            #[cfg(debug_assertions)]
            assert!(redraws < REDRAW_SANITY_LIMIT, "rejection sampling did not terminate");
        };

        Ok(min + value as i64)
    }

    /// Generates a float uniformly distributed in `[0, 1)` with 52 random mantissa bits.
    pub fn get_float(&self, strong: bool) -> Result<f64, RandError> {
        let mut bytes = Zeroizing::new([0u8; 8]);
        self.fill_bytes_checked(&mut bytes[..7], strong)?;
        bytes[6] |= FLOAT_EXPONENT_LOW;
        bytes[7] = FLOAT_EXPONENT_HIGH;

        Ok(f64::from_le_bytes(*bytes) - 1.0)
    }

    /// Generates a string of `length` characters.
    ///
    /// Without a charlist (or with an empty one) the characters come from the
    /// standard base64 alphabet. A one-character charlist is repeated without
    /// drawing entropy. Otherwise each byte advances a running index into the
    /// charlist, so consecutive picks are not independent.
    pub fn get_string(&self, length: i64, charlist: Option<&str>, strong: bool) -> Result<String, RandError> {
        if length < 1 {
            return Err(DomainError::LengthTooSmall.into());
        }
        let length = usize::try_from(length).map_err(|_| DomainError::LengthTooLarge)?;

        let charlist: Vec<char> = charlist.map(|c| c.chars().collect()).unwrap_or_default();

        match charlist.len() {
            0 => {
                // 3 bytes encode to 4 characters: ceil(length * 0.75) bytes.
                let num_bytes = length
                    .checked_mul(3)
                    .map(|n| (n + 3) / 4)
                    .ok_or(DomainError::LengthTooLarge)?;
                let mut bytes = Zeroizing::new(vec![0u8; num_bytes]);
                self.fill_bytes_checked(&mut bytes, strong)?;

                let mut encoded = STANDARD_NO_PAD.encode(&*bytes);
                encoded.truncate(length);
                Ok(encoded)
            }
            1 => Ok(core::iter::repeat(charlist[0]).take(length).collect()),
            list_len => {
                let mut bytes = Zeroizing::new(vec![0u8; length]);
                self.fill_bytes_checked(&mut bytes, strong)?;

                let mut pos = 0usize;
                Ok(bytes
                    .iter()
                    .map(|&b| {
                        pos = (pos + b as usize) % list_len;
                        charlist[pos]
                    })
                    .collect())
            }
        }
    }
}

impl Default for Rand {
    fn default() -> Self {
        Self::new(RandConfig::default())
    }
}

/// Non-strong `rand_core` interface.
///
/// # Panics
/// `next_u32`, `next_u64` and `fill_bytes` panic if even the fallback generator
/// fails; use `try_fill_bytes` to observe the error.
impl RngCore for Rand {
    fn next_u32(&mut self) -> u32 {
        impls::next_u32_via_fill(self)
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_fill(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        if let Err(e) = self.try_fill_bytes(dest) {
            panic!("strongrand: {}", e);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes_checked(dest, false).map_err(rand_core::Error::new)
    }
}
