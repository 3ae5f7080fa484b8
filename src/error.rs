use core::fmt;

use crate::entropy::EntropyError;

/// Invalid arguments to a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainError {
    /// `get_integer` was called with `min > max`.
    MinExceedsMax,
    /// `max - min` does not fit in an `i64`.
    RangeTooLarge,
    /// A string length below 1 was requested.
    LengthTooSmall,
    /// A length that does not fit in memory was requested.
    LengthTooLarge,
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::MinExceedsMax => write!(f, "The min parameter must be lower than max parameter"),
            DomainError::RangeTooLarge => write!(f, "The supplied range is too great to generate"),
            DomainError::LengthTooSmall => write!(f, "Length should be >= 1"),
            DomainError::LengthTooLarge => write!(f, "Length exceeds addressable memory"),
        }
    }
}

impl std::error::Error for DomainError {}

/// Errors surfaced by the random provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandError {
    /// A strong request was made but no cryptographic source is usable.
    EnvironmentUnsupported,
    /// The fallback generator is needed but no entropy plugin is registered.
    MissingFallback,
    /// Caller supplied invalid arguments.
    Domain(DomainError),
    /// Every fallback plugin failed to produce bytes.
    Entropy(EntropyError),
}

impl fmt::Display for RandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RandError::EnvironmentUnsupported => write!(
                f,
                "This environment doesn't support secure random number generation: \
                 no OS CSPRNG or urandom device is usable"
            ),
            RandError::MissingFallback => write!(
                f,
                "The fallback pseudorandom generator needs at least one registered entropy source \
                 in the absence of an OS CSPRNG"
            ),
            RandError::Domain(e) => write!(f, "{}", e),
            RandError::Entropy(e) => write!(f, "Fallback generator failed: {}", e),
        }
    }
}

impl std::error::Error for RandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RandError::Domain(e) => Some(e),
            RandError::Entropy(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DomainError> for RandError {
    fn from(e: DomainError) -> Self {
        RandError::Domain(e)
    }
}

impl From<EntropyError> for RandError {
    fn from(e: EntropyError) -> Self {
        RandError::Entropy(e)
    }
}
