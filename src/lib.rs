//! Pseudorandom data with an explicit quality contract.
//!
//! Every generator takes a `strong` flag. Strong requests are served only by
//! a cryptographic OS source and fail with
//! [`RandError::EnvironmentUnsupported`] otherwise; weak requests fall back
//! to a timing-jitter generator when the OS offers nothing.
//!
//! The free functions below use the process-wide [`Rand::global`] provider.

pub mod config;
pub mod entropy;
pub mod error;
pub mod fallback;
pub mod provider;

pub use config::RandConfig;
pub use entropy::{EntropyError, EntropySource, Usability};
pub use error::{DomainError, RandError};
pub use fallback::FallbackGenerator;
pub use provider::Rand;

/// Generates `length` random bytes; `Ok(None)` when `length <= 0`.
pub fn get_bytes(length: i64, strong: bool) -> Result<Option<Vec<u8>>, RandError> {
    Rand::global().get_bytes(length, strong)
}

/// Generates a random boolean.
pub fn get_boolean(strong: bool) -> Result<bool, RandError> {
    Rand::global().get_boolean(strong)
}

/// Generates a uniform integer in `[min, max]`.
pub fn get_integer(min: i64, max: i64, strong: bool) -> Result<i64, RandError> {
    Rand::global().get_integer(min, max, strong)
}

/// Generates a float in `[0, 1)`.
pub fn get_float(strong: bool) -> Result<f64, RandError> {
    Rand::global().get_float(strong)
}

/// Generates a string of `length` characters from `charlist`, or base64 when absent.
pub fn get_string(length: i64, charlist: Option<&str>, strong: bool) -> Result<String, RandError> {
    Rand::global().get_string(length, charlist, strong)
}

/// The process-wide fallback generator, built on first call.
pub fn alternative_generator() -> Result<&'static FallbackGenerator, RandError> {
    Rand::global().alternative_generator()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_functions() {
        assert_eq!(get_bytes(0, true), Ok(None));
        assert_eq!(get_bytes(16, true).unwrap().map(|b| b.len()), Some(16));
        assert!(get_boolean(true).is_ok());
        assert_eq!(get_integer(7, 7, true), Ok(7));
        assert_eq!(get_integer(5, 3, false), Err(RandError::Domain(DomainError::MinExceedsMax)));
        assert!((0.0..1.0).contains(&get_float(true).unwrap()));
        assert_eq!(get_string(5, Some("A"), true), Ok(String::from("AAAAA")));
        assert_eq!(get_string(10, None, true).unwrap().len(), 10);
    }

    #[test]
    fn test_global_alternative_generator_is_shared() {
        let a = alternative_generator().unwrap();
        let b = alternative_generator().unwrap();
        assert!(std::ptr::eq(a, b));
        assert_eq!(a.source_names(), vec!["HashTiming"]);
    }
}
