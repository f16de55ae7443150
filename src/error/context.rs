//! Context helpers for attaching a message to lower-level errors.

use super::{Result, TrackerError};

/// Extension trait adding context to any `Result` whose error is a std error.
pub trait ResultExt<T> {
    /// Wrap the error with a static context message.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::WithContext` when `self` is an error.
    fn context(self, context: &str) -> Result<T>;

    /// Wrap the error with a lazily built context message.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::WithContext` when `self` is an error.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: &str) -> Result<T> {
        self.map_err(|source| TrackerError::WithContext {
            context: context.to_string(),
            source: Box::new(source),
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|source| TrackerError::WithContext {
            context: f(),
            source: Box::new(source),
        })
    }
}

/// Extension trait turning a missing value into a `TrackerError`.
pub trait OptionExt<T> {
    /// Convert `None` into the error produced by `f`.
    ///
    /// # Errors
    ///
    /// Returns the error built by `f` when `self` is `None`.
    fn or_not_found<F: FnOnce() -> TrackerError>(self, f: F) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found<F: FnOnce() -> TrackerError>(self, f: F) -> Result<T> {
        self.ok_or_else(f)
    }
}
