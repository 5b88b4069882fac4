//! Error types for the source/sink system.

use std::sync::Arc;
use thiserror::Error;

/// Boxed error accepted from user code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The main error type for the source/sink system.
///
/// None of these ever travel from a sink or hook back to the source that
/// invoked it: sinks return them so the source can report them.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// `cancel` was called on a source whose lifetime is bounded elsewhere
    #[error("source cannot be cancelled: {reason}")]
    NotCancellable { reason: &'static str },

    /// A constructor or parser rejected its input
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A sink failed to handle an item
    #[error("sink error: {0}")]
    Sink(Arc<dyn std::error::Error + Send + Sync>),

    /// A mapper failed to transform an item
    #[error("mapper error: {0}")]
    Mapper(Arc<dyn std::error::Error + Send + Sync>),

    /// A poll function failed to produce an item
    #[error("poll error: {0}")]
    Poll(Arc<dyn std::error::Error + Send + Sync>),

    /// A custom error with a message
    #[error("{0}")]
    Custom(String),
}

// Convenience constructors
impl Error {
    /// Create a sink error from any error type
    pub fn sink<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Error::Sink(Arc::new(error))
    }

    /// Create a mapper error from any error type
    pub fn mapper<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Error::Mapper(Arc::new(error))
    }

    /// Create a poll error from any error type
    pub fn poll<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Error::Poll(Arc::new(error))
    }

    /// Create a custom error with a message
    pub fn custom<S: Into<String>>(message: S) -> Self {
        Error::Custom(message.into())
    }

    /// Create a configuration error with a message
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Error::InvalidConfig(message.into())
    }
}

impl From<BoxError> for Error {
    fn from(e: BoxError) -> Self {
        Error::Custom(e.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Custom(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Custom(s.to_string())
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Helper trait for converting foreign errors into our Error type
pub trait IntoError<T> {
    fn into_sink_error(self) -> Result<T>;
    fn into_mapper_error(self) -> Result<T>;
    fn into_poll_error(self) -> Result<T>;
}

impl<T, E> IntoError<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn into_sink_error(self) -> Result<T> {
        self.map_err(Error::sink)
    }

    fn into_mapper_error(self) -> Result<T> {
        self.map_err(Error::mapper)
    }

    fn into_poll_error(self) -> Result<T> {
        self.map_err(Error::poll)
    }
}
