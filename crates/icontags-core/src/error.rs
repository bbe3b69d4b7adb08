//! Error types for the IconTags runtime.

use std::fmt;

/// The main error type for runtime operations.
#[derive(Debug)]
pub enum CoreError {
    /// Timer-related error.
    Timer(TimerError),
    /// Signal-related error.
    Signal(SignalError),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timer(err) => write!(f, "Timer error: {err}"),
            Self::Signal(err) => write!(f, "Signal error: {err}"),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Timer(err) => Some(err),
            Self::Signal(err) => Some(err),
        }
    }
}

/// Timer-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// The timer ID is invalid, already fired, or has been stopped.
    InvalidTimerId,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTimerId => write!(f, "Invalid or expired timer ID"),
        }
    }
}

impl std::error::Error for TimerError {}

impl From<TimerError> for CoreError {
    fn from(err: TimerError) -> Self {
        Self::Timer(err)
    }
}

/// Signal-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    /// The connection ID is invalid or has already been disconnected.
    InvalidConnection,
    /// The signal has been dropped and is no longer available.
    SignalDropped,
}

impl fmt::Display for SignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConnection => write!(f, "Invalid or disconnected connection ID"),
            Self::SignalDropped => write!(f, "Signal has been dropped"),
        }
    }
}

impl std::error::Error for SignalError {}

impl From<SignalError> for CoreError {
    fn from(err: SignalError) -> Self {
        Self::Signal(err)
    }
}

/// A specialized Result type for runtime operations.
pub type Result<T> = std::result::Result<T, CoreError>;
