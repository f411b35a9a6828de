//! # Application Error Types
//!
//! This module defines the error taxonomy used throughout the spinescan
//! pipeline. A missing source file is deliberately *not* an error: the
//! aggregator reports it as an absent (null) report instead.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum SpineError {
    /// Configuration validation errors
    Config(String),
    /// Image container unreadable or corrupt
    Decode(String),
    /// Malformed buffer or parameter passed to a processing stage
    InvalidInput(String),
    /// Recognition engine raised or returned malformed output
    Engine(String),
    /// Intermediate image write failed
    Write(String),
}

impl fmt::Display for SpineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpineError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            SpineError::Decode(msg) => write!(f, "[DECODE] {}", msg),
            SpineError::InvalidInput(msg) => write!(f, "[INVALID_INPUT] {}", msg),
            SpineError::Engine(msg) => write!(f, "[ENGINE] {}", msg),
            SpineError::Write(msg) => write!(f, "[WRITE] {}", msg),
        }
    }
}

impl std::error::Error for SpineError {}

impl From<anyhow::Error> for SpineError {
    fn from(err: anyhow::Error) -> Self {
        SpineError::Engine(err.to_string())
    }
}

impl From<image::ImageError> for SpineError {
    fn from(err: image::ImageError) -> Self {
        SpineError::Decode(err.to_string())
    }
}

impl From<crate::preprocessing::types::PreprocessingError> for SpineError {
    fn from(err: crate::preprocessing::types::PreprocessingError) -> Self {
        SpineError::InvalidInput(err.to_string())
    }
}

/// Result type alias for convenience
pub type SpineResult<T> = Result<T, SpineError>;
