//! Unified error type for the capellix-lib crate.
//!
//! [`CapellixError`] wraps [`DeviceError`] and I/O errors alongside the
//! string-payload kinds (`Config`, `Color`). `From` impls let `?` cross
//! module boundaries.

use std::fmt;

use crate::device::DeviceError;

/// Unified error type for capellix-lib operations.
#[derive(Debug)]
pub enum CapellixError {
    /// Device communication error (discovery, open, transfer).
    Device(DeviceError),
    /// Standard I/O error (config persistence).
    Io(std::io::Error),
    /// Configuration load or validation error.
    Config(String),
    /// Color parsing or zone layout error.
    Color(String),
}

impl fmt::Display for CapellixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapellixError::Device(e) => write!(f, "{e}"),
            CapellixError::Io(e) => write!(f, "I/O error: {e}"),
            CapellixError::Config(e) => write!(f, "Config error: {e}"),
            CapellixError::Color(e) => write!(f, "Color error: {e}"),
        }
    }
}

impl std::error::Error for CapellixError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CapellixError::Device(e) => Some(e),
            CapellixError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DeviceError> for CapellixError {
    fn from(e: DeviceError) -> Self {
        CapellixError::Device(e)
    }
}

impl From<std::io::Error> for CapellixError {
    fn from(e: std::io::Error) -> Self {
        CapellixError::Io(e)
    }
}

/// Crate-level Result alias using [`CapellixError`].
pub type Result<T> = std::result::Result<T, CapellixError>;
