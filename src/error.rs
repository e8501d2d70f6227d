//! Error handling for the Serial Debug Monitor
//!
//! This module defines custom error types and a Result alias for use
//! throughout the application.

use thiserror::Error;

/// Errors raised by the serial link
#[derive(Error, Debug)]
pub enum LinkError {
    /// The port could not be claimed (already in use, removed, permission denied)
    #[error("Port unavailable: {0}")]
    Unavailable(String),

    /// The device went away mid-session
    #[error("Link disconnected: {0}")]
    Disconnected(String),

    /// No complete line arrived within the configured read timeout
    #[error("Read timed out")]
    Timeout,
}

/// Errors raised while turning a raw line into a [`Frame`](crate::types::Frame)
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The line is not a syntactically valid record
    #[error("Malformed frame: {0}")]
    Malformed(String),

    /// The record parsed but a required field is absent
    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

/// Main error type for Serial Debug Monitor operations
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Errors related to the serial link
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// Errors related to frame decoding
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Serial Debug Monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_error_display() {
        let err = LinkError::Unavailable("/dev/ttyUSB0: busy".to_string());
        assert_eq!(err.to_string(), "Port unavailable: /dev/ttyUSB0: busy");
        assert_eq!(LinkError::Timeout.to_string(), "Read timed out");
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::MissingField("/registers/pc");
        assert_eq!(err.to_string(), "Missing field: /registers/pc");
    }

    #[test]
    fn test_error_conversion() {
        let err: MonitorError = LinkError::Timeout.into();
        assert!(matches!(err, MonitorError::Link(LinkError::Timeout)));

        let err: MonitorError = DecodeError::Malformed("unexpected end of input".to_string()).into();
        assert!(err.to_string().contains("unexpected end of input"));
    }
}
